//! Interferometer sites and antenna-pattern responses.
//!
//! Each site is reduced to its detector tensor `D = (x x^T - y y^T) / 2`
//! built from the geodetic location and arm bearings. The response to the
//! two gravitational-wave polarizations follows the standard contraction
//! of that tensor with the polarization basis for a source at (ra, dec)
//! with polarization angle psi, at Greenwich hour angle gmst - ra.

use nalgebra::{Matrix3, Vector3};
use once_cell::sync::Lazy;

use crate::{Result, SelectionError};

/// A detector site in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Hanford,
    Livingston,
    Virgo,
}

impl Site {
    /// Parse an instrument label. Initial and advanced-era aliases map to
    /// the same site.
    pub fn from_label(label: &str) -> Result<Self> {
        match label {
            "H1" | "H2" | "AH1" => Ok(Site::Hanford),
            "L1" | "AL1" => Ok(Site::Livingston),
            "V1" | "AV1" => Ok(Site::Virgo),
            other => Err(SelectionError::UnknownDetector(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Site::Hanford => "H1",
            Site::Livingston => "L1",
            Site::Virgo => "V1",
        }
    }

    fn geometry(&self) -> &'static SiteGeometry {
        match self {
            Site::Hanford => &HANFORD,
            Site::Livingston => &LIVINGSTON,
            Site::Virgo => &VIRGO,
        }
    }

    /// The site's detector tensor in the Earth-fixed frame.
    pub fn tensor(&self) -> &'static Matrix3<f64> {
        match self {
            Site::Hanford => &HANFORD_TENSOR,
            Site::Livingston => &LIVINGSTON_TENSOR,
            Site::Virgo => &VIRGO_TENSOR,
        }
    }

    /// Antenna response (f_plus, f_cross) for a source direction and
    /// polarization angle at the given sidereal time.
    ///
    /// All angles in radians; `ra`/`dec` are equatorial coordinates,
    /// `psi` the polarization angle and `gmst` the Greenwich Mean
    /// Sidereal Time.
    pub fn antenna_response(&self, ra: f64, dec: f64, psi: f64, gmst: f64) -> (f64, f64) {
        let d = self.tensor();
        let gha = gmst - ra;

        let (sin_gha, cos_gha) = gha.sin_cos();
        let (sin_dec, cos_dec) = dec.sin_cos();
        let (sin_psi, cos_psi) = psi.sin_cos();

        let x = Vector3::new(
            -cos_psi * sin_gha - sin_psi * cos_gha * sin_dec,
            -cos_psi * cos_gha + sin_psi * sin_gha * sin_dec,
            sin_psi * cos_dec,
        );
        let y = Vector3::new(
            sin_psi * sin_gha - cos_psi * cos_gha * sin_dec,
            sin_psi * cos_gha + cos_psi * sin_gha * sin_dec,
            cos_psi * cos_dec,
        );

        let dx = d * x;
        let dy = d * y;
        let f_plus = x.dot(&dx) - y.dot(&dy);
        let f_cross = x.dot(&dy) + y.dot(&dx);
        (f_plus, f_cross)
    }
}

/// Geodetic description of a site: latitude, longitude and the bearings
/// of the two arms, measured clockwise from local north.
struct SiteGeometry {
    latitude_rad: f64,
    longitude_rad: f64,
    x_arm_bearing_rad: f64,
    y_arm_bearing_rad: f64,
}

const HANFORD: SiteGeometry = SiteGeometry {
    latitude_rad: 0.810_795_263_83,
    longitude_rad: -2.084_056_769_17,
    x_arm_bearing_rad: 5.654_877_248_44,
    y_arm_bearing_rad: 4.084_080_921_64,
};

const LIVINGSTON: SiteGeometry = SiteGeometry {
    latitude_rad: 0.533_423_135_06,
    longitude_rad: -1.584_309_370_78,
    x_arm_bearing_rad: 4.403_177_723_46,
    y_arm_bearing_rad: 2.832_381_396_66,
};

const VIRGO: SiteGeometry = SiteGeometry {
    latitude_rad: 0.761_511_839_84,
    longitude_rad: 0.183_338_052_13,
    x_arm_bearing_rad: 0.339_162_852_22,
    y_arm_bearing_rad: 5.575_159_990_75,
};

static HANFORD_TENSOR: Lazy<Matrix3<f64>> = Lazy::new(|| detector_tensor(&HANFORD));
static LIVINGSTON_TENSOR: Lazy<Matrix3<f64>> = Lazy::new(|| detector_tensor(&LIVINGSTON));
static VIRGO_TENSOR: Lazy<Matrix3<f64>> = Lazy::new(|| detector_tensor(&VIRGO));

/// Unit vector along an arm with the given bearing at a site.
fn arm_vector(geom: &SiteGeometry, bearing: f64) -> Vector3<f64> {
    let (sin_lat, cos_lat) = geom.latitude_rad.sin_cos();
    let (sin_lon, cos_lon) = geom.longitude_rad.sin_cos();

    let east = Vector3::new(-sin_lon, cos_lon, 0.0);
    let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);

    bearing.cos() * north + bearing.sin() * east
}

fn detector_tensor(geom: &SiteGeometry) -> Matrix3<f64> {
    let x = arm_vector(geom, geom.x_arm_bearing_rad);
    let y = arm_vector(geom, geom.y_arm_bearing_rad);
    (x * x.transpose() - y * y.transpose()) * 0.5
}
