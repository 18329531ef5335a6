//! Distance marginalization and sidereal time averaging.
//!
//! The (pixel, distance) detection maps reduce in two steps. First the
//! distance axis integrates out against the Euclidean uniform-in-volume
//! distance prior `p(d) = 3 d^2 / d_max^3`, leaving one probability per
//! sky pixel. Second, the sky map is averaged over each observing
//! segment of a run: the sky rotates under the fixed antenna pattern, so
//! the map is evaluated at longitudes shifted by sidereal time and
//! integrated over every segment, normalized by the total observing time.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use skymath::{adaptive_simpson, LinearInterp, Pixelization};

use crate::obstime::ObservingSchedule;
use crate::pofd::DetectionProbabilityMap;
use crate::Result;

/// Fill value when the detection map is queried outside its distance grid.
const DISTANCE_FLOOR: f64 = 1e-10;

/// A one-value-per-pixel sky map.
///
/// Used for both distance-marginalized and time-averaged detection
/// probabilities; the two differ in provenance, not in shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMap {
    pub nside: u32,
    pub values: Vec<f64>,
}

impl SkyMap {
    pub fn uniform(nside: u32, value: f64) -> Self {
        let npix = 12 * (nside as usize) * (nside as usize);
        Self {
            nside,
            values: vec![value; npix],
        }
    }

    pub fn npix(&self) -> usize {
        self.values.len()
    }
}

/// Marginalize a detection map over luminosity distance.
///
/// Integrates `P(det | d, pixel) * 3 d^2 / d_max^3` from the bottom of
/// the distance grid to `d_max` for every pixel independently, with the
/// tabulated probabilities interpolated linearly in distance and floored
/// outside the grid.
pub fn marginalize_distance(
    map: &DetectionProbabilityMap,
    d_max_mpc: f64,
    tol: f64,
) -> Result<SkyMap> {
    let d_lo = map.distances_mpc[0];
    let prior_norm = 3.0 / d_max_mpc.powi(3);

    let values: Vec<f64> = (0..map.npix())
        .into_par_iter()
        .map(|k| {
            let row: Vec<f64> = map.values.row(k).to_vec();
            let interp = LinearInterp::new(map.distances_mpc.clone(), row)
                .expect("distance grid validated at map construction");
            adaptive_simpson(
                |d| interp.eval_or(d, DISTANCE_FLOOR) * prior_norm * d * d,
                d_lo,
                d_max_mpc,
                tol,
            )
        })
        .collect();

    Ok(SkyMap {
        nside: map.nside,
        values,
    })
}

/// Average a marginalized sky map over the sidereal rotation of a run.
///
/// For each observing segment the map is integrated over sidereal angle,
/// evaluated at (colatitude, ra - gmst); the segment integrals sum and
/// normalize by the total observing span. The result is the mean
/// probability of detection per pixel over the run.
pub fn time_average(map: &SkyMap, schedule: &ObservingSchedule, tol: f64) -> Result<SkyMap> {
    let pixelization = Pixelization::new(map.nside)?;
    let npix = map.npix();
    let sky: Vec<(f64, f64)> = (0..npix)
        .map(|p| {
            let (theta, phi) = pixelization.pixel_to_angles(p).expect("pixel in range");
            (theta, phi)
        })
        .collect();

    let summed: Vec<f64> = schedule
        .segments()
        .par_iter()
        .map(|seg| {
            let mut acc = vec![0.0; npix];
            for (j, &(theta, ra)) in sky.iter().enumerate() {
                acc[j] = adaptive_simpson(
                    |t| pixelization.interpolate_map(&map.values, theta, ra - t),
                    seg.gmst_start,
                    seg.gmst_end,
                    tol,
                );
            }
            acc
        })
        .reduce(
            || vec![0.0; npix],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        );

    let total = schedule.total_sidereal_radians();
    Ok(SkyMap {
        nside: map.nside,
        values: summed.into_iter().map(|v| v / total).collect(),
    })
}
