//! Detection records.
//!
//! An `Event` joins a detection's downsampled posterior samples with
//! the distance-marginalized probability-of-detection map built at its
//! detection time. Everything the likelihood needs per sample is
//! precomputed at construction: sky unit vectors, the Euclidean
//! distance-prior weight and the normalized mass-prior weight. The
//! record is immutable afterwards; rotations return fresh arrays.

use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use selection::marginal::SkyMap;
use skymath::healpix::angles_to_vector;
use skymath::Pixelization;

use crate::archive::PosteriorTable;
use crate::{AnisotropyError, Result};

/// Observing-run membership of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunLabel {
    O1,
    O2,
    O3a,
    O3b,
}

impl RunLabel {
    pub fn from_label(label: &str) -> Result<Self> {
        match label {
            "O1" => Ok(RunLabel::O1),
            "O2" => Ok(RunLabel::O2),
            "O3a" => Ok(RunLabel::O3a),
            "O3b" => Ok(RunLabel::O3b),
            other => Err(AnisotropyError::UnknownRunLabel(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunLabel::O1 => "O1",
            RunLabel::O2 => "O2",
            RunLabel::O3a => "O3a",
            RunLabel::O3b => "O3b",
        }
    }
}

/// Settings shared by every event of an analysis.
#[derive(Debug, Clone)]
pub struct EventConfig {
    /// Upper edge of the luminosity-distance prior in Mpc; must match
    /// the value used when the detection maps were built.
    pub dlmax_mpc: f64,
    /// Posterior-sample count after downsampling.
    pub n_samples: usize,
    /// Power-law index of the primary-mass prior, `p(m) ~ m^-alpha`.
    pub power_law_index: f64,
    /// Minimum component mass in solar masses.
    pub min_mass_msun: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            dlmax_mpc: 7500.0,
            n_samples: 500,
            power_law_index: 2.35,
            min_mass_msun: 5.0,
        }
    }
}

/// Deterministically downsample a posterior table to `n` rows without
/// replacement.
///
/// The seed is an explicit argument: the same seed and input table give
/// the same rows element for element. Tables at or below the requested
/// size pass through unchanged.
pub fn downsample(table: &PosteriorTable, n: usize, seed: u64) -> PosteriorTable {
    let len = table.len();
    if n >= len {
        return table.clone();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, len, n).into_vec();
    indices.sort_unstable();

    let gather = |col: &[f64]| indices.iter().map(|&i| col[i]).collect();
    PosteriorTable {
        right_ascension: gather(&table.right_ascension),
        declination: gather(&table.declination),
        primary_mass_msun: gather(&table.primary_mass_msun),
        luminosity_distance_mpc: gather(&table.luminosity_distance_mpc),
    }
}

/// Immutable record of one catalogued detection.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    run: RunLabel,
    gps_time: u64,
    samples: PosteriorTable,
    sky_vectors: Vec<Vector3<f64>>,
    pdist: Vec<f64>,
    pmass: Vec<f64>,
    map: SkyMap,
    pixelization: Pixelization,
    pixel_vectors: Vec<Vector3<f64>>,
}

impl Event {
    /// Build an event record from a resolved posterior table and its
    /// distance-marginalized detection map.
    ///
    /// The table is downsampled with the explicit `seed`; prior weights
    /// and sky vectors are precomputed over the downsampled set, with
    /// the mass-prior weights normalized to sum to one.
    pub fn new(
        name: &str,
        run: RunLabel,
        gps_time: u64,
        table: &PosteriorTable,
        map: SkyMap,
        config: &EventConfig,
        seed: u64,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(AnisotropyError::InvalidEvent("empty event name".into()));
        }
        let pixelization = Pixelization::new(map.nside)?;
        if map.values.len() != pixelization.npix() {
            return Err(AnisotropyError::InvalidEvent(format!(
                "map for {name} has {} pixels where nside {} implies {}",
                map.values.len(),
                map.nside,
                pixelization.npix()
            )));
        }

        let samples = downsample(table, config.n_samples, seed);

        let dlmax3 = config.dlmax_mpc.powi(3);
        let pdist: Vec<f64> = samples
            .luminosity_distance_mpc
            .iter()
            .map(|d| 3.0 * d * d / dlmax3)
            .collect();

        // Samples at or below the minimum mass sit outside the prior's
        // support and carry zero weight.
        let mut pmass: Vec<f64> = samples
            .primary_mass_msun
            .iter()
            .map(|&m1| {
                if m1 > config.min_mass_msun {
                    m1.powf(-config.power_law_index) / (m1 - config.min_mass_msun)
                } else {
                    0.0
                }
            })
            .collect();
        let total: f64 = pmass.iter().sum();
        if !(total > 0.0) {
            return Err(AnisotropyError::InvalidEvent(format!(
                "mass-prior weight vanishes on every posterior sample of {name}"
            )));
        }
        for w in &mut pmass {
            *w /= total;
        }

        let sky_vectors = samples
            .right_ascension
            .iter()
            .zip(&samples.declination)
            .map(|(&ra, &dec)| angles_to_vector(std::f64::consts::FRAC_PI_2 - dec, ra))
            .collect();

        let pixel_vectors = pixelization.pixel_centers();

        Ok(Self {
            name: name.to_string(),
            run,
            gps_time,
            samples,
            sky_vectors,
            pdist,
            pmass,
            map,
            pixelization,
            pixel_vectors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self) -> RunLabel {
        self.run
    }

    pub fn gps_time(&self) -> u64 {
        self.gps_time
    }

    pub fn samples(&self) -> &PosteriorTable {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Distance-prior weight per sample, `3 d^2 / dlmax^3`.
    pub fn pdist(&self) -> &[f64] {
        &self.pdist
    }

    /// Mass-prior weight per sample, normalized to sum to one.
    pub fn pmass(&self) -> &[f64] {
        &self.pmass
    }

    pub fn map(&self) -> &SkyMap {
        &self.map
    }

    pub fn pixelization(&self) -> Pixelization {
        self.pixelization
    }

    /// Sky unit vectors of the samples under the candidate rotation.
    pub fn rotate_sky_samples(&self, rot: &Matrix3<f64>) -> Vec<Vector3<f64>> {
        self.sky_vectors.iter().map(|v| rot * v).collect()
    }

    /// The detection map rotated by `rot`, as a fresh value array.
    pub fn rotate_map(&self, rot: &Matrix3<f64>) -> Vec<f64> {
        rotate_map_gather(&self.pixelization, &self.map.values, &self.pixel_vectors, rot)
    }
}

/// Rotate a pixelized map by gathering: each output pixel takes the
/// value of the input pixel its center came from under the inverse
/// rotation.
pub(crate) fn rotate_map_gather(
    pixelization: &Pixelization,
    values: &[f64],
    pixel_vectors: &[Vector3<f64>],
    rot: &Matrix3<f64>,
) -> Vec<f64> {
    let inverse = rot.transpose();
    pixel_vectors
        .iter()
        .map(|center| values[pixelization.vector_to_pixel(&(inverse * center))])
        .collect()
}
