//! The pixel-weight anisotropy model.
//!
//! The sky rate is parameterized by one non-negative weight per coarse
//! pixel plus a rigid rotation of the weight sky against the detection
//! maps. The posterior combines a Jeffreys-like prior on the total
//! rate, a rotation prior that keeps each coarse cell attached to its
//! original partition, and an inhomogeneous-Poisson-process likelihood:
//! expected-count suppression from the runs' mean detection maps and a
//! Monte Carlo average over each event's posterior samples.
//!
//! A nested sampler calls `log_prior` and `log_likelihood` millions of
//! times; both are pure functions of the parameter vector over
//! construction-time state, return `-inf` for invalid input instead of
//! failing, and allocate only small per-call scratch.

use nalgebra::{Matrix3, Vector3};

use skymath::{euler_zyz, Pixelization};

use crate::event::Event;
use crate::run::Run;
use crate::{AnisotropyError, Result};

const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;
const NEG_INF: f64 = f64::NEG_INFINITY;

/// Settings of the anisotropy model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Resolution of the weight sky; nside 1 gives the 12 base cells.
    pub weights_nside: u32,
    /// Admissible range of the total rate.
    pub rate_bounds: (f64, f64),
    /// Upper edge of the luminosity-distance prior in Mpc.
    pub dlmax_mpc: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_nside: 1,
            rate_bounds: (1e-5, 750.0),
            dlmax_mpc: 7500.0,
        }
    }
}

/// The sampler's parameter vector: one weight per coarse pixel and
/// three Euler angles, the polar one through its cosine.
#[derive(Debug, Clone)]
pub struct Params {
    pub weights: Vec<f64>,
    pub alpha: f64,
    pub cos_beta: f64,
    pub gamma: f64,
}

/// Prior/likelihood evaluator over the pixel-weight parameterization.
pub struct Model {
    events: Vec<Event>,
    runs: Vec<Run>,
    config: ModelConfig,
    /// Observing volume in Gpc^3.
    volume: f64,
    fine: Pixelization,
    coarse: Pixelization,
    /// Coarse-pixel index of every fine pixel center.
    fine_to_coarse: Vec<usize>,
    coarse_centers: Vec<Vector3<f64>>,
}

impl Model {
    /// Precompute the basis change between the coarse weight sky and
    /// the detection maps' fine sky. All event and run maps must share
    /// one resolution.
    pub fn new(events: Vec<Event>, runs: Vec<Run>, config: ModelConfig) -> Result<Self> {
        let first = runs
            .first()
            .map(|r| r.map().nside)
            .or_else(|| events.first().map(|e| e.map().nside))
            .ok_or_else(|| {
                AnisotropyError::InvalidModel("need at least one event or run".into())
            })?;
        for run in &runs {
            if run.map().nside != first {
                return Err(AnisotropyError::InvalidModel(format!(
                    "run {} map at nside {} where {} was expected",
                    run.label().label(),
                    run.map().nside,
                    first
                )));
            }
        }
        for event in &events {
            if event.map().nside != first {
                return Err(AnisotropyError::InvalidModel(format!(
                    "event {} map at nside {} where {} was expected",
                    event.name(),
                    event.map().nside,
                    first
                )));
            }
        }

        let fine = Pixelization::new(first)?;
        let coarse = Pixelization::new(config.weights_nside)?;
        let fine_to_coarse = fine
            .pixel_centers()
            .iter()
            .map(|v| coarse.vector_to_pixel(v))
            .collect();
        let coarse_centers = coarse.pixel_centers();
        let volume = 4.0 / 3.0 * std::f64::consts::PI * (config.dlmax_mpc * 1e-3).powi(3);

        Ok(Self {
            events,
            runs,
            config,
            volume,
            fine,
            coarse,
            fine_to_coarse,
            coarse_centers,
        })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of coarse pixel weights.
    pub fn n_weights(&self) -> usize {
        self.coarse.npix()
    }

    /// Names of the sampler's parameters, weights first.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..self.n_weights()).map(|i| format!("a{i}")).collect();
        names.extend(["alpha", "cos_beta", "gamma"].map(String::from));
        names
    }

    /// Render the coarse weights on the detection maps' resolution by
    /// nearest-pixel-center lookup.
    pub fn expand_weights(&self, weights: &[f64]) -> Vec<f64> {
        self.fine_to_coarse.iter().map(|&c| weights[c]).collect()
    }

    /// Rotation prior: zero when every coarse cell center stays inside
    /// its own cell under the rotation, `-inf` otherwise. The identity
    /// never rejects.
    pub fn logprior_rotation(&self, rot: &Matrix3<f64>) -> f64 {
        for (pix, center) in self.coarse_centers.iter().enumerate() {
            if self.coarse.vector_to_pixel(&(rot * center)) != pix {
                return NEG_INF;
            }
        }
        0.0
    }

    /// Rate prior: scale-invariant in the total rate, uniform in the
    /// weight shape. `-inf` for any negative weight or a total rate
    /// outside the configured bounds.
    pub fn logprior_rate(&self, weights: &[f64]) -> f64 {
        if weights.iter().any(|&w| w < 0.0) {
            return NEG_INF;
        }
        let n = weights.len() as f64;
        let rate = weights.iter().sum::<f64>() * FOUR_PI / n;
        let (lo, hi) = self.config.rate_bounds;
        if !(rate > lo && rate < hi) {
            return NEG_INF;
        }
        -(n - 0.5) * rate.ln()
    }

    /// Expected number of detections across all runs, linear in the
    /// fine weights.
    pub fn nexp(&self, rot: &Matrix3<f64>, fine_weights: &[f64]) -> f64 {
        let d_omega = FOUR_PI / fine_weights.len() as f64;
        self.runs
            .iter()
            .map(|run| {
                let rotated = run.rotate_map(rot);
                let flux: f64 = fine_weights
                    .iter()
                    .zip(&rotated)
                    .map(|(w, p)| w * p)
                    .sum();
                self.volume * run.observing_years() * flux * d_omega
            })
            .sum()
    }

    /// Sum over events of the log Monte Carlo average of the rate
    /// weight along each event's posterior support. A non-positive
    /// average gives `-inf`, never a panic or a NaN.
    pub fn logprob_detections(&self, rot: &Matrix3<f64>, fine_weights: &[f64]) -> f64 {
        let mut logprob = 0.0;
        for event in &self.events {
            let vectors = event.rotate_sky_samples(rot);
            let mut mean = 0.0;
            for (i, v) in vectors.iter().enumerate() {
                let pix = self.fine.vector_to_pixel(v);
                mean += fine_weights[pix] * event.pdist()[i] * event.pmass()[i];
            }
            mean /= vectors.len() as f64;
            if !(mean > 0.0) || !mean.is_finite() {
                return NEG_INF;
            }
            logprob += mean.ln();
        }
        logprob
    }

    fn validate(&self, params: &Params) -> Option<Matrix3<f64>> {
        if params.weights.len() != self.n_weights() {
            return None;
        }
        if params.weights.iter().any(|w| !w.is_finite()) {
            return None;
        }
        if !params.alpha.is_finite() || !params.gamma.is_finite() {
            return None;
        }
        if !(-1.0..=1.0).contains(&params.cos_beta) {
            return None;
        }
        Some(euler_zyz(
            params.alpha,
            params.cos_beta.acos(),
            params.gamma,
        ))
    }

    /// Log prior over the full parameter vector. Total and
    /// side-effect-free; invalid input maps to `-inf`.
    pub fn log_prior(&self, params: &Params) -> f64 {
        let Some(rot) = self.validate(params) else {
            return NEG_INF;
        };
        if self.logprior_rotation(&rot) == NEG_INF {
            return NEG_INF;
        }
        self.logprior_rate(&params.weights)
    }

    /// Log likelihood over the full parameter vector: the Poisson
    /// suppression term minus one per event plus the per-event sample
    /// averages.
    pub fn log_likelihood(&self, params: &Params) -> f64 {
        let Some(rot) = self.validate(params) else {
            return NEG_INF;
        };
        let fine_weights = self.expand_weights(&params.weights);
        let nexp = self.nexp(&rot, &fine_weights);
        let logprob = self.logprob_detections(&rot, &fine_weights);
        if logprob == NEG_INF {
            return NEG_INF;
        }
        -nexp + logprob
    }
}
