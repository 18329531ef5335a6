//! Configuration for the selection-function pipeline.
//!
//! Everything the estimator and marginalizer need is carried explicitly
//! in immutable structs handed to constructors; there is no module-level
//! mutable state. Defaults match the advanced-detector catalog analysis.

use serde::{Deserialize, Serialize};

/// Power-law mass function for the Monte Carlo source population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassFunctionConfig {
    /// Power-law index of the primary-mass distribution.
    pub power_law_index: f64,
    /// Minimum component mass in solar masses.
    pub min_mass_msun: f64,
    /// Maximum total mass in solar masses.
    pub max_mass_msun: f64,
}

impl Default for MassFunctionConfig {
    fn default() -> Self {
        Self {
            power_law_index: 2.35,
            min_mass_msun: 5.0,
            max_mass_msun: 100.0,
        }
    }
}

/// Settings for building detection-probability maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Combined-network signal-to-noise threshold for a detection.
    pub snr_threshold: f64,
    /// Resolution of the detection-probability sky maps.
    pub nside: u32,
    /// Upper edge of the luminosity-distance grid in Mpc.
    pub d_max_mpc: f64,
    /// Number of bins in the luminosity-distance grid.
    pub n_distance_bins: usize,
    /// Monte Carlo ensemble size for source-parameter marginalization.
    pub n_samples: usize,
    /// Grid size for the tabulated sensitivity integral.
    pub n_sensitivity_points: usize,
    /// Absolute tolerance for the adaptive quadrature stages.
    pub quad_tol: f64,
    /// Source-population mass function.
    pub mass_function: MassFunctionConfig,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            snr_threshold: 12.0,
            nside: 16,
            d_max_mpc: 7500.0,
            n_distance_bins: 1000,
            n_samples: 500,
            n_sensitivity_points: 500,
            quad_tol: 1e-6,
            mass_function: MassFunctionConfig::default(),
        }
    }
}

impl SelectionConfig {
    /// The luminosity-distance grid, evenly spaced from 1 Mpc to the cap.
    pub fn distance_grid(&self) -> Vec<f64> {
        let n = self.n_distance_bins;
        let step = (self.d_max_mpc - 1.0) / (n - 1) as f64;
        (0..n).map(|i| 1.0 + i as f64 * step).collect()
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.n_distance_bins < 2 {
            return Err(crate::SelectionError::InvalidConfig(
                "need at least 2 distance bins".into(),
            ));
        }
        if self.d_max_mpc <= 1.0 {
            return Err(crate::SelectionError::InvalidConfig(
                "distance cap must exceed 1 Mpc".into(),
            ));
        }
        if self.n_samples == 0 {
            return Err(crate::SelectionError::InvalidConfig(
                "Monte Carlo ensemble must not be empty".into(),
            ));
        }
        let m = &self.mass_function;
        if !(m.min_mass_msun > 0.0 && m.max_mass_msun > 2.0 * m.min_mass_msun) {
            return Err(crate::SelectionError::InvalidConfig(format!(
                "mass bounds ({}, {}) leave no room for a binary",
                m.min_mass_msun, m.max_mass_msun
            )));
        }
        if (m.power_law_index - 1.0).abs() < 1e-9 {
            return Err(crate::SelectionError::InvalidConfig(
                "power-law index of exactly 1 is not supported".into(),
            ));
        }
        Ok(())
    }
}
