//! Selection-function estimation for compact-binary merger searches.
//!
//! This crate builds probability-of-detection maps over (sky pixel,
//! luminosity distance) for a network of ground-based interferometers:
//! Monte Carlo sampling of source parameters, closed-form antenna
//! responses, matched-filter signal-to-noise from tabulated sensitivity
//! integrals, and a noncentral chi-square detection criterion. A second
//! stage marginalizes the maps over distance and averages them over the
//! sidereal rotation of each observing run.

pub mod config;
pub mod detector;
pub mod manifest;
pub mod marginal;
pub mod montecarlo;
pub mod obstime;
pub mod pofd;
pub mod psd;
pub mod sensitivity;
pub mod stats;
pub mod store;

pub use config::{MassFunctionConfig, SelectionConfig};
pub use detector::Site;
pub use marginal::{marginalize_distance, time_average, SkyMap};
pub use montecarlo::SourceEnsemble;
pub use obstime::ObservingSchedule;
pub use pofd::{DetectionProbabilityMap, SelectionEstimator};
pub use psd::PsdTable;
pub use sensitivity::SensitivityIntegral;

use thiserror::Error;

/// Errors produced while assembling or persisting selection-function maps.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("unknown detector label '{0}'")]
    UnknownDetector(String),
    #[error(transparent)]
    Psd(#[from] psd::PsdError),
    #[error(transparent)]
    Schedule(#[from] obstime::ScheduleError),
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Manifest(#[from] manifest::ManifestError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Pixelization(#[from] skymath::healpix::PixelizationError),
    #[error(transparent)]
    Interp(#[from] skymath::interp::InterpError),
}

pub type Result<T> = std::result::Result<T, SelectionError>;

/// Physical constants used by the signal-to-noise model.
pub mod constants {
    /// Solar mass in kilograms.
    pub const M_SUN_KG: f64 = 1.989e30;
    /// Megaparsec in meters.
    pub const MPC_M: f64 = 3.0857e22;
    /// Speed of light in m/s.
    pub const C_M_S: f64 = 299_792_458.0;
    /// Newtonian gravitational constant in m^3 kg^-1 s^-2.
    pub const G_M3_KG_S2: f64 = 6.674_30e-11;
}
