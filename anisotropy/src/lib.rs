//! Anisotropy inference over the sky distribution of detections.
//!
//! The selection-function stage leaves one probability-of-detection sky
//! map per observing run and per event. This crate joins those maps
//! with downsampled posterior samples into immutable `Event` and `Run`
//! records, and evaluates an inhomogeneous-Poisson-process posterior
//! over a coarse grid of pixel rate weights and a rigid sky rotation.
//! The `Model` exposes the prior/likelihood pair a nested sampler
//! drives; the isotropic special cases provide analytic and numerical
//! cross-checks.

pub mod archive;
pub mod event;
pub mod isotropic;
pub mod model;
pub mod run;

pub use archive::{PosteriorTable, SampleArchive};
pub use event::{downsample, Event, EventConfig, RunLabel};
pub use isotropic::{IsotropicModel, MaxPosterior, NumericalIsotropicModel};
pub use model::{Model, ModelConfig, Params};
pub use run::Run;

use thiserror::Error;

/// Errors raised while assembling the inference inputs.
///
/// Out-of-bounds parameters during sampling are not errors: the model
/// signals them with `-inf` log-probabilities so the sampler can reject
/// the point and move on.
#[derive(Debug, Error)]
pub enum AnisotropyError {
    #[error(transparent)]
    Archive(#[from] archive::ArchiveError),
    #[error("unknown run label '{0}'")]
    UnknownRunLabel(String),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid run: {0}")]
    InvalidRun(String),
    #[error("invalid model setup: {0}")]
    InvalidModel(String),
    #[error(transparent)]
    Pixelization(#[from] skymath::healpix::PixelizationError),
    #[error(transparent)]
    Store(#[from] selection::store::StoreError),
}

pub type Result<T> = std::result::Result<T, AnisotropyError>;
