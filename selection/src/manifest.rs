//! Analysis manifests.
//!
//! A JSON manifest ties the pipeline stages together: it lists the
//! observing epochs (noise curve, duty-cycle table, detector network)
//! and the individual detections (noise table, network, timestamp,
//! posterior archive). The map binaries read it to know what to build;
//! the inference driver reads it to know what to load. Artifact file
//! names are derived from the labels here so the stages agree without
//! further configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// One observing epoch: a stretch of data with a common noise estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochEntry {
    /// Run label, e.g. `O1`.
    pub label: String,
    /// Two-column amplitude-spectral-density table for the epoch.
    pub psd: PathBuf,
    /// Tab-separated observing-time table.
    pub observing_times: PathBuf,
    /// Instrument labels of the network, e.g. `["H1", "L1"]`.
    pub detectors: Vec<String>,
}

/// One catalogued detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub name: String,
    /// Label of the epoch the event belongs to.
    pub run: String,
    /// GPS detection time in integer seconds.
    pub gps_time: u64,
    /// Named-column power-spectral-density table around the event.
    pub psd: PathBuf,
    /// Instruments that recorded the event.
    pub detectors: Vec<String>,
    /// Posterior-sample archive for the event.
    pub samples: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisManifest {
    pub epochs: Vec<EpochEntry>,
    pub events: Vec<EventEntry>,
}

impl AnalysisManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// File name of an epoch's (pixel, distance) detection map.
pub fn epoch_map_file(label: &str) -> String {
    format!("pofd_epoch_{label}.bin")
}

/// File name of an event's (pixel, distance) detection map.
pub fn event_map_file(name: &str) -> String {
    format!("pofd_event_{name}.bin")
}

/// File name of an epoch's time-averaged, distance-marginalized map.
pub fn epoch_mean_file(label: &str) -> String {
    format!("pofd_mean_{label}.bin")
}

/// File name of an event's distance-marginalized map.
pub fn event_marginal_file(name: &str) -> String {
    format!("pofd_marg_{name}.bin")
}
