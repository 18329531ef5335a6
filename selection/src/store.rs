//! Persistence of map artifacts.
//!
//! Detection-probability maps and their reductions are written as
//! bincode blobs, one file per epoch or event. Errors always name the
//! offending path, since a missing artifact is an operator problem, not
//! something to retry.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        source: bincode::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        source: bincode::Error,
    },
}

/// Serialize a map artifact to `path`.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    bincode::serialize_into(BufWriter::new(file), value).map_err(|source| StoreError::Encode {
        path: path.display().to_string(),
        source,
    })
}

/// Deserialize a map artifact from `path`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|source| StoreError::Decode {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marginal::SkyMap;
    use crate::pofd::DetectionProbabilityMap;
    use ndarray::Array2;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("selection_store_{}_{}", std::process::id(), name))
    }

    #[test]
    fn round_trips_a_detection_map() {
        let map = DetectionProbabilityMap {
            nside: 1,
            distances_mpc: vec![1.0, 10.0, 100.0],
            values: Array2::from_shape_fn((12, 3), |(k, j)| (k * 3 + j) as f64 * 0.01),
        };
        let path = scratch_path("pofd.bin");
        save(&path, &map).unwrap();
        let back: DetectionProbabilityMap = load(&path).unwrap();
        assert_eq!(back.nside, map.nside);
        assert_eq!(back.distances_mpc, map.distances_mpc);
        assert_eq!(back.values, map.values);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn round_trips_a_sky_map() {
        let map = SkyMap {
            nside: 2,
            values: (0..48).map(|i| i as f64 / 48.0).collect(),
        };
        let path = scratch_path("sky.bin");
        save(&path, &map).unwrap();
        let back: SkyMap = load(&path).unwrap();
        assert_eq!(back, map);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load::<SkyMap>(Path::new("/nonexistent/map.bin")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/map.bin"), "message: {msg}");
    }
}
