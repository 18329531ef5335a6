//! Posterior-sample archives.
//!
//! An archive is a JSON object mapping group names to column tables,
//! one group per waveform approximant used in the parameter estimation.
//! Which approximant a catalog release carries varies, as do the column
//! names for the same physical quantity, so resolution is a prioritized
//! lookup over known group names and per-quantity alias lists rather
//! than a fixed schema.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Approximant-named table groups, tried in priority order.
pub const APPROXIMANT_GROUPS: &[&str] = &[
    "IMRPhenomPv2_posterior",
    "IMRPhenomPv3HM_posterior",
    "IMRPhenomXPHM_posterior",
    "posterior",
];

/// Column aliases per quantity; catalogs before and after O3 disagree.
const RA_COLUMNS: &[&str] = &["right_ascension", "ra"];
const DEC_COLUMNS: &[&str] = &["declination", "dec"];
const M1_COLUMNS: &[&str] = &["m1_detector_frame_Msun", "mass_1_source"];
const DIST_COLUMNS: &[&str] = &["luminosity_distance_Mpc", "luminosity_distance"];

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read sample archive {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse sample archive {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("no posterior group in archive; tried {tried:?}")]
    NoPosteriorGroup { tried: Vec<String> },
    #[error("no {quantity} column in posterior table; tried {tried:?}")]
    MissingColumn {
        quantity: &'static str,
        tried: Vec<String>,
    },
    #[error("column '{column}' has {got} rows where {want} were expected")]
    RaggedColumn {
        column: String,
        got: usize,
        want: usize,
    },
    #[error("posterior table is empty")]
    EmptyTable,
}

type ColumnTable = BTreeMap<String, Vec<f64>>;

/// An on-disk archive of posterior-sample tables keyed by group name.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SampleArchive {
    groups: BTreeMap<String, ColumnTable>,
}

impl SampleArchive {
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let content = fs::read_to_string(path).map_err(|source| ArchiveError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ArchiveError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Resolve the posterior table, trying the known approximant group
    /// names in priority order.
    pub fn resolve_posterior(&self) -> Result<PosteriorTable, ArchiveError> {
        for name in APPROXIMANT_GROUPS {
            if let Some(table) = self.groups.get(*name) {
                return PosteriorTable::from_columns(table);
            }
        }
        Err(ArchiveError::NoPosteriorGroup {
            tried: APPROXIMANT_GROUPS.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// The posterior-sample columns the inference consumes.
#[derive(Debug, Clone)]
pub struct PosteriorTable {
    /// Right ascension in radians.
    pub right_ascension: Vec<f64>,
    /// Declination in radians.
    pub declination: Vec<f64>,
    /// Primary component mass in solar masses.
    pub primary_mass_msun: Vec<f64>,
    /// Luminosity distance in Mpc.
    pub luminosity_distance_mpc: Vec<f64>,
}

impl PosteriorTable {
    fn from_columns(table: &ColumnTable) -> Result<Self, ArchiveError> {
        let resolve = |quantity: &'static str, aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|name| table.get(*name))
                .cloned()
                .ok_or_else(|| ArchiveError::MissingColumn {
                    quantity,
                    tried: aliases.iter().map(|s| s.to_string()).collect(),
                })
        };

        let right_ascension = resolve("right-ascension", RA_COLUMNS)?;
        let declination = resolve("declination", DEC_COLUMNS)?;
        let primary_mass_msun = resolve("primary-mass", M1_COLUMNS)?;
        let luminosity_distance_mpc = resolve("luminosity-distance", DIST_COLUMNS)?;

        let want = right_ascension.len();
        if want == 0 {
            return Err(ArchiveError::EmptyTable);
        }
        for (column, len) in [
            ("declination", declination.len()),
            ("primary-mass", primary_mass_msun.len()),
            ("luminosity-distance", luminosity_distance_mpc.len()),
        ] {
            if len != want {
                return Err(ArchiveError::RaggedColumn {
                    column: column.to_string(),
                    got: len,
                    want,
                });
            }
        }

        Ok(Self {
            right_ascension,
            declination,
            primary_mass_msun,
            luminosity_distance_mpc,
        })
    }

    pub fn len(&self) -> usize {
        self.right_ascension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.right_ascension.is_empty()
    }
}
