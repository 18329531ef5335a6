//! Observing-time tables.
//!
//! A run's duty cycle arrives as a tab-separated table of science
//! segments with GPS second boundaries, optionally carrying precomputed
//! sidereal columns. Each segment is reduced to an unwrapped sidereal
//! interval (end at or above start) so that downstream integrals over
//! sidereal angle see a monotone domain, and the total observing time is
//! the plain sum of GPS spans, expressed in Julian years.

use std::fs;
use std::path::Path;

use skymath::{gmst_from_gps, JULIAN_YEAR_SECONDS, SIDEREAL_DAY_SECONDS};
use thiserror::Error;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to read observing-time table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("observing-time table has no '{0}' column")]
    MissingColumn(String),
    #[error("observing-time table line {line}: expected numeric columns, got '{content}'")]
    Malformed { line: usize, content: String },
    #[error("observing-time table has no segments")]
    Empty,
    #[error("segment on line {line} ends before it starts")]
    NegativeSegment { line: usize },
}

/// One science segment of an observing run.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub gps_start: f64,
    pub gps_end: f64,
    /// Sidereal angle at the segment start, radians.
    pub gmst_start: f64,
    /// Sidereal angle at the segment end, unwrapped so it never falls
    /// below `gmst_start`.
    pub gmst_end: f64,
}

/// The science segments of one observing run.
#[derive(Debug, Clone)]
pub struct ObservingSchedule {
    segments: Vec<Segment>,
}

impl ObservingSchedule {
    /// Parse a tab-separated table with a header row.
    ///
    /// `GPSstart` and `GPSend` columns are required. When `GMSTstart`
    /// and `GMSTend` are both present they are taken as given (unwrapped
    /// if the end sits below the start); otherwise the sidereal interval
    /// is derived from the GPS boundaries.
    pub fn from_tsv(content: &str) -> Result<Self, ScheduleError> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());
        let (_, header) = lines.next().ok_or(ScheduleError::Empty)?;
        let names: Vec<&str> = header.trim().trim_start_matches('#').split_whitespace().collect();

        let column = |name: &str| names.iter().position(|n| *n == name);
        let gps_start_idx =
            column("GPSstart").ok_or_else(|| ScheduleError::MissingColumn("GPSstart".into()))?;
        let gps_end_idx =
            column("GPSend").ok_or_else(|| ScheduleError::MissingColumn("GPSend".into()))?;
        let gmst_idx = match (column("GMSTstart"), column("GMSTend")) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        };

        let mut segments = Vec::new();
        for (i, raw) in lines {
            let line = raw.trim();
            let fields: Vec<&str> = line.split_whitespace().collect();
            let field = |idx: usize| -> Result<f64, ScheduleError> {
                fields
                    .get(idx)
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(|| ScheduleError::Malformed {
                        line: i + 1,
                        content: line.to_string(),
                    })
            };

            let gps_start = field(gps_start_idx)?;
            let gps_end = field(gps_end_idx)?;
            if gps_end < gps_start {
                return Err(ScheduleError::NegativeSegment { line: i + 1 });
            }

            let (gmst_start, gmst_end) = match gmst_idx {
                Some((s, e)) => {
                    let start = field(s)?;
                    let mut end = field(e)?;
                    while end < start {
                        end += TWO_PI;
                    }
                    (start, end)
                }
                None => {
                    let start = gmst_from_gps(gps_start);
                    let advance = (gps_end - gps_start) * TWO_PI / SIDEREAL_DAY_SECONDS;
                    (start, start + advance)
                }
            };

            segments.push(Segment {
                gps_start,
                gps_end,
                gmst_start,
                gmst_end,
            });
        }

        if segments.is_empty() {
            return Err(ScheduleError::Empty);
        }
        Ok(Self { segments })
    }

    /// Load a table from disk.
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let content = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_tsv(&content)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total time on sky in seconds.
    pub fn total_observing_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.gps_end - s.gps_start)
            .sum()
    }

    /// Total time on sky in Julian years.
    pub fn observing_years(&self) -> f64 {
        self.total_observing_seconds() / JULIAN_YEAR_SECONDS
    }

    /// Sum of the sidereal spans of all segments, the normalization of
    /// the time-averaged sky maps.
    pub fn total_sidereal_radians(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.gmst_end - s.gmst_start)
            .sum()
    }
}
