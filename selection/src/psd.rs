//! Noise amplitude-spectral-density tables.
//!
//! Two layouts appear in the wild: a bare two-column file of frequency
//! and amplitude spectral density (used for a whole observing run), and
//! a header-named table with a `Freq` column plus one power-spectral
//! column per instrument (used for per-event noise estimates). Both are
//! reduced to a validated frequency-to-amplitude interpolant.

use std::fs;
use std::path::Path;

use skymath::LinearInterp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsdError {
    #[error("failed to read PSD table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("PSD table line {line}: expected numeric columns, got '{content}'")]
    Malformed { line: usize, content: String },
    #[error("PSD table has no '{0}' column")]
    MissingColumn(String),
    #[error("PSD table needs at least 2 rows, got {0}")]
    TooFewRows(usize),
    #[error("PSD table frequencies must be strictly increasing (row {0})")]
    UnsortedFrequency(usize),
    #[error("PSD table row {line} has {got} fields, header promises {want}")]
    RaggedRow { line: usize, got: usize, want: usize },
}

/// A validated amplitude-spectral-density curve for one instrument.
#[derive(Debug, Clone)]
pub struct PsdTable {
    interp: LinearInterp,
    f_min: f64,
    f_max: f64,
}

impl PsdTable {
    /// Parse a two-column table: frequency and amplitude spectral density.
    pub fn from_two_column(content: &str) -> Result<Self, PsdError> {
        let mut freq = Vec::new();
        let mut asd = Vec::new();
        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (f, a) = match (fields.next(), fields.next()) {
                (Some(f), Some(a)) => (f, a),
                _ => {
                    return Err(PsdError::Malformed {
                        line: i + 1,
                        content: line.to_string(),
                    })
                }
            };
            let f: f64 = parse_field(f, i, line)?;
            let a: f64 = parse_field(a, i, line)?;
            freq.push(f);
            asd.push(a);
        }
        Self::from_columns(freq, asd)
    }

    /// Parse a header-named table and take the square root of the power
    /// column for the requested instrument label.
    pub fn from_named_column(content: &str, column: &str) -> Result<Self, PsdError> {
        let mut lines = content.lines().enumerate();
        let header = loop {
            match lines.next() {
                Some((_, raw)) if raw.trim().is_empty() => continue,
                Some((_, raw)) => break raw.trim().trim_start_matches('#').trim(),
                None => return Err(PsdError::TooFewRows(0)),
            }
        };
        let names: Vec<&str> = header.split_whitespace().collect();
        let freq_idx = names
            .iter()
            .position(|n| *n == "Freq")
            .ok_or_else(|| PsdError::MissingColumn("Freq".to_string()))?;
        let col_idx = names
            .iter()
            .position(|n| *n == column)
            .ok_or_else(|| PsdError::MissingColumn(column.to_string()))?;

        let mut freq = Vec::new();
        let mut asd = Vec::new();
        for (i, raw) in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != names.len() {
                return Err(PsdError::RaggedRow {
                    line: i + 1,
                    got: fields.len(),
                    want: names.len(),
                });
            }
            let f: f64 = parse_field(fields[freq_idx], i, line)?;
            let p: f64 = parse_field(fields[col_idx], i, line)?;
            freq.push(f);
            asd.push(p.sqrt());
        }
        Self::from_columns(freq, asd)
    }

    /// Load a two-column table from disk.
    pub fn load_two_column(path: &Path) -> Result<Self, PsdError> {
        Self::from_two_column(&read(path)?)
    }

    /// Load a named-column table from disk.
    pub fn load_named_column(path: &Path, column: &str) -> Result<Self, PsdError> {
        Self::from_named_column(&read(path)?, column)
    }

    fn from_columns(freq: Vec<f64>, asd: Vec<f64>) -> Result<Self, PsdError> {
        if freq.len() < 2 {
            return Err(PsdError::TooFewRows(freq.len()));
        }
        for i in 1..freq.len() {
            if freq[i] <= freq[i - 1] {
                return Err(PsdError::UnsortedFrequency(i));
            }
        }
        let f_min = freq[0];
        let f_max = *freq.last().expect("non-empty");
        let interp = LinearInterp::new(freq, asd).expect("columns validated above");
        Ok(Self {
            interp,
            f_min,
            f_max,
        })
    }

    pub fn f_min(&self) -> f64 {
        self.f_min
    }

    pub fn f_max(&self) -> f64 {
        self.f_max
    }

    /// Amplitude spectral density at `freq`, clamped to the table edges.
    pub fn asd_at(&self, freq: f64) -> f64 {
        self.interp.eval_clamped(freq)
    }
}

fn read(path: &Path) -> Result<String, PsdError> {
    fs::read_to_string(path).map_err(|source| PsdError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_field(field: &str, line_idx: usize, line: &str) -> Result<f64, PsdError> {
    field.parse().map_err(|_| PsdError::Malformed {
        line: line_idx + 1,
        content: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_COLUMN: &str = "\
10.0  1.0e-23
20.0  2.0e-23
40.0  8.0e-23
";

    const NAMED: &str = "\
Freq\tH1_PSD\tL1_PSD
16.0\t4.0e-46\t9.0e-46
32.0\t1.0e-46\t4.0e-46
";

    #[test]
    fn parses_two_column_tables() {
        let psd = PsdTable::from_two_column(TWO_COLUMN).unwrap();
        assert_eq!(psd.f_min(), 10.0);
        assert_eq!(psd.f_max(), 40.0);
        assert_relative_eq!(psd.asd_at(15.0), 1.5e-23, max_relative = 1e-12);
    }

    #[test]
    fn named_columns_take_square_roots() {
        let h1 = PsdTable::from_named_column(NAMED, "H1_PSD").unwrap();
        assert_relative_eq!(h1.asd_at(16.0), 2.0e-23, max_relative = 1e-12);
        let l1 = PsdTable::from_named_column(NAMED, "L1_PSD").unwrap();
        assert_relative_eq!(l1.asd_at(32.0), 2.0e-23, max_relative = 1e-12);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = PsdTable::from_named_column(NAMED, "V1_PSD").unwrap_err();
        assert!(matches!(err, PsdError::MissingColumn(c) if c == "V1_PSD"));
    }

    #[test]
    fn rejects_non_numeric_content() {
        let err = PsdTable::from_two_column("10.0 abc\n20.0 1.0\n").unwrap_err();
        assert!(matches!(err, PsdError::Malformed { line: 1, .. }));
    }

    #[test]
    fn rejects_short_and_unsorted_tables() {
        assert!(matches!(
            PsdTable::from_two_column("10.0 1.0\n"),
            Err(PsdError::TooFewRows(1))
        ));
        assert!(matches!(
            PsdTable::from_two_column("10.0 1.0\n10.0 2.0\n"),
            Err(PsdError::UnsortedFrequency(1))
        ));
    }

    #[test]
    fn clamps_out_of_band_queries() {
        let psd = PsdTable::from_two_column(TWO_COLUMN).unwrap();
        assert_eq!(psd.asd_at(5.0), 1.0e-23);
        assert_eq!(psd.asd_at(100.0), 8.0e-23);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let psd = PsdTable::from_two_column("# comment\n\n10.0 1.0\n20.0 2.0\n").unwrap();
        assert_eq!(psd.f_min(), 10.0);
    }
}
