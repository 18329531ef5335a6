//! Observing-run records.

use nalgebra::{Matrix3, Vector3};

use selection::marginal::SkyMap;
use selection::obstime::ObservingSchedule;
use skymath::Pixelization;

use crate::event::{rotate_map_gather, RunLabel};
use crate::{AnisotropyError, Result};

/// Immutable record of one observing run: its time-averaged mean
/// probability-of-detection map and its total time on sky.
#[derive(Debug, Clone)]
pub struct Run {
    label: RunLabel,
    map: SkyMap,
    observing_years: f64,
    pixelization: Pixelization,
    pixel_vectors: Vec<Vector3<f64>>,
}

impl Run {
    pub fn new(label: RunLabel, map: SkyMap, observing_years: f64) -> Result<Self> {
        if !(observing_years > 0.0 && observing_years.is_finite()) {
            return Err(AnisotropyError::InvalidRun(format!(
                "observing time of {} must be positive, got {observing_years}",
                label.label()
            )));
        }
        let pixelization = Pixelization::new(map.nside)?;
        if map.values.len() != pixelization.npix() {
            return Err(AnisotropyError::InvalidRun(format!(
                "map for {} has {} pixels where nside {} implies {}",
                label.label(),
                map.values.len(),
                map.nside,
                pixelization.npix()
            )));
        }
        let pixel_vectors = pixelization.pixel_centers();
        Ok(Self {
            label,
            map,
            observing_years,
            pixelization,
            pixel_vectors,
        })
    }

    /// Build a run record with the observing time taken from a parsed
    /// duty-cycle table.
    pub fn from_schedule(label: RunLabel, map: SkyMap, schedule: &ObservingSchedule) -> Result<Self> {
        Self::new(label, map, schedule.observing_years())
    }

    pub fn label(&self) -> RunLabel {
        self.label
    }

    pub fn map(&self) -> &SkyMap {
        &self.map
    }

    /// Total time on sky in Julian years.
    pub fn observing_years(&self) -> f64 {
        self.observing_years
    }

    pub fn pixelization(&self) -> Pixelization {
        self.pixelization
    }

    /// The mean detection map rotated by `rot`, as a fresh value array.
    pub fn rotate_map(&self, rot: &Matrix3<f64>) -> Vec<f64> {
        rotate_map_gather(&self.pixelization, &self.map.values, &self.pixel_vectors, rot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skymath::euler_zyz;

    #[test]
    fn carries_observing_time_from_a_schedule() {
        let schedule = ObservingSchedule::from_tsv(
            "GPSstart\tGPSend\n1126000000\t1141773600\n", // half a Julian year
        )
        .unwrap();
        let run = Run::from_schedule(RunLabel::O1, SkyMap::uniform(1, 0.3), &schedule).unwrap();
        assert_relative_eq!(run.observing_years(), 0.4998, epsilon = 1e-3);
    }

    #[test]
    fn rejects_nonpositive_observing_time() {
        assert!(Run::new(RunLabel::O2, SkyMap::uniform(1, 0.3), 0.0).is_err());
        assert!(Run::new(RunLabel::O2, SkyMap::uniform(1, 0.3), -1.0).is_err());
    }

    #[test]
    fn rejects_inconsistent_maps() {
        let wrong = SkyMap {
            nside: 2,
            values: vec![0.1; 12],
        };
        assert!(Run::new(RunLabel::O1, wrong, 1.0).is_err());
    }

    #[test]
    fn uniform_maps_are_rotation_invariant() {
        let run = Run::new(RunLabel::O3a, SkyMap::uniform(2, 0.27), 1.0).unwrap();
        let rotated = run.rotate_map(&euler_zyz(1.0, 0.8, -2.0));
        for v in rotated {
            assert_eq!(v, 0.27);
        }
    }

    #[test]
    fn rotation_permutes_without_losing_mass_much() {
        let pix = Pixelization::new(4).unwrap();
        let values: Vec<f64> = (0..pix.npix()).map(|i| (i % 9) as f64).collect();
        let run = Run::new(RunLabel::O2, SkyMap { nside: 4, values: values.clone() }, 1.0).unwrap();
        let rotated = run.rotate_map(&euler_zyz(0.0, 0.0, 1.1));
        // A pure azimuthal rotation relabels pixels within each ring
        let mut a = rotated;
        let mut b = values;
        a.sort_by(f64::total_cmp);
        b.sort_by(f64::total_cmp);
        assert_eq!(a, b);
    }
}
