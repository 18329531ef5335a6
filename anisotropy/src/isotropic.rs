//! Isotropic special cases of the anisotropy model.
//!
//! Forcing every pixel weight to a single value collapses the model to
//! one rate parameter. `IsotropicModel` carries the two closed-form
//! constants of that collapse; `NumericalIsotropicModel` reaches the
//! same posterior through the full numerical machinery with twelve tied
//! weights and the identity rotation. Agreement between the two is the
//! standing sanity check on the pixelized likelihood.

use skymath::adaptive_simpson;

use crate::event::Event;
use crate::model::{Model, ModelConfig, Params};
use crate::run::Run;
use crate::Result;

const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

/// Range of the tied weight used for the evidence integral.
const EVIDENCE_BOUNDS: (f64, f64) = (1e-5, 100.0);
/// Grid for the posterior maximum search.
const MAX_GRID_BOUNDS: (f64, f64) = (1e-5, 20.0);
const MAX_GRID_POINTS: usize = 1000;

/// Closed-form constants of the analytic isotropic model.
///
/// `alpha_const` scales the expected detection count per unit weight;
/// `beta_const` is the product of the events' average prior weights.
#[derive(Debug, Clone, Copy)]
pub struct IsotropicModel {
    alpha_const: f64,
    beta_const: f64,
}

impl IsotropicModel {
    pub fn new(events: &[Event], runs: &[Run], dlmax_mpc: f64) -> Self {
        let volume = 4.0 / 3.0 * std::f64::consts::PI * (dlmax_mpc * 1e-3).powi(3);

        let alpha_const = runs
            .iter()
            .map(|run| {
                let map_sum: f64 = run.map().values.iter().sum();
                FOUR_PI / run.map().values.len() as f64
                    * volume
                    * run.observing_years()
                    * map_sum
            })
            .sum();

        let beta_const = events
            .iter()
            .map(|event| {
                let mean: f64 = event
                    .pdist()
                    .iter()
                    .zip(event.pmass())
                    .map(|(d, m)| d * m)
                    .sum::<f64>()
                    / event.n_samples() as f64;
                mean / event.map().values.len() as f64
            })
            .product();

        Self {
            alpha_const,
            beta_const,
        }
    }

    /// Expected detections per unit uniform weight.
    pub fn alpha_const(&self) -> f64 {
        self.alpha_const
    }

    /// Product over events of the mean prior weight per map pixel.
    pub fn beta_const(&self) -> f64 {
        self.beta_const
    }
}

/// The posterior maximum over the rate grid.
#[derive(Debug, Clone)]
pub struct MaxPosterior {
    /// Total rate grid, `4*pi` times the tied weight.
    pub rates: Vec<f64>,
    /// Log posterior at each grid point.
    pub log_posterior: Vec<f64>,
    /// Rate at the grid argmax.
    pub rate_at_max: f64,
}

/// The general model pinned to twelve equal weights and no rotation.
pub struct NumericalIsotropicModel {
    model: Model,
}

impl NumericalIsotropicModel {
    pub fn new(
        events: Vec<Event>,
        runs: Vec<Run>,
        rate_bounds: (f64, f64),
        dlmax_mpc: f64,
    ) -> Result<Self> {
        let model = Model::new(
            events,
            runs,
            ModelConfig {
                weights_nside: 1,
                rate_bounds,
                dlmax_mpc,
            },
        )?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    fn params(&self, a0: f64) -> Params {
        Params {
            weights: vec![a0; self.model.n_weights()],
            alpha: 0.0,
            cos_beta: 1.0,
            gamma: 0.0,
        }
    }

    /// Jeffreys prior on the tied weight.
    pub fn log_prior(a0: f64) -> f64 {
        if a0 <= 0.0 {
            return f64::NEG_INFINITY;
        }
        -0.5 * (FOUR_PI * a0).ln()
    }

    pub fn log_likelihood(&self, a0: f64) -> f64 {
        self.model.log_likelihood(&self.params(a0))
    }

    pub fn log_posterior(&self, a0: f64) -> f64 {
        Self::log_prior(a0) + self.log_likelihood(a0)
    }

    /// Log of the 1D evidence integral over the tied weight.
    pub fn log_evidence(&self, tol: f64) -> f64 {
        let (lo, hi) = EVIDENCE_BOUNDS;
        adaptive_simpson(|a0| self.log_posterior(a0).exp(), lo, hi, tol).ln()
    }

    /// Grid search for the posterior maximum, returning the full grid
    /// alongside the argmax.
    pub fn maximum_logpost(&self) -> MaxPosterior {
        let (lo, hi) = MAX_GRID_BOUNDS;
        let step = (hi - lo) / (MAX_GRID_POINTS - 1) as f64;
        let mut rates = Vec::with_capacity(MAX_GRID_POINTS);
        let mut log_posterior = Vec::with_capacity(MAX_GRID_POINTS);
        let mut best = 0usize;
        for i in 0..MAX_GRID_POINTS {
            let a0 = lo + i as f64 * step;
            let lp = self.log_posterior(a0);
            rates.push(FOUR_PI * a0);
            log_posterior.push(lp);
            if lp > log_posterior[best] {
                best = i;
            }
        }
        MaxPosterior {
            rate_at_max: rates[best],
            rates,
            log_posterior,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::PosteriorTable;
    use crate::event::{EventConfig, RunLabel};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;
    use selection::marginal::SkyMap;

    const DLMAX: f64 = 1000.0;

    /// Two runs and two events tuned so the analytic constants come out
    /// round: alpha_const = 2, each event's beta factor = 1/2.
    fn fixture() -> (Vec<Event>, Vec<Run>) {
        let volume = 4.0 / 3.0 * std::f64::consts::PI; // (dlmax * 1e-3)^3 = 1
        // alpha_const = 2*pi*V*T_total with a uniform 0.5 map; pick the
        // total observing time that makes it exactly 2
        let total_years = 2.0 / (2.0 * std::f64::consts::PI * volume);
        let runs = vec![
            Run::new(RunLabel::O1, SkyMap::uniform(1, 0.5), 0.25 * total_years).unwrap(),
            Run::new(RunLabel::O2, SkyMap::uniform(1, 0.5), 0.75 * total_years).unwrap(),
        ];

        // Four identical samples: pmass = 1/4 each, and a distance such
        // that pdist = 24, so mean(pdist * pmass) / 12 = 1/2
        let n = 4;
        let distance = (8.0 * DLMAX.powi(3)).sqrt();
        let table = PosteriorTable {
            right_ascension: vec![1.0; n],
            declination: vec![0.3; n],
            primary_mass_msun: vec![30.0; n],
            luminosity_distance_mpc: vec![distance; n],
        };
        let config = EventConfig {
            dlmax_mpc: DLMAX,
            n_samples: n,
            ..Default::default()
        };
        let events = vec![
            Event::new(
                "EV1",
                RunLabel::O1,
                1_126_259_462,
                &table,
                SkyMap::uniform(1, 0.5),
                &config,
                1,
            )
            .unwrap(),
            Event::new(
                "EV2",
                RunLabel::O2,
                1_187_008_882,
                &table,
                SkyMap::uniform(1, 0.5),
                &config,
                2,
            )
            .unwrap(),
        ];
        (events, runs)
    }

    #[test]
    fn analytic_constants_hit_the_tuned_values() {
        let (events, runs) = fixture();
        let iso = IsotropicModel::new(&events, &runs, DLMAX);
        assert_relative_eq!(iso.alpha_const(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(iso.beta_const(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn numerical_expected_count_matches_alpha_const() {
        let (events, runs) = fixture();
        let iso = IsotropicModel::new(&events, &runs, DLMAX);
        let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DLMAX).unwrap();
        let fine = num.model().expand_weights(&vec![1.0; 12]);
        assert_relative_eq!(
            num.model().nexp(&Matrix3::identity(), &fine),
            iso.alpha_const(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn likelihood_matches_the_hand_computed_form() {
        // With alpha_const = 2 and mean prior weight 6 per event,
        // loglike(a0) = -2 a0 + 2 ln(6 a0)
        let (events, runs) = fixture();
        let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DLMAX).unwrap();
        for a0 in [0.1_f64, 0.7, 1.0, 3.0] {
            let expected = -2.0 * a0 + 2.0 * (6.0 * a0).ln();
            assert_relative_eq!(num.log_likelihood(a0), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn posterior_maximum_sits_at_the_analytic_argmax() {
        // d/da0 [-0.5 ln(4 pi a0) - 2 a0 + 2 ln(6 a0)] = 0 at a0 = 3/4
        let (events, runs) = fixture();
        let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DLMAX).unwrap();
        let max = num.maximum_logpost();
        assert_eq!(max.rates.len(), 1000);
        let grid_step = FOUR_PI * 20.0 / 999.0;
        assert_relative_eq!(
            max.rate_at_max,
            FOUR_PI * 0.75,
            epsilon = grid_step
        );
    }

    #[test]
    fn grid_argmax_dominates_every_grid_point() {
        let (events, runs) = fixture();
        let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DLMAX).unwrap();
        let max = num.maximum_logpost();
        let at_max = num.log_posterior(max.rate_at_max / FOUR_PI);
        for (i, &lp) in max.log_posterior.iter().enumerate() {
            assert!(at_max >= lp, "grid point {i} beats the argmax");
        }
    }

    #[test]
    fn evidence_is_finite_and_stable() {
        let (events, runs) = fixture();
        let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DLMAX).unwrap();
        let coarse = num.log_evidence(1e-8);
        let fine = num.log_evidence(1e-10);
        assert!(coarse.is_finite());
        assert_relative_eq!(coarse, fine, epsilon = 1e-4);
    }

    #[test]
    fn prior_rejects_nonpositive_weight() {
        assert_eq!(NumericalIsotropicModel::log_prior(0.0), f64::NEG_INFINITY);
        assert_eq!(NumericalIsotropicModel::log_prior(-1.0), f64::NEG_INFINITY);
        assert!(NumericalIsotropicModel::log_prior(0.5).is_finite());
    }
}
