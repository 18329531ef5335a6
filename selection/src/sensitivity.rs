//! Tabulated frequency-domain sensitivity integrals.
//!
//! The matched-filter signal-to-noise of an inspiral truncated at its
//! innermost-stable-circular-orbit frequency involves
//! `I(f_max) = integral of f^(-7/3) / S(f) df` from the low-frequency cutoff
//! of the noise curve up to `f_max`, with `S = ASD^2`. The integral is
//! tabulated once per noise curve on a grid of cutoff frequencies and then
//! interpolated, so the per-sample cost inside the Monte Carlo loop is a
//! table lookup.

use rayon::prelude::*;

use skymath::{adaptive_simpson, LinearInterp};

use crate::constants::{C_M_S, G_M3_KG_S2};
use crate::psd::PsdTable;
use crate::Result;

/// Gravitational-wave frequency at the innermost stable circular orbit
/// for a binary of total mass `mtot_kg`.
pub fn isco_frequency(mtot_kg: f64) -> f64 {
    C_M_S.powi(3) / (6.0_f64.powf(1.5) * std::f64::consts::PI * mtot_kg * G_M3_KG_S2)
}

/// Interpolated map from cutoff frequency to the inspiral sensitivity
/// integral of one noise curve.
#[derive(Debug, Clone)]
pub struct SensitivityIntegral {
    interp: LinearInterp,
}

impl SensitivityIntegral {
    /// Tabulate the integral on `n_points` cutoff frequencies between the
    /// noise curve's low-frequency edge and `f_limit` (capped at the
    /// table's upper edge). Segment integrals run in parallel and are
    /// prefix-summed into cumulative values.
    pub fn tabulate(psd: &PsdTable, f_limit: f64, n_points: usize, tol: f64) -> Result<Self> {
        let f_lo = psd.f_min();
        let f_hi = f_limit.min(psd.f_max());
        let n = n_points.max(2);
        let step = (f_hi - f_lo) / (n - 1) as f64;
        let grid: Vec<f64> = (0..n).map(|i| f_lo + i as f64 * step).collect();

        let integrand = |f: f64| {
            let asd = psd.asd_at(f);
            f.powf(-7.0 / 3.0) / (asd * asd)
        };

        let segments: Vec<f64> = (1..n)
            .into_par_iter()
            .map(|i| adaptive_simpson(integrand, grid[i - 1], grid[i], tol))
            .collect();

        let mut values = Vec::with_capacity(n);
        values.push(0.0);
        let mut acc = 0.0;
        for s in segments {
            acc += s;
            values.push(acc);
        }

        let interp = LinearInterp::new(grid, values)?;
        Ok(Self { interp })
    }

    /// The integral up to `f_max`, clamped to the tabulated range.
    ///
    /// Below the noise curve's lower edge nothing accumulates, so the
    /// clamp returns 0 there; above the tabulated top it returns the full
    /// integral.
    pub fn evaluate(&self, f_max: f64) -> f64 {
        self.interp.eval_clamped(f_max)
    }
}
