//! Adaptive Simpson quadrature.
//!
//! Used for the distance marginalization of detection maps, the
//! sensitivity-integral tabulation and the one-dimensional isotropic
//! evidence integral. The integrands are smooth; recursion splits an
//! interval until the two-panel Simpson estimate agrees with the
//! one-panel estimate, with a Richardson correction on acceptance.

const MAX_DEPTH: u32 = 50;

/// Integrate `f` over `[a, b]` to the requested absolute tolerance.
pub fn adaptive_simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, tol: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    recurse(&f, a, b, fa, fm, fb, whole, tol, MAX_DEPTH)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn recurse<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tol: f64,
    depth: u32,
) -> f64 {
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol {
        return left + right + delta / 15.0;
    }
    recurse(f, a, m, fa, flm, fm, left, 0.5 * tol, depth - 1)
        + recurse(f, m, b, fm, frm, fb, right, 0.5 * tol, depth - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn polynomials_are_exact() {
        let v = adaptive_simpson(|x| x * x, 0.0, 1.0, 1e-10);
        assert_relative_eq!(v, 1.0 / 3.0, epsilon = 1e-10);
        // Simpson integrates cubics exactly
        let v = adaptive_simpson(|x| x * x * x, -1.0, 2.0, 1e-10);
        assert_relative_eq!(v, 15.0 / 4.0, epsilon = 1e-10);
    }

    #[test]
    fn integrates_sine_over_half_period() {
        let v = adaptive_simpson(f64::sin, 0.0, PI, 1e-10);
        assert_relative_eq!(v, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn handles_steep_power_law() {
        // Integrand shape of the sensitivity integral with a flat spectrum
        let v = adaptive_simpson(|f| f.powf(-7.0 / 3.0), 10.0, 1000.0, 1e-12);
        let exact = (10.0f64.powf(-4.0 / 3.0) - 1000.0f64.powf(-4.0 / 3.0)) * 3.0 / 4.0;
        assert_relative_eq!(v, exact, max_relative = 1e-8);
    }

    #[test]
    fn degenerate_interval_is_zero() {
        assert_eq!(adaptive_simpson(|x| x, 3.0, 3.0, 1e-8), 0.0);
    }

    #[test]
    fn reversed_interval_changes_sign() {
        let fwd = adaptive_simpson(|x| x * x, 0.0, 2.0, 1e-10);
        let rev = adaptive_simpson(|x| x * x, 2.0, 0.0, 1e-10);
        assert_relative_eq!(fwd, -rev, epsilon = 1e-9);
    }
}
