//! Greenwich Mean Sidereal Time from GPS seconds.
//!
//! Observing-time tables and event timestamps carry GPS seconds; the
//! antenna pattern and map rotations need the corresponding Earth
//! orientation angle. GPS seconds are first shifted onto UTC with the
//! leap-second ledger for the relevant era, then converted to a Julian
//! date and pushed through the IAU 1982 GMST polynomial. UT1 minus UTC
//! (below a second) is ignored, which is far inside the statistical
//! tolerance of the maps built on top of this.

use std::f64::consts::PI;

/// Seconds in a Julian year, used to express observing time in years.
pub const JULIAN_YEAR_SECONDS: f64 = 31_557_600.0;

/// Mean sidereal day in SI seconds.
pub const SIDEREAL_DAY_SECONDS: f64 = 86_164.0905;

/// Julian date of the GPS epoch, 1980-01-06 00:00:00 UTC.
const GPS_EPOCH_JD: f64 = 2_444_244.5;

/// Julian date of the J2000 epoch.
const J2000_JD: f64 = 2_451_545.0;

/// GPS-minus-UTC offsets: seconds accumulated by the given GPS time.
/// Thresholds are the GPS times of the leap insertions covering the
/// advanced-detector observing era.
const LEAP_LEDGER: &[(f64, f64)] = &[
    (1_167_264_018.0, 18.0), // 2017-01-01
    (1_119_744_017.0, 17.0), // 2015-07-01
    (1_025_136_016.0, 16.0), // 2012-07-01
    (914_803_215.0, 15.0),   // 2009-01-01
];

fn gps_minus_utc(gps_seconds: f64) -> f64 {
    for &(threshold, offset) in LEAP_LEDGER {
        if gps_seconds >= threshold {
            return offset;
        }
    }
    15.0
}

/// Greenwich Mean Sidereal Time in radians, wrapped to [0, 2*pi).
pub fn gmst_from_gps(gps_seconds: f64) -> f64 {
    let utc_since_epoch = gps_seconds - gps_minus_utc(gps_seconds);
    let jd = GPS_EPOCH_JD + utc_since_epoch / 86_400.0;
    let d = jd - J2000_JD;
    let t = d / 36_525.0;
    let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    gmst_deg.rem_euclid(360.0).to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wraps_into_range() {
        for gps in [0.0, 5.0e8, 1.0e9, 1.2e9, 1.3e9] {
            let g = gmst_from_gps(gps);
            assert!((0.0..2.0 * PI).contains(&g), "gmst {g} for gps {gps}");
        }
    }

    #[test]
    fn advances_at_the_sidereal_rate() {
        let gps = 1.15e9;
        let dt = 3600.0;
        let g0 = gmst_from_gps(gps);
        let g1 = gmst_from_gps(gps + dt);
        let expected = dt * 2.0 * PI / SIDEREAL_DAY_SECONDS;
        let advance = (g1 - g0).rem_euclid(2.0 * PI);
        assert_relative_eq!(advance, expected, epsilon = 1e-6);
    }

    #[test]
    fn one_sidereal_day_closes_the_circle() {
        let gps = 1.187e9;
        let g0 = gmst_from_gps(gps);
        let g1 = gmst_from_gps(gps + SIDEREAL_DAY_SECONDS);
        let diff = (g1 - g0 + PI).rem_euclid(2.0 * PI) - PI;
        assert!(diff.abs() < 1e-5, "drift over one sidereal day: {diff}");
    }

    #[test]
    fn matches_hand_computed_value_for_first_detection_epoch() {
        // 2015-09-14 09:50:45 UTC; GMST roughly 140.7 degrees
        let g = gmst_from_gps(1_126_259_462.0);
        assert_relative_eq!(g.to_degrees(), 140.75, epsilon = 0.3);
    }

    #[test]
    fn leap_ledger_is_monotone() {
        assert!(gps_minus_utc(1.2e9) == 18.0);
        assert!(gps_minus_utc(1.13e9) == 17.0);
        assert!(gps_minus_utc(1.0e9) == 15.0);
    }
}
