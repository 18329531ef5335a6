//! Rigid rotations of the sky expressed as intrinsic z-y-z Euler angles.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Rotation matrix for the intrinsic z-y-z Euler sequence.
///
/// The rotation is composed as `Rz(alpha) * Ry(beta) * Rz(gamma)`, the
/// convention used for orienting the pixel-weight sky against the
/// detection-probability sky.
pub fn euler_zyz(alpha: f64, beta: f64, gamma: f64) -> Matrix3<f64> {
    let rz_a = Rotation3::from_axis_angle(&Vector3::z_axis(), alpha);
    let ry_b = Rotation3::from_axis_angle(&Vector3::y_axis(), beta);
    let rz_g = Rotation3::from_axis_angle(&Vector3::z_axis(), gamma);
    (rz_a * ry_b * rz_g).into_inner()
}

/// Apply a rotation to a batch of vectors, returning the rotated copies.
pub fn rotate_vectors(rot: &Matrix3<f64>, vectors: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    vectors.iter().map(|v| rot * v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn zero_angles_give_identity() {
        let r = euler_zyz(0.0, 0.0, 0.0);
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn pure_beta_tilts_the_pole() {
        let r = euler_zyz(0.0, FRAC_PI_2, 0.0);
        let tilted = r * Vector3::z();
        assert_relative_eq!(tilted, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn alpha_and_gamma_spin_about_z() {
        // With beta = 0 the two z-rotations collapse into one
        let r1 = euler_zyz(0.3, 0.0, 0.5);
        let r2 = euler_zyz(0.8, 0.0, 0.0);
        assert_relative_eq!(r1, r2, epsilon = 1e-12);
    }

    #[test]
    fn rotations_are_orthonormal() {
        let r = euler_zyz(1.1, 0.7, -2.3);
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn full_turn_is_identity() {
        let r = euler_zyz(2.0 * PI, 0.0, 0.0);
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn batch_rotation_matches_single() {
        let r = euler_zyz(0.4, 1.2, 2.0);
        let vs = vec![Vector3::x(), Vector3::y(), Vector3::new(0.6, -0.8, 0.0)];
        let rotated = rotate_vectors(&r, &vs);
        for (v, out) in vs.iter().zip(&rotated) {
            assert_relative_eq!(r * v, *out, epsilon = 1e-15);
        }
    }
}
