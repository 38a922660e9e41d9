use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};

/// Spherical coordinates `(r, phi, omega)` with `phi` the azimuth and `omega` the polar angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub r: f64,
    pub phi: f64,
    pub omega: f64,
}

pub fn spherical_to_cartesian(s: &Spherical) -> Vector3<f64> {
    let sin_omega = s.omega.sin();
    Vector3::new(
        s.r * sin_omega * s.phi.cos(),
        s.r * sin_omega * s.phi.sin(),
        s.r * s.omega.cos(),
    )
}

pub fn cartesian_to_spherical(v: &Vector3<f64>) -> Spherical {
    let r = v.norm();
    let omega = if r > 0.0 { (v.z / r).clamp(-1.0, 1.0).acos() } else { 0.0 };
    Spherical {
        r,
        phi: v.y.atan2(v.x),
        omega,
    }
}

fn sanitize_periodic(value: f64, lower: f64, upper: f64, period: f64) -> f64 {
    let mut v = value;
    while v > upper {
        v -= period;
    }
    while v < lower {
        v += period;
    }
    v
}

/// Folds Euler angles back into `phi, psi ∈ [-π, π]` and `omega ∈ [-π/2, π/2]`.
pub fn sanitize_eulers(eulers: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        sanitize_periodic(eulers.x, -PI, PI, 2.0 * PI),
        sanitize_periodic(eulers.y, -FRAC_PI_2, FRAC_PI_2, PI),
        sanitize_periodic(eulers.z, -PI, PI, 2.0 * PI),
    )
}

/// Rotation for the yaw-pitch-roll triple `(phi, omega, psi)` stored on every molecule.
pub fn euler_rotation(eulers: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_euler_angles(eulers.x, eulers.y, eulers.z).inverse()
}

/// Inverse of [`euler_rotation`].
pub fn eulers_from_rotation(rotation: &Rotation3<f64>) -> Vector3<f64> {
    let (phi, omega, psi) = rotation.inverse().euler_angles();
    Vector3::new(phi, omega, psi)
}

pub fn center_of_mass(positions: &[Point3<f64>], masses: &[f64]) -> Option<Point3<f64>> {
    if positions.is_empty() || positions.len() != masses.len() {
        return None;
    }
    let total: f64 = masses.iter().sum();
    if total <= f64::EPSILON {
        return None;
    }
    let weighted = positions
        .iter()
        .zip(masses)
        .fold(Vector3::zeros(), |acc, (p, &m)| acc + p.coords * m);
    Some(Point3::from(weighted / total))
}

pub fn centroid(positions: &[Point3<f64>]) -> Option<Point3<f64>> {
    if positions.is_empty() {
        return None;
    }
    let sum = positions
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / positions.len() as f64))
}

/// Optimal rotation `R` minimising `Σ |R·reference_i − target_i|²` for two centred point sets.
///
/// Returns `None` when the sets differ in length, are empty, or the SVD does not converge.
pub fn kabsch_rotation(
    reference: &[Vector3<f64>],
    target: &[Vector3<f64>],
) -> Option<Rotation3<f64>> {
    if reference.len() != target.len() || reference.is_empty() {
        return None;
    }
    let covariance = reference
        .iter()
        .zip(target)
        .fold(Matrix3::zeros(), |acc, (p, q)| acc + p * q.transpose());

    let svd = covariance.try_svd(true, true, f64::EPSILON, 200)?;
    let u = svd.u?;
    let v = svd.v_t?.transpose();

    let d = (v * u.transpose()).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let rotation = v * correction * u.transpose();

    if rotation.iter().all(|x| x.is_finite()) {
        Some(Rotation3::from_matrix_unchecked(rotation))
    } else {
        None
    }
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::f64_approx_equal;

    const TOLERANCE: f64 = 1e-9;

    fn vec_approx_equal(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).norm() < 1e-8
    }

    #[test]
    fn spherical_to_cartesian_matches_reference_formula() {
        let s = Spherical {
            r: 2.0,
            phi: 0.3,
            omega: 1.1,
        };
        let v = spherical_to_cartesian(&s);
        assert!(f64_approx_equal(v.x, 2.0 * 1.1f64.sin() * 0.3f64.cos(), TOLERANCE));
        assert!(f64_approx_equal(v.y, 2.0 * 1.1f64.sin() * 0.3f64.sin(), TOLERANCE));
        assert!(f64_approx_equal(v.z, 2.0 * 1.1f64.cos(), TOLERANCE));
    }

    #[test]
    fn cartesian_to_spherical_inverts_spherical_to_cartesian() {
        let s = Spherical {
            r: 3.5,
            phi: -2.0,
            omega: 0.7,
        };
        let back = cartesian_to_spherical(&spherical_to_cartesian(&s));
        assert!(f64_approx_equal(back.r, s.r, TOLERANCE));
        assert!(f64_approx_equal(back.phi, s.phi, TOLERANCE));
        assert!(f64_approx_equal(back.omega, s.omega, TOLERANCE));
    }

    #[test]
    fn cartesian_to_spherical_of_origin_is_zero() {
        let s = cartesian_to_spherical(&Vector3::zeros());
        assert_eq!(s.r, 0.0);
        assert_eq!(s.omega, 0.0);
    }

    #[test]
    fn sanitize_eulers_folds_into_range() {
        let s = sanitize_eulers(&Vector3::new(3.0 * PI, -PI, -2.5 * PI));
        assert!(s.x >= -PI && s.x <= PI);
        assert!(s.y >= -FRAC_PI_2 && s.y <= FRAC_PI_2);
        assert!(s.z >= -PI && s.z <= PI);
        assert!(f64_approx_equal(s.x, PI, TOLERANCE));
    }

    #[test]
    fn euler_rotation_matches_yaw_pitch_roll_matrix() {
        let (phi, omega, psi) = (0.4, -0.3, 1.2);
        let rot = euler_rotation(&Vector3::new(phi, omega, psi));
        let m = rot.matrix();
        let (pc, oc, sc) = (phi.cos(), omega.cos(), psi.cos());
        let (ps, os, ss) = (phi.sin(), omega.sin(), psi.sin());
        assert!(f64_approx_equal(m[(0, 0)], oc * sc, TOLERANCE));
        assert!(f64_approx_equal(m[(0, 1)], oc * ss, TOLERANCE));
        assert!(f64_approx_equal(m[(0, 2)], -os, TOLERANCE));
        assert!(f64_approx_equal(m[(1, 0)], ps * os * sc - pc * ss, TOLERANCE));
        assert!(f64_approx_equal(m[(2, 2)], pc * oc, TOLERANCE));
    }

    #[test]
    fn eulers_from_rotation_recovers_angles() {
        let eulers = Vector3::new(0.4, -0.3, 1.2);
        let back = eulers_from_rotation(&euler_rotation(&eulers));
        assert!(vec_approx_equal(&back, &eulers));
    }

    #[test]
    fn center_of_mass_weights_by_mass() {
        let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)];
        let com = center_of_mass(&positions, &[3.0, 1.0]).unwrap();
        assert!(f64_approx_equal(com.x, 1.0, TOLERANCE));
    }

    #[test]
    fn center_of_mass_rejects_mismatched_input() {
        assert!(center_of_mass(&[Point3::origin()], &[]).is_none());
        assert!(center_of_mass(&[], &[]).is_none());
    }

    #[test]
    fn kabsch_rotation_recovers_known_rotation() {
        let reference = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.5, 0.0),
            Vector3::new(0.0, -0.5, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ];
        let truth = euler_rotation(&Vector3::new(0.2, 0.5, -1.0));
        let target: Vec<_> = reference.iter().map(|v| truth * v).collect();

        let fitted = kabsch_rotation(&reference, &target).unwrap();
        for (r, t) in reference.iter().zip(&target) {
            assert!(vec_approx_equal(&(fitted * r), t));
        }
    }

    #[test]
    fn kabsch_rotation_rejects_mismatched_lengths() {
        assert!(kabsch_rotation(&[Vector3::x()], &[]).is_none());
    }

    #[test]
    fn calculate_rmsd_for_shifted_points_equals_shift() {
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
        let b = [Point3::new(0.0, 0.0, 2.0), Point3::new(1.0, 1.0, 3.0)];
        assert!(f64_approx_equal(calculate_rmsd(&a, &b).unwrap(), 2.0, TOLERANCE));
        assert!(calculate_rmsd(&a, &b[..1]).is_none());
    }
}
