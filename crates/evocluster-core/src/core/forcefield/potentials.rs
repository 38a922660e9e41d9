/// Coulomb prefactor in kJ·Å/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 1389.354_576;

const MIN_DISTANCE: f64 = 1e-6;
const CLASH_ENERGY: f64 = 1e10;

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return CLASH_ENERGY;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

/// `dE/dr` of [`lennard_jones_12_6`]. Zero below the clash distance, where the energy is capped.
#[inline]
pub fn lennard_jones_12_6_derivative(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return 0.0;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth * (rho6 - rho12) / dist
}

#[inline]
pub fn coulomb(dist: f64, q1: f64, q2: f64, dielectric: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return q1.signum() * q2.signum() * CLASH_ENERGY;
    }
    COULOMB_CONSTANT * q1 * q2 / (dielectric * dist)
}

#[inline]
pub fn coulomb_derivative(dist: f64, q1: f64, q2: f64, dielectric: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return 0.0;
    }
    -COULOMB_CONSTANT * q1 * q2 / (dielectric * dist * dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::f64_approx_equal;

    #[test]
    fn lennard_jones_at_minimum_distance_returns_negative_well_depth() {
        let energy = lennard_jones_12_6(3.8, 3.8, 0.996);
        assert!(f64_approx_equal(energy, -0.996, 1e-9));
    }

    #[test]
    fn lennard_jones_at_very_small_distance_returns_large_positive_energy() {
        assert!(f64_approx_equal(lennard_jones_12_6(1e-7, 3.8, 1.0), 1e10, 1e-9));
    }

    #[test]
    fn lennard_jones_derivative_vanishes_at_minimum() {
        assert!(f64_approx_equal(lennard_jones_12_6_derivative(3.8, 3.8, 1.0), 0.0, 1e-9));
        assert!(lennard_jones_12_6_derivative(3.0, 3.8, 1.0) < 0.0);
        assert!(lennard_jones_12_6_derivative(5.0, 3.8, 1.0) > 0.0);
    }

    #[test]
    fn lennard_jones_derivative_matches_finite_difference() {
        let h = 1e-6;
        for dist in [3.2, 3.8, 4.5, 7.0] {
            let numeric = (lennard_jones_12_6(dist + h, 3.8, 1.2)
                - lennard_jones_12_6(dist - h, 3.8, 1.2))
                / (2.0 * h);
            let analytic = lennard_jones_12_6_derivative(dist, 3.8, 1.2);
            assert!((numeric - analytic).abs() < 1e-5, "at {dist}: {numeric} vs {analytic}");
        }
    }

    #[test]
    fn coulomb_calculates_repulsive_and_attractive_energy() {
        assert!(f64_approx_equal(coulomb(1.0, 1.0, 1.0, 1.0), COULOMB_CONSTANT, 1e-9));
        assert!(f64_approx_equal(coulomb(2.0, -1.0, 1.0, 1.0), -COULOMB_CONSTANT / 2.0, 1e-9));
    }

    #[test]
    fn coulomb_at_very_small_distance_returns_large_energy_with_correct_sign() {
        assert!(f64_approx_equal(coulomb(1e-7, 1.0, 1.0, 1.0), 1e10, 1e-9));
        assert!(f64_approx_equal(coulomb(1e-7, -1.0, 1.0, 1.0), -1e10, 1e-9));
    }

    #[test]
    fn coulomb_derivative_matches_finite_difference() {
        let h = 1e-6;
        let numeric = (coulomb(2.0 + h, 0.4, -0.8, 4.0) - coulomb(2.0 - h, 0.4, -0.8, 4.0)) / (2.0 * h);
        assert!((numeric - coulomb_derivative(2.0, 0.4, -0.8, 4.0)).abs() < 1e-4);
    }
}
