use super::geometry::sanitize_eulers;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::f64::consts::{FRAC_PI_2, PI};

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let phi: f64 = rng.gen_range(0.0..(2.0 * PI));
    let rho = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(rho * phi.cos(), rho * phi.sin(), z)
}

/// Random direction scaled by `±max_length·u`, so the result never exceeds `max_length`.
pub fn random_displacement<R: Rng + ?Sized>(rng: &mut R, max_length: f64) -> Vector3<f64> {
    let sign = if rng.r#gen::<bool>() { 1.0 } else { -1.0 };
    random_unit_vector(rng) * (sign * max_length * rng.r#gen::<f64>())
}

pub fn random_eulers<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    Vector3::new(
        rng.gen_range(-PI..PI),
        rng.gen_range(-FRAC_PI_2..FRAC_PI_2),
        rng.gen_range(-PI..PI),
    )
}

/// Shifts each angle by up to `strength` of its full range and folds the result back.
pub fn perturb_eulers<R: Rng + ?Sized>(
    eulers: &Vector3<f64>,
    strength: f64,
    rng: &mut R,
) -> Vector3<f64> {
    let strength = strength.clamp(0.0, 1.0);
    let delta = Vector3::new(
        rng.gen_range(-1.0..=1.0) * strength * PI,
        rng.gen_range(-1.0..=1.0) * strength * FRAC_PI_2,
        rng.gen_range(-1.0..=1.0) * strength * PI,
    );
    sanitize_eulers(&(eulers + delta))
}

/// `count` distinct indices from `[0, upper)`, sorted ascending.
///
/// # Panics
///
/// Panics if `count > upper`.
pub fn distinct_indices<R: Rng + ?Sized>(rng: &mut R, count: usize, upper: usize) -> Vec<usize> {
    assert!(
        count <= upper,
        "cannot draw {count} distinct indices from {upper}"
    );
    let mut picked = index::sample(rng, upper, count).into_vec();
    picked.sort_unstable();
    picked
}

/// Independent generator for one task of a seeded run.
///
/// The stream index is scrambled with a splitmix64 finalizer so neighbouring indices do not give
/// correlated seeds.
pub fn task_rng(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ splitmix64(stream))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
