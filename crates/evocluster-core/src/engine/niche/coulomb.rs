use super::{Niche, NicheComputer};
use crate::core::models::geometry::Geometry;
use itertools::Itertools;
use nalgebra::DMatrix;

/// Buckets geometries by the shape of their neutral Coulomb-matrix spectrum.
///
/// The matrix holds `1/r` between molecule centers of mass. Its ascending eigenvalues are turned
/// into relative gaps `(e[i+1] - e[i]) / (e[i] - baseline)` with `baseline = e0 - 0.1·|e0|`, and
/// the key lists the last `number` gaps, largest index first, each divided by `width` and
/// rounded.
#[derive(Debug, Clone, Copy)]
pub struct CoulombMatrixNicher {
    width: f64,
    number: usize,
}

impl CoulombMatrixNicher {
    pub fn new(width: f64, number: usize) -> Self {
        Self { width, number }
    }

    fn relative_gaps(geometry: &Geometry) -> Vec<f64> {
        let cartes = geometry.cartesians();
        let n = cartes.molecule_count();
        if n < 2 {
            return Vec::new();
        }
        let coms: Vec<_> = (0..n)
            .map(|m| cartes.molecule_center_of_mass(m).unwrap_or_default())
            .collect();
        let matrix = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                return 0.0;
            }
            let dist = (coms[i] - coms[j]).norm();
            if dist == 0.0 { 0.0 } else { 1.0 / dist }
        });
        let mut eigenvalues: Vec<f64> = matrix.symmetric_eigenvalues().iter().copied().collect();
        eigenvalues.sort_by(f64::total_cmp);

        let baseline = eigenvalues[0] - 0.1 * eigenvalues[0].abs();
        eigenvalues
            .windows(2)
            .map(|w| (w[1] - w[0]) / (w[0] - baseline))
            .collect()
    }
}

impl NicheComputer for CoulombMatrixNicher {
    fn compute_niche(&self, geometry: &Geometry) -> Niche {
        let gaps = Self::relative_gaps(geometry);
        let suffix = gaps
            .iter()
            .rev()
            .take(self.number)
            .map(|g| format!("{}", (g / self.width).round() as i64))
            .join("-");
        Niche::new(format!("cmat-{suffix}"))
    }
}
