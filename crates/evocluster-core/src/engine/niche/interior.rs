use super::{Niche, NicheComputer, SurfaceDetector};
use crate::core::models::geometry::Geometry;
use std::collections::BTreeSet;

/// Counts molecules that the surface detector does not report.
pub struct InteriorCountNicher<S: SurfaceDetector> {
    detector: S,
}

impl<S: SurfaceDetector> InteriorCountNicher<S> {
    pub fn new(detector: S) -> Self {
        Self { detector }
    }
}

impl<S: SurfaceDetector> NicheComputer for InteriorCountNicher<S> {
    fn compute_niche(&self, geometry: &Geometry) -> Niche {
        let surface = self.detector.detect_surface(geometry);
        let interior = (0..geometry.molecule_count())
            .filter(|m| !surface.contains(m))
            .count();
        Niche::new(format!("interior-{interior}"))
    }
}

/// A molecule is on the surface when its center of mass lies at least
/// `fraction · max_distance` away from the cluster's center of mass.
#[derive(Debug, Clone, Copy)]
pub struct DistanceSurfaceDetector {
    fraction: f64,
}

impl DistanceSurfaceDetector {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

impl SurfaceDetector for DistanceSurfaceDetector {
    fn detect_surface(&self, geometry: &Geometry) -> BTreeSet<usize> {
        let cartes = geometry.cartesians();
        let Some(center) = cartes.center_of_mass() else {
            return BTreeSet::new();
        };
        let distances: Vec<f64> = (0..cartes.molecule_count())
            .map(|m| {
                cartes
                    .molecule_center_of_mass(m)
                    .map_or(0.0, |com| (com - center).norm())
            })
            .collect();
        let max = distances.iter().copied().fold(0.0, f64::max);
        if max <= f64::EPSILON {
            return BTreeSet::new();
        }
        distances
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d >= self.fraction * max)
            .map(|(m, _)| m)
            .collect()
    }
}
