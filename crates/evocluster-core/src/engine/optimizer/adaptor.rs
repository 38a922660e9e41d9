use super::LocalOptimizer;
use crate::core::models::geometry::Geometry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

pub trait FitnessFunction: Send + Sync {
    /// Assigns a fitness to `geometry`. With `force_single_evaluation` the coordinates are scored
    /// as they are; otherwise they are locally optimized first.
    fn fitness(&self, geometry: Geometry, force_single_evaluation: bool) -> Geometry;
}

pub struct FitnessAdaptor {
    optimizer: Arc<dyn LocalOptimizer>,
    evaluations: AtomicU64,
    optimizations: AtomicU64,
}

impl FitnessAdaptor {
    pub fn new(optimizer: Arc<dyn LocalOptimizer>) -> Self {
        Self {
            optimizer,
            evaluations: AtomicU64::new(0),
            optimizations: AtomicU64::new(0),
        }
    }

    pub fn optimizer(&self) -> &Arc<dyn LocalOptimizer> {
        &self.optimizer
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn optimizations(&self) -> u64 {
        self.optimizations.load(Ordering::Relaxed)
    }
}

impl FitnessFunction for FitnessAdaptor {
    fn fitness(&self, mut geometry: Geometry, force_single_evaluation: bool) -> Geometry {
        if force_single_evaluation {
            let (cartes, bonds) = geometry.full_cartesians();
            let energy = self.optimizer.backend().energy(&cartes, &bonds);
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            trace!(id = geometry.id, energy, "Single-point evaluation.");
            geometry.fitness = Some(energy);
            geometry
        } else {
            self.optimizations.fetch_add(1, Ordering::Relaxed);
            self.optimizer.optimize_geometry(geometry)
        }
    }
}
