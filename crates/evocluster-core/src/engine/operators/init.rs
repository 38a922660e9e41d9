use super::{Initializer, OperatorError};
use crate::core::models::geometry::Geometry;
use crate::core::space::AllowedSpace;
use crate::core::utils::random::random_eulers;
use crate::engine::validation::GeometryValidator;
use rand::RngCore;
use std::sync::{Arc, OnceLock};
use tracing::{trace, warn};

/// Scatters molecule centers of mass over an allowed region with random orientations.
///
/// Placements are redrawn until the cluster passes the collision and dissociation checks or the
/// emergency cap is hit. Constricted molecules keep their template placement.
pub struct RandomInitializer {
    space: AllowedSpace,
    validator: GeometryValidator,
    cap: usize,
}

impl RandomInitializer {
    pub fn new(space: AllowedSpace, validator: GeometryValidator, cap: usize) -> Self {
        Self {
            space,
            validator,
            cap: cap.max(1),
        }
    }
}

impl Initializer for RandomInitializer {
    fn initialize(&self, template: &Geometry, id: u64, rng: &mut dyn RngCore) -> Geometry {
        let mut geometry = fresh_copy(template, id);
        let mut sane = false;
        for attempt in 1..=self.cap {
            for molecule in geometry.molecules.iter_mut().filter(|m| !m.constricted) {
                molecule.position = self.space.sample(rng);
                molecule.orientation = random_eulers(rng);
            }
            if self.validator.is_cluster_sane(&geometry) {
                trace!(id, attempt, "Random placement accepted.");
                sane = true;
                break;
            }
        }
        if !sane {
            warn!(
                id,
                cap = self.cap,
                "Emergency cap reached during random initialization; keeping last placement."
            );
        }

        let cluster = geometry.cartesians();
        if let Some(env) = geometry.environment.as_mut() {
            env.initialize_connections(&cluster, self.validator.detector(), self.cap, rng);
        }
        geometry
    }
}

/// Copy of `template` with a new id and neither lineage nor fitness.
pub(crate) fn fresh_copy(template: &Geometry, id: u64) -> Geometry {
    let mut geometry = template.clone();
    geometry.id = id;
    geometry.mother = None;
    geometry.father = None;
    geometry.fitness = None;
    geometry
}

/// An initializer slot that is filled after construction.
///
/// Operators that fall back to a fresh random geometry hold an `Arc` of this slot; the slot is
/// bound once the real initializer exists and is only read when an initialization is needed.
#[derive(Default)]
pub struct DeferredInitializer {
    slot: OnceLock<Arc<dyn Initializer>>,
}

impl DeferredInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, initializer: Arc<dyn Initializer>) -> Result<(), OperatorError> {
        self.slot
            .set(initializer)
            .map_err(|_| OperatorError::AlreadyBound)
    }

    pub fn get(&self) -> Option<&Arc<dyn Initializer>> {
        self.slot.get()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl Initializer for DeferredInitializer {
    fn initialize(&self, template: &Geometry, id: u64, rng: &mut dyn RngCore) -> Geometry {
        match self.slot.get() {
            Some(initializer) => initializer.initialize(template, id, rng),
            None => {
                warn!(id, "Deferred initializer used before binding; returning template copy.");
                fresh_copy(template, id)
            }
        }
    }
}
