//! # Operators Module
//!
//! Genome operators that turn one or two parent geometries into new candidates.
//!
//! ## Key Components
//!
//! - [`Crossover`]: recombines two parents into two children
//!   ([`crossover::OrientationCrossover`], [`crossover::MoleculeCrossover`]).
//! - [`Mutation`]: perturbs one geometry ([`mutation::MonteCarloMutation`],
//!   [`packing::PackingInitializer`], [`heat::LocalHeatMutation`]).
//! - [`Initializer`]: builds a fresh geometry from a template ([`init::RandomInitializer`],
//!   [`packing::PackingInitializer`]).
//! - [`init::DeferredInitializer`]: a late-bound initializer slot, so operators that need a
//!   fallback initializer can be built before it exists.
//!
//! Parents are always taken by reference. Every operator works on clones and never aliases
//! parent state.
//!
//! ## Usage
//!
//! ```ignore
//! let crossover = OrientationCrossover::new(1);
//! let (child1, child2) = crossover.crossover(&mother, &father, next_id, &mut rng)?;
//! let mutated = MonteCarloMutation::new(MonteCarloMode::AllAtoms, 0.5)?.mutate(&child1, &mut rng);
//! ```

pub mod crossover;
pub mod heat;
pub mod init;
pub mod mutation;
pub mod packing;

use crate::core::models::geometry::Geometry;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CrossoverError {
    #[error("Cannot place {cuts} cuts in a geometry of {molecules} molecules")]
    TooManyCuts { cuts: usize, molecules: usize },
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum OperatorError {
    #[error("Maximum move must be positive and finite, got {0}")]
    InvalidMaxMove(f64),
    #[error("Unknown Monte-Carlo mode {0}; expected 0, 1 or 2")]
    InvalidMode(u8),
    #[error("Deferred initializer was already bound")]
    AlreadyBound,
}

pub trait Crossover: Send + Sync {
    /// Produces two children carrying `future_id` and the parents' ids as lineage.
    fn crossover(
        &self,
        mother: &Geometry,
        father: &Geometry,
        future_id: u64,
        rng: &mut dyn RngCore,
    ) -> Result<(Geometry, Geometry), CrossoverError>;

    fn name(&self) -> &'static str;
}

pub trait Mutation: Send + Sync {
    /// Returns a mutated copy. The parent is left untouched.
    fn mutate(&self, parent: &Geometry, rng: &mut dyn RngCore) -> Geometry;

    fn name(&self) -> &'static str;

    /// Whether mutated children come back locally optimized with their fitness set.
    fn returns_optimized(&self) -> bool {
        false
    }
}

pub trait Initializer: Send + Sync {
    /// Builds a new placement of the template's molecules. The result carries `id`, no lineage
    /// and no fitness.
    fn initialize(&self, template: &Geometry, id: u64, rng: &mut dyn RngCore) -> Geometry;
}
