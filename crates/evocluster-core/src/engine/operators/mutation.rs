use super::{Mutation, OperatorError};
use crate::core::models::geometry::Geometry;
use crate::core::utils::random::random_displacement;
use rand::{Rng, RngCore};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MonteCarloMode {
    SingleAtom = 0,
    #[default]
    AllAtoms = 1,
    /// Each atom moves with probability equal to one target drawn per mutation.
    PartialSubset = 2,
}

impl TryFrom<u8> for MonteCarloMode {
    type Error = OperatorError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::SingleAtom),
            1 => Ok(Self::AllAtoms),
            2 => Ok(Self::PartialSubset),
            other => Err(OperatorError::InvalidMode(other)),
        }
    }
}

impl fmt::Display for MonteCarloMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleAtom => "single-atom",
            Self::AllAtoms => "all-atoms",
            Self::PartialSubset => "partial-subset",
        })
    }
}

/// Random atom displacements inside one non-constricted molecule.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloMutation {
    mode: MonteCarloMode,
    max_move: f64,
}

impl MonteCarloMutation {
    pub fn new(mode: MonteCarloMode, max_move: f64) -> Result<Self, OperatorError> {
        if !(max_move.is_finite() && max_move > 0.0) {
            return Err(OperatorError::InvalidMaxMove(max_move));
        }
        Ok(Self { mode, max_move })
    }

    pub fn mode(&self) -> MonteCarloMode {
        self.mode
    }
}

impl Mutation for MonteCarloMutation {
    fn mutate(&self, parent: &Geometry, rng: &mut dyn RngCore) -> Geometry {
        let mut child = parent.clone();
        let movable: Vec<usize> = (0..child.molecule_count())
            .filter(|&m| !child.molecules[m].constricted)
            .collect();
        if movable.is_empty() {
            debug!(id = parent.id, "No movable molecule; Monte-Carlo mutation is a no-op.");
            return child;
        }
        let which = movable[rng.gen_range(0..movable.len())];
        let molecule = &mut child.molecules[which];
        let mut positions = molecule.world_positions();

        match self.mode {
            MonteCarloMode::SingleAtom => {
                let atom = rng.gen_range(0..positions.len());
                positions[atom] += random_displacement(rng, self.max_move);
            }
            MonteCarloMode::AllAtoms => {
                for p in &mut positions {
                    *p += random_displacement(rng, self.max_move);
                }
            }
            MonteCarloMode::PartialSubset => {
                let target: f64 = rng.r#gen();
                for p in &mut positions {
                    if target > rng.r#gen::<f64>() {
                        *p += random_displacement(rng, self.max_move);
                    }
                }
            }
        }
        molecule.adopt_positions(&positions);
        child.fitness = None;
        child
    }

    fn name(&self) -> &'static str {
        "monte-carlo"
    }
}
