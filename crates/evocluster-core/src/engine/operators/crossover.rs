use super::{Crossover, CrossoverError};
use crate::core::models::geometry::Geometry;
use crate::core::models::molecule::MoleculeConfig;
use crate::core::utils::random::distinct_indices;
use rand::RngCore;
use tracing::trace;

/// N-point crossover that exchanges Euler angles between the parents' molecules.
#[derive(Debug, Clone, Copy)]
pub struct OrientationCrossover {
    cuts: usize,
}

impl OrientationCrossover {
    pub fn new(cuts: usize) -> Self {
        Self { cuts }
    }
}

impl Crossover for OrientationCrossover {
    fn crossover(
        &self,
        mother: &Geometry,
        father: &Geometry,
        future_id: u64,
        rng: &mut dyn RngCore,
    ) -> Result<(Geometry, Geometry), CrossoverError> {
        n_point(mother, father, self.cuts, future_id, rng, swap_orientations)
    }

    fn name(&self) -> &'static str {
        "orientation"
    }
}

/// N-point crossover that exchanges whole molecule placements.
///
/// Position and orientation are always swapped. Reference shapes are swapped only between
/// molecules of the same species, so each child keeps the atom layout its bond table describes.
#[derive(Debug, Clone, Copy)]
pub struct MoleculeCrossover {
    cuts: usize,
}

impl MoleculeCrossover {
    pub fn new(cuts: usize) -> Self {
        Self { cuts }
    }
}

impl Crossover for MoleculeCrossover {
    fn crossover(
        &self,
        mother: &Geometry,
        father: &Geometry,
        future_id: u64,
        rng: &mut dyn RngCore,
    ) -> Result<(Geometry, Geometry), CrossoverError> {
        n_point(mother, father, self.cuts, future_id, rng, |a, b| {
            std::mem::swap(&mut a.position, &mut b.position);
            std::mem::swap(&mut a.orientation, &mut b.orientation);
            if a.species == b.species && a.atom_count() == b.atom_count() {
                std::mem::swap(&mut a.reference, &mut b.reference);
            }
        })
    }

    fn name(&self) -> &'static str {
        "molecule"
    }
}

fn n_point(
    mother: &Geometry,
    father: &Geometry,
    cuts: usize,
    future_id: u64,
    rng: &mut dyn RngCore,
    exchange: impl Fn(&mut MoleculeConfig, &mut MoleculeConfig),
) -> Result<(Geometry, Geometry), CrossoverError> {
    let molecules = mother.molecule_count().min(father.molecule_count());
    if cuts >= molecules {
        return Err(CrossoverError::TooManyCuts { cuts, molecules });
    }
    let cut_points = distinct_indices(rng, cuts, molecules);
    let mut child1 = mother.clone();
    let mut child2 = father.clone();
    recombine(&mut child1, &mut child2, &cut_points, exchange);

    if let (Some(env_m), Some(env_f)) = (&mother.environment, &father.environment) {
        let (env1, env2) = env_m.crossover(env_f, rng);
        child1.environment = Some(env1);
        child2.environment = Some(env2);
    }

    child1.rebirth(future_id, mother.id, father.id);
    child2.rebirth(future_id, mother.id, father.id);
    trace!(future_id, ?cut_points, "Crossover done.");
    Ok((child1, child2))
}

/// Walks the molecules, toggling the swap flag at each cut point and exchanging while it is set.
fn recombine(
    child1: &mut Geometry,
    child2: &mut Geometry,
    cut_points: &[usize],
    exchange: impl Fn(&mut MoleculeConfig, &mut MoleculeConfig),
) {
    let mut swap = false;
    for (i, (a, b)) in child1
        .molecules
        .iter_mut()
        .zip(child2.molecules.iter_mut())
        .enumerate()
    {
        if cut_points.binary_search(&i).is_ok() {
            swap = !swap;
        }
        if swap {
            exchange(a, b);
        }
    }
}

fn swap_orientations(a: &mut MoleculeConfig, b: &mut MoleculeConfig) {
    std::mem::swap(&mut a.orientation, &mut b.orientation);
}
