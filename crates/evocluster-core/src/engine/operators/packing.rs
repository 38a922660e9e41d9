use super::init::fresh_copy;
use super::{Initializer, Mutation};
use crate::core::models::geometry::Geometry;
use crate::core::utils::random::random_eulers;
use crate::engine::validation::GeometryValidator;
use nalgebra::{Point3, Vector3};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

const FAILURES_PER_INFLATION: usize = 500;
const FAILURES_PER_RESET: usize = 10_000;
const MAX_RESETS: usize = 5;
const INFLATION_STEP: f64 = 3.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackingOrder {
    /// Molecules in the order they appear in the geometry.
    #[default]
    Ascending,
    Random,
    /// Largest molecules first.
    BySize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensionality {
    /// All centers of mass stay at `z = 0`.
    Planar,
    #[default]
    Volumetric,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid packing order: '{0}'")]
pub struct ParsePackingOrderError(String);

impl FromStr for PackingOrder {
    type Err = ParsePackingOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ascending" => Ok(Self::Ascending),
            "random" => Ok(Self::Random),
            "by-size" | "bysize" => Ok(Self::BySize),
            _ => Err(ParsePackingOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for PackingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "ascending",
            Self::Random => "random",
            Self::BySize => "by-size",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackingConfig {
    pub order: PackingOrder,
    pub dimensionality: Dimensionality,
    /// Half-extent of the box each new center of mass is drawn from, in Å.
    pub cell: Vector3<f64>,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            order: PackingOrder::default(),
            dimensionality: Dimensionality::default(),
            cell: Vector3::new(10.0, 10.0, 10.0),
        }
    }
}

/// Rebuilds a cluster by adding molecules one at a time around the already placed ones.
///
/// Serves both as initializer and as a (very disruptive) mutation.
pub struct PackingInitializer {
    config: PackingConfig,
    validator: GeometryValidator,
    emergency_cap: usize,
}

impl PackingInitializer {
    pub fn new(config: PackingConfig, validator: GeometryValidator, emergency_cap: usize) -> Self {
        Self {
            config,
            validator,
            emergency_cap: emergency_cap.max(1),
        }
    }

    fn placement_order(&self, geometry: &Geometry, rng: &mut dyn RngCore) -> Vec<usize> {
        let mut order: Vec<usize> = (0..geometry.molecule_count()).collect();
        match self.config.order {
            PackingOrder::Ascending => {}
            PackingOrder::Random => order.shuffle(rng),
            PackingOrder::BySize => {
                order.sort_by_key(|&m| std::cmp::Reverse(geometry.molecules[m].atom_count()))
            }
        }
        order
    }

    /// Per-dimension extent large enough for the molecules placed so far.
    fn recompute_cell(&self, geometry: &Geometry, placed: &[usize]) -> Vector3<f64> {
        let span: f64 = placed
            .iter()
            .map(|&m| 2.0 * geometry.molecules[m].extent() + 2.0)
            .sum();
        let mut cell = self.config.cell.map(|c| c.max(span));
        if self.config.dimensionality == Dimensionality::Planar {
            cell.z = 0.0;
        }
        cell
    }

    /// Checks the molecules in `placed`, whose last entry is the one just moved.
    ///
    /// With `prefix_clean` the earlier molecules are known to be collision-free among
    /// themselves, so only pairs touching the new molecule's atoms are scanned.
    fn partial_is_sane(&self, geometry: &Geometry, placed: &[usize], prefix_clean: bool) -> bool {
        let (subset, atom_map) = geometry.cartesians().select_molecules(placed);
        let bonds = geometry.bonds().subset(&atom_map);
        if !prefix_clean {
            return self.validator.is_sane(&subset, &bonds);
        }
        let endset = subset.atom_count();
        let offset = endset - subset.atoms_per_molecule.last().copied().unwrap_or(0);
        self.validator
            .is_sane_after_move(&subset, &bonds, offset, endset)
    }

    fn subset_has_collision(&self, geometry: &Geometry, molecules: &[usize]) -> bool {
        let (subset, atom_map) = geometry.cartesians().select_molecules(molecules);
        let bonds = geometry.bonds().subset(&atom_map);
        self.validator
            .detector()
            .has_collision(&subset, self.validator.collision_blow(), &bonds)
    }

    fn pack(&self, geometry: &mut Geometry, rng: &mut dyn RngCore) {
        let order = self.placement_order(geometry, rng);
        let planar = self.config.dimensionality == Dimensionality::Planar;
        let mut cell = self.config.cell;
        if planar {
            cell.z = 0.0;
        }

        let mut placed: Vec<usize> = geometry
            .molecules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.constricted)
            .map(|(i, _)| i)
            .collect();

        let mut prefix_clean = !self.subset_has_collision(geometry, &placed);

        let movable: Vec<usize> = order
            .into_iter()
            .filter(|&m| !geometry.molecules[m].constricted)
            .collect();
        for m in movable {
            if placed.is_empty() {
                geometry.molecules[m].position = Point3::origin();
                geometry.molecules[m].orientation = random_eulers(rng);
                placed.push(m);
                continue;
            }
            placed.push(m);

            let mut failures = 0;
            let mut resets = 0;
            loop {
                let mut position = Point3::new(
                    rng.gen_range(-1.0..=1.0) * cell.x,
                    rng.gen_range(-1.0..=1.0) * cell.y,
                    rng.gen_range(-1.0..=1.0) * cell.z,
                );
                if planar {
                    position.z = 0.0;
                }
                geometry.molecules[m].position = position;
                geometry.molecules[m].orientation = random_eulers(rng);
                if self.partial_is_sane(geometry, &placed, prefix_clean) {
                    break;
                }

                failures += 1;
                if failures % FAILURES_PER_INFLATION == 0 {
                    cell.x += rng.r#gen::<f64>() * INFLATION_STEP;
                    cell.y += rng.r#gen::<f64>() * INFLATION_STEP;
                    if !planar {
                        cell.z += rng.r#gen::<f64>() * INFLATION_STEP;
                    }
                }
                if failures >= FAILURES_PER_RESET {
                    resets += 1;
                    if resets >= MAX_RESETS {
                        warn!(
                            id = geometry.id,
                            molecule = m,
                            "Packing failed repeatedly; keeping molecule at its last position."
                        );
                        prefix_clean = !self.subset_has_collision(geometry, &placed);
                        break;
                    }
                    cell = self.recompute_cell(geometry, &placed);
                    failures = 0;
                    debug!(molecule = m, resets, ?cell, "Packing cell recomputed.");
                }
            }
        }

        let cluster = geometry.cartesians();
        if let Some(env) = geometry.environment.as_mut() {
            env.initialize_connections(&cluster, self.validator.detector(), self.emergency_cap, rng);
        }
    }
}

impl Initializer for PackingInitializer {
    fn initialize(&self, template: &Geometry, id: u64, rng: &mut dyn RngCore) -> Geometry {
        let mut geometry = fresh_copy(template, id);
        self.pack(&mut geometry, rng);
        geometry
    }
}

impl Mutation for PackingInitializer {
    fn mutate(&self, parent: &Geometry, rng: &mut dyn RngCore) -> Geometry {
        let mut child = parent.clone();
        child.fitness = None;
        self.pack(&mut child, rng);
        child
    }

    fn name(&self) -> &'static str {
        "packing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collision::dissociation::{DissociationCriterion, DissociationDetector};
    use crate::testing::{argon_line, water_cluster};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn validator() -> GeometryValidator {
        GeometryValidator::new(
            1.2,
            Some(DissociationDetector::new(DissociationCriterion::Connectivity, 3.0)),
        )
    }

    fn packer(order: PackingOrder, dimensionality: Dimensionality) -> PackingInitializer {
        let config = PackingConfig {
            order,
            dimensionality,
            cell: Vector3::new(5.0, 5.0, 5.0),
        };
        PackingInitializer::new(config, validator(), 1000)
    }

    #[test]
    fn packed_cluster_is_sane_and_starts_at_origin() {
        let template = argon_line(6, 4.0);
        let mut rng = StdRng::seed_from_u64(13);
        let g = packer(PackingOrder::Ascending, Dimensionality::Volumetric).initialize(
            &template, 3, &mut rng,
        );
        assert!(validator().is_valid(&g));
        assert_eq!(g.molecules[0].position, Point3::origin());
        assert_eq!(g.id, 3);
    }

    #[test]
    fn planar_packing_stays_in_plane() {
        let template = water_cluster(&[
            Point3::origin(),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(9.0, 0.0, 0.0),
        ]);
        let mut rng = StdRng::seed_from_u64(29);
        let g = packer(PackingOrder::Random, Dimensionality::Planar).initialize(&template, 0, &mut rng);
        assert!(g.molecules.iter().all(|m| m.position.z == 0.0));
        assert!(validator().is_cluster_sane(&g));
    }

    #[test]
    fn mutation_keeps_identity_and_resets_fitness() {
        let mut parent = argon_line(4, 4.0);
        parent.id = 12;
        parent.mother = Some(3);
        parent.fitness = Some(-4.0);
        let mut rng = StdRng::seed_from_u64(5);
        let child = packer(PackingOrder::BySize, Dimensionality::Volumetric).mutate(&parent, &mut rng);
        assert_eq!((child.id, child.mother, child.fitness), (12, Some(3), None));
        assert_eq!(parent.fitness, Some(-4.0));
    }

    #[test]
    fn by_size_places_largest_first() {
        let mut template = water_cluster(&[Point3::origin(), Point3::new(3.0, 0.0, 0.0)]);
        template.molecules.insert(0, crate::testing::argon_atom());
        let template = Geometry::with_perceived_bonds(0, template.molecules, None, 1.2).unwrap();
        let p = packer(PackingOrder::BySize, Dimensionality::Volumetric);
        let order = p.placement_order(&template, &mut StdRng::seed_from_u64(0));
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn range_check_agrees_with_full_check() {
        let p = packer(PackingOrder::Ascending, Dimensionality::Volumetric);
        let mut rng = StdRng::seed_from_u64(41);
        let mut geometry = argon_line(5, 4.0);
        let placed = [0, 1, 2, 3, 4];
        let mut accepted = 0;
        for _ in 0..200 {
            for m in &mut geometry.molecules[1..] {
                m.position = Point3::new(
                    rng.gen_range(-5.0..=5.0),
                    rng.gen_range(-5.0..=5.0),
                    rng.gen_range(-5.0..=5.0),
                );
            }
            // only the last molecule is new; the prefix must be clean for the range path
            let prefix_clean = !p.subset_has_collision(&geometry, &placed[..4]);
            let full = p.partial_is_sane(&geometry, &placed, false);
            if prefix_clean {
                assert_eq!(p.partial_is_sane(&geometry, &placed, true), full);
            }
            accepted += usize::from(full);
        }
        assert!(accepted > 0);
    }

    #[test]
    fn colliding_constricted_molecules_fall_back_to_full_check() {
        let mut template = argon_line(3, 4.0);
        template.molecules[0].constricted = true;
        template.molecules[1].constricted = true;
        template.molecules[1].position = Point3::new(0.5, 0.0, 0.0);
        let p = packer(PackingOrder::Ascending, Dimensionality::Volumetric);
        assert!(p.subset_has_collision(&template, &[0, 1]));
        assert!(!p.partial_is_sane(&template, &[0, 1, 2], false));
    }

    #[test]
    fn packing_order_parses() {
        assert_eq!("by-size".parse::<PackingOrder>().unwrap(), PackingOrder::BySize);
        assert!("spiral".parse::<PackingOrder>().is_err());
    }
}
