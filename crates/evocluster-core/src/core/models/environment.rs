use super::bonds::{BondInfo, BondType};
use super::cartesians::Cartesians;
use super::error::ModelError;
use crate::core::collision::detection::CollisionDetector;
use crate::core::space::AllowedSpace;
use crate::core::utils::geometry::euler_rotation;
use crate::core::utils::random::random_eulers;
use nalgebra::{Point3, Vector3};
use rand::{Rng, RngCore};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of genes in an environment genome: three offset components and three Euler angles.
pub const GENOME_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// The cluster is placed by offset and rotated by its own Euler angles.
    #[default]
    FullExternal,
    /// The cluster is only translated; the orientation genes stay zero.
    LayerOnly,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid environment fit mode: '{0}'")]
pub struct ParseFitModeError(String);

impl FromStr for FitMode {
    type Err = ParseFitModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full-external" | "fullexternal" => Ok(Self::FullExternal),
            "layer-only" | "layeronly" => Ok(Self::LayerOnly),
            _ => Err(ParseFitModeError(s.to_string())),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FullExternal => "full-external",
            Self::LayerOnly => "layer-only",
        })
    }
}

/// A fixed or flexible set of atoms the cluster docks onto.
///
/// The cluster's placement relative to the environment is described by a six-gene genome: the
/// offset of the cluster's center of mass from the reference point, followed by the cluster's
/// Euler angles. The offset is constrained to `space`.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    atoms: Cartesians,
    bonds: BondInfo,
    pub flexible: bool,
    reference: Point3<f64>,
    space: AllowedSpace,
    mode: FitMode,
    blow: f64,
    offset: Vector3<f64>,
    eulers: Vector3<f64>,
}

impl Environment {
    pub fn new(
        atoms: Cartesians,
        bonds: BondInfo,
        reference: Point3<f64>,
        space: AllowedSpace,
        mode: FitMode,
        blow: f64,
    ) -> Result<Self, ModelError> {
        if bonds.atom_count() != atoms.atom_count() {
            return Err(ModelError::BondTableSize {
                bonds: bonds.atom_count(),
                atoms: atoms.atom_count(),
            });
        }
        let offset = space.center().coords;
        Ok(Self {
            atoms,
            bonds,
            flexible: false,
            reference,
            space,
            mode,
            blow,
            offset,
            eulers: Vector3::zeros(),
        })
    }

    pub fn atoms(&self) -> &Cartesians {
        &self.atoms
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.atom_count()
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub fn space(&self) -> &AllowedSpace {
        &self.space
    }

    pub fn offset(&self) -> Vector3<f64> {
        self.offset
    }

    pub fn eulers(&self) -> Vector3<f64> {
        self.eulers
    }

    /// Places the cluster relative to the environment and appends the environment atoms.
    ///
    /// The environment forms one trailing molecule in the merged set.
    pub fn merge(&self, cluster: &Cartesians) -> Cartesians {
        let mut merged = cluster.clone();
        merged.move_to_center_of_mass();
        if self.mode != FitMode::LayerOnly {
            let rotation = euler_rotation(&self.eulers);
            for p in &mut merged.positions {
                *p = rotation * *p;
            }
        }
        merged.translate(&(self.reference.coords + self.offset));

        let mut env = self.atoms.clone();
        env.atoms_per_molecule = vec![env.atom_count()];
        merged.append(&env);
        merged
    }

    /// Like [`merge`](Self::merge), also combining the bond tables block-diagonally. No bonds
    /// connect cluster and environment.
    pub fn merge_with_bonds(&self, cluster: &Cartesians, bonds: &BondInfo) -> (Cartesians, BondInfo) {
        (self.merge(cluster), bonds.block_diagonal(&self.bonds))
    }

    /// Recovers the centered cluster from a merged set and updates the genome to match it.
    ///
    /// The orientation genes are reset since the returned coordinates already carry the
    /// rotation. Flexible environments take over their moved atoms.
    pub fn split(&mut self, merged: &Cartesians) -> Cartesians {
        let env_atoms = self.atom_count();
        let cluster_atoms = merged.atom_count() - env_atoms;
        let cluster_molecules = merged.molecule_count() - 1;

        let mut cluster = Cartesians {
            positions: merged.positions[..cluster_atoms].to_vec(),
            elements: merged.elements[..cluster_atoms].to_vec(),
            atoms_per_molecule: merged.atoms_per_molecule[..cluster_molecules].to_vec(),
            charges: merged.charges[..cluster_atoms].to_vec(),
            spins: merged.spins[..cluster_atoms].to_vec(),
        };

        if self.mode != FitMode::LayerOnly {
            self.eulers = Vector3::zeros();
        }
        if let Some(com) = cluster.center_of_mass() {
            self.offset = com - self.reference;
        }
        if self.flexible {
            self.atoms
                .positions
                .copy_from_slice(&merged.positions[cluster_atoms..]);
        }
        cluster.move_to_center_of_mass();
        cluster
    }

    /// Checks that the offset lies in the allowed space and that no cluster atom collides with
    /// the environment. Collisions inside the cluster are not considered here.
    pub fn fits(&self, cluster: &Cartesians, detector: &CollisionDetector) -> bool {
        if !self.space.contains(&Point3::from(self.offset)) {
            return false;
        }
        let merged = self.merge(cluster);
        let bonds = self.cluster_exempt_bonds(cluster.atom_count());
        !detector.has_collision(&merged, self.blow, &bonds)
    }

    /// Draws random placements until the cluster fits or `cap` attempts were made.
    ///
    /// Returns whether a fitting placement was found. The last drawn placement is kept either
    /// way.
    pub fn initialize_connections(
        &mut self,
        cluster: &Cartesians,
        detector: &CollisionDetector,
        cap: usize,
        rng: &mut dyn RngCore,
    ) -> bool {
        let bonds = self.cluster_exempt_bonds(cluster.atom_count());
        for attempt in 1..=cap.max(1) {
            if self.mode != FitMode::LayerOnly {
                self.eulers = random_eulers(rng);
            }
            self.offset = self.space.sample(rng).coords;
            let merged = self.merge(cluster);
            if !detector.has_collision(&merged, self.blow, &bonds) {
                debug!(attempt, "Environment connections initialized.");
                return true;
            }
        }
        warn!(
            cap,
            "Emergency cap reached while docking cluster onto environment; keeping last placement."
        );
        false
    }

    /// Mutates one of the six genes. In layer-only mode only the offset can change.
    pub fn mutate_connections(&mut self, rng: &mut dyn RngCore) {
        if self.mode == FitMode::LayerOnly {
            self.offset = self.space.sample(rng).coords;
            return;
        }
        let gene = rng.gen_range(0..GENOME_LENGTH);
        let sign = if rng.r#gen::<bool>() { -1.0 } else { 1.0 };
        let u: f64 = rng.r#gen();
        match gene {
            0..=2 => self.offset = self.space.sample(rng).coords,
            3 => self.eulers.x = sign * u * PI,
            4 => self.eulers.y = sign * u * FRAC_PI_2,
            _ => self.eulers.z = sign * u * PI,
        }
    }

    /// Single-cut genome crossover. Child one carries the father's head and this environment's
    /// tail; child two the reverse.
    pub fn crossover(&self, father: &Environment, rng: &mut dyn RngCore) -> (Environment, Environment) {
        let cut = rng.gen_range(0..GENOME_LENGTH);
        self.crossover_at(father, cut)
    }

    pub fn crossover_at(&self, father: &Environment, cut: usize) -> (Environment, Environment) {
        let mother_genome = self.genome();
        let father_genome = father.genome();
        let mut genome1 = [0.0; GENOME_LENGTH];
        let mut genome2 = [0.0; GENOME_LENGTH];
        for i in 0..GENOME_LENGTH {
            if i < cut {
                genome1[i] = father_genome[i];
                genome2[i] = mother_genome[i];
            } else {
                genome1[i] = mother_genome[i];
                genome2[i] = father_genome[i];
            }
        }
        let mut child1 = father.clone();
        let mut child2 = self.clone();
        child1.set_genome(&genome1);
        child2.set_genome(&genome2);
        (child1, child2)
    }

    pub fn genome(&self) -> [f64; GENOME_LENGTH] {
        let e = match self.mode {
            FitMode::LayerOnly => Vector3::zeros(),
            FitMode::FullExternal => self.eulers,
        };
        [self.offset.x, self.offset.y, self.offset.z, e.x, e.y, e.z]
    }

    pub fn set_genome(&mut self, genome: &[f64; GENOME_LENGTH]) {
        self.offset = Vector3::new(genome[0], genome[1], genome[2]);
        if self.mode != FitMode::LayerOnly {
            self.eulers = Vector3::new(genome[3], genome[4], genome[5]);
        }
    }

    /// Shifts the cluster offset along one axis.
    pub fn move_cluster(&mut self, axis: usize, distance: f64) {
        assert!(axis < 3, "axis must be 0, 1 or 2");
        self.offset[axis] += distance;
    }

    /// Bond table for fit checks: every intra-cluster pair is marked bonded so only
    /// cluster-environment and intra-environment contacts count.
    fn cluster_exempt_bonds(&self, cluster_atoms: usize) -> BondInfo {
        let mut exempt = BondInfo::dense(cluster_atoms);
        for a in 0..cluster_atoms {
            for b in (a + 1)..cluster_atoms {
                exempt.set_bond(a, b, BondType::Unspecified);
            }
        }
        exempt.block_diagonal(&self.bonds)
    }
}
