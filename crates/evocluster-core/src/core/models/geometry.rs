use super::bonds::BondInfo;
use super::cartesians::Cartesians;
use super::environment::Environment;
use super::error::ModelError;
use super::molecule::MoleculeConfig;
use crate::core::collision::bonds::detect_bonds;

/// One candidate arrangement of molecules, the unit of selection in the search.
///
/// Every field is owned, so `clone()` yields a fully independent duplicate. Operators take
/// parents by reference and always build children from clones.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub id: u64,
    pub mother: Option<u64>,
    pub father: Option<u64>,
    /// `None` until the geometry has been evaluated. Lower is better.
    pub fitness: Option<f64>,
    pub molecules: Vec<MoleculeConfig>,
    pub environment: Option<Environment>,
    bonds: BondInfo,
}

impl Geometry {
    pub fn new(
        id: u64,
        molecules: Vec<MoleculeConfig>,
        bonds: BondInfo,
        environment: Option<Environment>,
    ) -> Result<Self, ModelError> {
        for molecule in &molecules {
            molecule.validate()?;
        }
        let atoms: usize = molecules.iter().map(MoleculeConfig::atom_count).sum();
        if bonds.atom_count() != atoms {
            return Err(ModelError::BondTableSize {
                bonds: bonds.atom_count(),
                atoms,
            });
        }
        Ok(Self {
            id,
            mother: None,
            father: None,
            fitness: None,
            molecules,
            environment,
            bonds,
        })
    }

    /// Builds a geometry whose bond table holds the perceived intramolecular bonds of each
    /// molecule's reference shape.
    pub fn with_perceived_bonds(
        id: u64,
        molecules: Vec<MoleculeConfig>,
        environment: Option<Environment>,
        bond_blow: f64,
    ) -> Result<Self, ModelError> {
        let mut bonds = BondInfo::dense(0);
        for molecule in &molecules {
            bonds = bonds.block_diagonal(&detect_bonds(&molecule.to_cartesians(), bond_blow));
        }
        Self::new(id, molecules, bonds, environment)
    }

    #[inline]
    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    pub fn total_atom_count(&self) -> usize {
        self.molecules.iter().map(MoleculeConfig::atom_count).sum()
    }

    /// Index of each molecule's first atom in the flattened coordinates.
    pub fn molecule_offsets(&self) -> Vec<usize> {
        self.molecules
            .iter()
            .scan(0, |acc, m| {
                let start = *acc;
                *acc += m.atom_count();
                Some(start)
            })
            .collect()
    }

    pub fn bonds(&self) -> &BondInfo {
        &self.bonds
    }

    /// Flattened cluster coordinates, without the environment.
    pub fn cartesians(&self) -> Cartesians {
        let atoms = self.total_atom_count();
        let mut cartes = Cartesians {
            positions: Vec::with_capacity(atoms),
            elements: Vec::with_capacity(atoms),
            atoms_per_molecule: Vec::with_capacity(self.molecule_count()),
            charges: Vec::with_capacity(atoms),
            spins: Vec::with_capacity(atoms),
        };
        for molecule in &self.molecules {
            cartes.append(&molecule.to_cartesians());
        }
        cartes
    }

    /// Cluster coordinates merged with the environment, if there is one.
    pub fn full_cartesians(&self) -> (Cartesians, BondInfo) {
        let cluster = self.cartesians();
        match &self.environment {
            Some(env) => env.merge_with_bonds(&cluster, &self.bonds),
            None => (cluster, self.bonds.clone()),
        }
    }

    /// Per-atom mask that is `true` for atoms of constricted molecules.
    pub fn constraint_mask(&self) -> Vec<bool> {
        self.molecules
            .iter()
            .flat_map(|m| std::iter::repeat_n(m.constricted, m.atom_count()))
            .collect()
    }

    /// Takes over moved cluster coordinates, molecule by molecule.
    ///
    /// # Panics
    ///
    /// Panics if `cartes` does not hold exactly this geometry's cluster atoms.
    pub fn update_from_cartesians(&mut self, cartes: &Cartesians) {
        assert_eq!(
            cartes.atom_count(),
            self.total_atom_count(),
            "coordinate set does not match geometry"
        );
        let offsets = self.molecule_offsets();
        for (molecule, start) in self.molecules.iter_mut().zip(offsets) {
            let end = start + molecule.atom_count();
            molecule.adopt_positions(&cartes.positions[start..end]);
        }
    }

    /// Takes over a merged cluster-plus-environment set, updating the environment genome.
    pub fn update_from_full_cartesians(&mut self, merged: &Cartesians) {
        match self.environment.as_mut() {
            Some(env) => {
                let cluster = env.split(merged);
                self.update_from_cartesians(&cluster);
            }
            None => self.update_from_cartesians(merged),
        }
    }

    /// Turns this clone into a child: new id, new lineage, unevaluated.
    pub fn rebirth(&mut self, id: u64, mother: u64, father: u64) {
        self.id = id;
        self.mother = Some(mother);
        self.father = Some(father);
        self.fitness = None;
    }
}
