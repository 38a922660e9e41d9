use super::element::Element;
use crate::core::utils::geometry::center_of_mass;
use nalgebra::{Point3, Vector3};
use std::ops::Range;

/// Flattened coordinate set exchanged with detectors, optimizers and energy backends.
#[derive(Debug, Clone, PartialEq)]
pub struct Cartesians {
    pub positions: Vec<Point3<f64>>,
    pub elements: Vec<&'static Element>,
    pub atoms_per_molecule: Vec<usize>,
    pub charges: Vec<f64>,
    pub spins: Vec<i32>,
}

impl Cartesians {
    /// A single-molecule coordinate set with zero charges and spins.
    pub fn single_molecule(elements: Vec<&'static Element>, positions: Vec<Point3<f64>>) -> Self {
        assert_eq!(elements.len(), positions.len());
        let n = elements.len();
        Self {
            positions,
            elements,
            atoms_per_molecule: vec![n],
            charges: vec![0.0; n],
            spins: vec![0; n],
        }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn molecule_count(&self) -> usize {
        self.atoms_per_molecule.len()
    }

    #[inline]
    pub fn radius(&self, atom: usize) -> f64 {
        self.elements[atom].covalent_radius
    }

    pub fn masses(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.mass).collect()
    }

    /// Atom index range covered by molecule `molecule`.
    pub fn molecule_range(&self, molecule: usize) -> Range<usize> {
        let start: usize = self.atoms_per_molecule[..molecule].iter().sum();
        start..start + self.atoms_per_molecule[molecule]
    }

    pub fn molecule_of_atom(&self) -> Vec<usize> {
        self.atoms_per_molecule
            .iter()
            .enumerate()
            .flat_map(|(mol, &n)| std::iter::repeat_n(mol, n))
            .collect()
    }

    pub fn center_of_mass(&self) -> Option<Point3<f64>> {
        center_of_mass(&self.positions, &self.masses())
    }

    pub fn molecule_center_of_mass(&self, molecule: usize) -> Option<Point3<f64>> {
        let range = self.molecule_range(molecule);
        let masses: Vec<f64> = self.elements[range.clone()].iter().map(|e| e.mass).collect();
        center_of_mass(&self.positions[range], &masses)
    }

    pub fn translate(&mut self, shift: &Vector3<f64>) {
        for p in &mut self.positions {
            *p += shift;
        }
    }

    /// Moves the set so that its center of mass sits at the origin.
    pub fn move_to_center_of_mass(&mut self) {
        if let Some(com) = self.center_of_mass() {
            self.translate(&-com.coords);
        }
    }

    /// Appends `other` as additional molecules.
    pub fn append(&mut self, other: &Cartesians) {
        self.positions.extend_from_slice(&other.positions);
        self.elements.extend_from_slice(&other.elements);
        self.atoms_per_molecule
            .extend_from_slice(&other.atoms_per_molecule);
        self.charges.extend_from_slice(&other.charges);
        self.spins.extend_from_slice(&other.spins);
    }

    /// Copies the listed molecules, in order, into a new set.
    pub fn select_molecules(&self, molecules: &[usize]) -> (Cartesians, Vec<usize>) {
        let mut selected = Cartesians {
            positions: Vec::new(),
            elements: Vec::new(),
            atoms_per_molecule: Vec::with_capacity(molecules.len()),
            charges: Vec::new(),
            spins: Vec::new(),
        };
        let mut atom_map = Vec::new();
        for &mol in molecules {
            let range = self.molecule_range(mol);
            selected.atoms_per_molecule.push(range.len());
            selected
                .positions
                .extend_from_slice(&self.positions[range.clone()]);
            selected
                .elements
                .extend_from_slice(&self.elements[range.clone()]);
            selected
                .charges
                .extend_from_slice(&self.charges[range.clone()]);
            selected.spins.extend_from_slice(&self.spins[range.clone()]);
            atom_map.extend(range);
        }
        (selected, atom_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argon_dimer() -> Cartesians {
        let ar = Element::from_symbol("Ar").unwrap();
        Cartesians {
            positions: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)],
            elements: vec![ar, ar],
            atoms_per_molecule: vec![1, 1],
            charges: vec![0.0; 2],
            spins: vec![0; 2],
        }
    }

    #[test]
    fn molecule_range_uses_preceding_counts() {
        let mut c = argon_dimer();
        c.atoms_per_molecule = vec![1, 1];
        assert_eq!(c.molecule_range(1), 1..2);
        assert_eq!(c.molecule_of_atom(), vec![0, 1]);
    }

    #[test]
    fn move_to_center_of_mass_centers_the_set() {
        let mut c = argon_dimer();
        c.move_to_center_of_mass();
        let com = c.center_of_mass().unwrap();
        assert!(com.coords.norm() < 1e-12);
        assert!((c.positions[0].x + 2.0).abs() < 1e-12);
    }

    #[test]
    fn append_extends_every_column() {
        let mut c = argon_dimer();
        let other = argon_dimer();
        c.append(&other);
        assert_eq!(c.atom_count(), 4);
        assert_eq!(c.molecule_count(), 4);
        assert_eq!(c.charges.len(), 4);
    }

    #[test]
    fn select_molecules_preserves_requested_order() {
        let c = argon_dimer();
        let (selected, map) = c.select_molecules(&[1, 0]);
        assert_eq!(map, vec![1, 0]);
        assert_eq!(selected.positions[0], Point3::new(4.0, 0.0, 0.0));
    }
}
