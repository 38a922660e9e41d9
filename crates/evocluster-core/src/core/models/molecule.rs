use super::cartesians::Cartesians;
use super::element::Element;
use super::error::ModelError;
use crate::core::utils::geometry::{
    center_of_mass, euler_rotation, eulers_from_rotation, kabsch_rotation,
};
use nalgebra::{Point3, Vector3};
use tracing::warn;

/// One building block of a geometry.
///
/// The atoms are stored as reference coordinates around the molecule's center of mass; the
/// placed atoms are `R(orientation) · reference + position`. Constricted molecules keep their
/// position during global moves; flexible molecules may change shape during local optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeConfig {
    pub species: String,
    pub elements: Vec<&'static Element>,
    pub reference: Vec<Vector3<f64>>,
    pub position: Point3<f64>,
    pub orientation: Vector3<f64>,
    pub flexible: bool,
    pub constricted: bool,
    pub charges: Vec<f64>,
    pub spins: Vec<i32>,
}

impl MoleculeConfig {
    /// Builds a molecule from absolute coordinates, centering the reference frame on the center
    /// of mass and placing the molecule at the origin with zero orientation.
    pub fn from_coordinates(
        species: impl Into<String>,
        elements: Vec<&'static Element>,
        coordinates: &[Point3<f64>],
    ) -> Result<Self, ModelError> {
        let species = species.into();
        if elements.is_empty() {
            return Err(ModelError::EmptyMolecule { species });
        }
        if elements.len() != coordinates.len() {
            return Err(ModelError::AtomCountMismatch {
                species,
                atoms: elements.len(),
                coordinates: coordinates.len(),
            });
        }
        let masses: Vec<f64> = elements.iter().map(|e| e.mass).collect();
        let com = center_of_mass(coordinates, &masses).unwrap_or_else(Point3::origin);
        let reference = coordinates.iter().map(|p| p - com).collect();
        let n = elements.len();
        Ok(Self {
            species,
            elements,
            reference,
            position: Point3::origin(),
            orientation: Vector3::zeros(),
            flexible: false,
            constricted: false,
            charges: vec![0.0; n],
            spins: vec![0; n],
        })
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.elements.len()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.flexible && self.constricted {
            return Err(ModelError::ConstrictedAndFlexible {
                species: self.species.clone(),
            });
        }
        if self.elements.is_empty() {
            return Err(ModelError::EmptyMolecule {
                species: self.species.clone(),
            });
        }
        if self.reference.len() != self.elements.len()
            || self.charges.len() != self.elements.len()
            || self.spins.len() != self.elements.len()
        {
            return Err(ModelError::AtomCountMismatch {
                species: self.species.clone(),
                atoms: self.elements.len(),
                coordinates: self.reference.len(),
            });
        }
        Ok(())
    }

    pub fn world_positions(&self) -> Vec<Point3<f64>> {
        let rotation = euler_rotation(&self.orientation);
        self.reference
            .iter()
            .map(|r| self.position + rotation * r)
            .collect()
    }

    pub fn to_cartesians(&self) -> Cartesians {
        Cartesians {
            positions: self.world_positions(),
            elements: self.elements.clone(),
            atoms_per_molecule: vec![self.atom_count()],
            charges: self.charges.clone(),
            spins: self.spins.clone(),
        }
    }

    /// Largest distance of any atom from the center of mass.
    pub fn extent(&self) -> f64 {
        self.reference.iter().map(|r| r.norm()).fold(0.0, f64::max)
    }

    /// Takes over freshly moved atom positions.
    ///
    /// Flexible molecules adopt the new shape. Rigid molecules keep their shape and are fitted
    /// onto the new positions; if the fit fails the old orientation is kept and only the center
    /// of mass moves.
    pub fn adopt_positions(&mut self, positions: &[Point3<f64>]) {
        assert_eq!(positions.len(), self.atom_count());
        let masses: Vec<f64> = self.elements.iter().map(|e| e.mass).collect();
        let Some(com) = center_of_mass(positions, &masses) else {
            warn!(species = %self.species, "Cannot compute center of mass; keeping molecule unchanged.");
            return;
        };
        let centered: Vec<Vector3<f64>> = positions.iter().map(|p| p - com).collect();
        self.position = com;

        if self.flexible {
            self.reference = centered;
            self.orientation = Vector3::zeros();
            return;
        }

        // a point-like molecule has no orientation to recover
        if self.extent() <= f64::EPSILON {
            return;
        }

        match kabsch_rotation(&self.reference, &centered) {
            Some(rotation) => self.orientation = eulers_from_rotation(&rotation),
            None => warn!(
                species = %self.species,
                "Alignment onto moved atoms failed; keeping previous orientation."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> MoleculeConfig {
        let o = Element::from_symbol("O").unwrap();
        let h = Element::from_symbol("H").unwrap();
        MoleculeConfig::from_coordinates(
            "water",
            vec![o, h, h],
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.757, 0.586, 0.0),
                Point3::new(-0.757, 0.586, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_coordinates_centers_reference_on_center_of_mass() {
        let w = water();
        let masses: Vec<f64> = w.elements.iter().map(|e| e.mass).collect();
        let weighted = w
            .reference
            .iter()
            .zip(&masses)
            .fold(Vector3::zeros(), |acc, (r, m)| acc + r * *m);
        assert!(weighted.norm() < 1e-9);
    }

    #[test]
    fn from_coordinates_rejects_mismatched_lengths() {
        let o = Element::from_symbol("O").unwrap();
        let result = MoleculeConfig::from_coordinates("broken", vec![o, o], &[Point3::origin()]);
        assert!(matches!(
            result,
            Err(ModelError::AtomCountMismatch { atoms: 2, .. })
        ));
    }

    #[test]
    fn validate_rejects_constricted_and_flexible() {
        let mut w = water();
        w.flexible = true;
        w.constricted = true;
        assert!(matches!(
            w.validate(),
            Err(ModelError::ConstrictedAndFlexible { .. })
        ));
    }

    #[test]
    fn world_positions_apply_rotation_then_translation() {
        let mut w = water();
        w.position = Point3::new(1.0, 2.0, 3.0);
        w.orientation = Vector3::new(0.3, 0.2, 0.1);
        let world = w.world_positions();
        let rotation = euler_rotation(&w.orientation);
        let expected = w.position + rotation * w.reference[1];
        assert!((world[1] - expected).norm() < 1e-12);
    }

    #[test]
    fn adopt_positions_refits_rigid_molecule() {
        let mut w = water();
        let mut moved = w.clone();
        moved.position = Point3::new(5.0, -1.0, 0.5);
        moved.orientation = Vector3::new(0.7, -0.4, 1.3);
        let target = moved.world_positions();

        w.adopt_positions(&target);
        for (a, b) in w.world_positions().iter().zip(&target) {
            assert!((a - b).norm() < 1e-8);
        }
    }

    #[test]
    fn adopt_positions_reshapes_flexible_molecule() {
        let mut w = water();
        w.flexible = true;
        let mut target = w.world_positions();
        target[1].x += 0.2;
        w.adopt_positions(&target);
        for (a, b) in w.world_positions().iter().zip(&target) {
            assert!((a - b).norm() < 1e-9);
        }
    }
}
