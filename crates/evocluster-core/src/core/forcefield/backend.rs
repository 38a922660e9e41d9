use super::params::ForcefieldParams;
use super::potentials::{
    coulomb, coulomb_derivative, lennard_jones_12_6, lennard_jones_12_6_derivative,
};
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use nalgebra::Vector3;

/// Energy evaluation over a flattened coordinate set.
///
/// Implementations must be shareable across worker threads; the search calls them concurrently.
pub trait EnergyBackend: Send + Sync {
    fn energy(&self, cartes: &Cartesians, bonds: &BondInfo) -> f64;

    /// Energy plus its gradient with respect to every atom position. `gradient` must hold one
    /// entry per atom and is overwritten.
    fn energy_and_gradient(
        &self,
        cartes: &Cartesians,
        bonds: &BondInfo,
        gradient: &mut [Vector3<f64>],
    ) -> f64;
}

/// Pairwise Lennard-Jones plus Coulomb over atoms of different molecules.
///
/// Intramolecular pairs are skipped entirely, which keeps rigid molecules from feeling their own
/// internal strain. Pairs involving an element without parameters contribute no dispersion term.
#[derive(Debug, Clone)]
pub struct LennardJonesBackend {
    params: ForcefieldParams,
}

impl LennardJonesBackend {
    pub fn new(params: ForcefieldParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForcefieldParams {
        &self.params
    }

    fn pair_terms(&self, cartes: &Cartesians, a: usize, b: usize, dist: f64) -> (f64, f64) {
        if let Some(cutoff) = self.params.globals.cutoff {
            if dist > cutoff {
                return (0.0, 0.0);
            }
        }
        let mut energy = 0.0;
        let mut derivative = 0.0;
        if let Some(lj) = self.params.pair(cartes.elements[a], cartes.elements[b]) {
            energy += lennard_jones_12_6(dist, lj.radius, lj.well_depth);
            derivative += lennard_jones_12_6_derivative(dist, lj.radius, lj.well_depth);
        }
        let (qa, qb) = (cartes.charges[a], cartes.charges[b]);
        if qa != 0.0 && qb != 0.0 {
            let dielectric = self.params.globals.dielectric_constant;
            energy += coulomb(dist, qa, qb, dielectric);
            derivative += coulomb_derivative(dist, qa, qb, dielectric);
        }
        (energy, derivative)
    }
}

impl EnergyBackend for LennardJonesBackend {
    fn energy(&self, cartes: &Cartesians, _bonds: &BondInfo) -> f64 {
        let owner = cartes.molecule_of_atom();
        let n = cartes.atom_count();
        let mut total = 0.0;
        for a in 0..n {
            for b in (a + 1)..n {
                if owner[a] == owner[b] {
                    continue;
                }
                let dist = (cartes.positions[a] - cartes.positions[b]).norm();
                total += self.pair_terms(cartes, a, b, dist).0;
            }
        }
        total
    }

    fn energy_and_gradient(
        &self,
        cartes: &Cartesians,
        _bonds: &BondInfo,
        gradient: &mut [Vector3<f64>],
    ) -> f64 {
        assert_eq!(gradient.len(), cartes.atom_count());
        gradient.fill(Vector3::zeros());
        let owner = cartes.molecule_of_atom();
        let n = cartes.atom_count();
        let mut total = 0.0;
        for a in 0..n {
            for b in (a + 1)..n {
                if owner[a] == owner[b] {
                    continue;
                }
                let diff = cartes.positions[a] - cartes.positions[b];
                let dist = diff.norm();
                let (energy, derivative) = self.pair_terms(cartes, a, b, dist);
                total += energy;
                if dist > 0.0 {
                    let g = diff * (derivative / dist);
                    gradient[a] += g;
                    gradient[b] -= g;
                }
            }
        }
        total
    }
}
