use super::LocalOptimizer;
use crate::core::collision::bonds::{DEFAULT_BOND_BLOW, detect_bonds};
use crate::core::forcefield::backend::EnergyBackend;
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use crate::core::models::geometry::Geometry;
use crate::core::models::molecule::MoleculeConfig;
use nalgebra::Vector3;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireParams {
    pub max_iterations: usize,
    pub dt: f64,
    pub dt_max: f64,
    pub f_inc: f64,
    pub f_dec: f64,
    pub alpha: f64,
    pub f_alpha: f64,
    /// Uphill-free steps required before the time step may grow.
    pub n_min: usize,
    /// Largest displacement of any atom in one step, in Å.
    pub max_step: f64,
    /// Converged once the largest force drops below this, in kJ/(mol·Å).
    pub force_tolerance: f64,
}

impl Default for FireParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            dt: 0.1,
            dt_max: 1.0,
            f_inc: 1.1,
            f_dec: 0.5,
            alpha: 0.1,
            f_alpha: 0.99,
            n_min: 5,
            max_step: 0.2,
            force_tolerance: 1e-3,
        }
    }
}

/// Fast inertial relaxation on cartesian coordinates. Masked atoms stay frozen.
pub struct FireOptimizer<B: EnergyBackend> {
    backend: B,
    params: FireParams,
    molecule_count: AtomicU64,
    geometry_count: AtomicU64,
}

impl<B: EnergyBackend> FireOptimizer<B> {
    pub fn new(backend: B, params: FireParams) -> Self {
        Self {
            backend,
            params,
            molecule_count: AtomicU64::new(0),
            geometry_count: AtomicU64::new(0),
        }
    }

    pub fn params(&self) -> &FireParams {
        &self.params
    }

    fn relax(&self, cartes: &mut Cartesians, frozen: &[bool], bonds: &BondInfo) -> (f64, usize) {
        let p = &self.params;
        let n = cartes.atom_count();
        let mut velocity = vec![Vector3::zeros(); n];
        let mut gradient = vec![Vector3::zeros(); n];
        let mut dt = p.dt;
        let mut alpha = p.alpha;
        let mut downhill_steps = 0;

        for iteration in 0..p.max_iterations {
            let energy = self.backend.energy_and_gradient(cartes, bonds, &mut gradient);
            let forces: Vec<Vector3<f64>> = gradient
                .iter()
                .zip(frozen)
                .map(|(g, &fixed)| if fixed { Vector3::zeros() } else { -g })
                .collect();
            let max_force = forces.iter().map(|f| f.norm()).fold(0.0, f64::max);
            if max_force < p.force_tolerance {
                return (energy, iteration);
            }

            let power: f64 = forces.iter().zip(&velocity).map(|(f, v)| f.dot(v)).sum();
            if power > 0.0 {
                let v_norm = velocity.iter().map(|v| v.norm_squared()).sum::<f64>().sqrt();
                let f_norm = forces.iter().map(|f| f.norm_squared()).sum::<f64>().sqrt();
                for (v, f) in velocity.iter_mut().zip(&forces) {
                    *v = *v * (1.0 - alpha) + f * (alpha * v_norm / f_norm);
                }
                downhill_steps += 1;
                if downhill_steps > p.n_min {
                    dt = (dt * p.f_inc).min(p.dt_max);
                    alpha *= p.f_alpha;
                }
            } else {
                velocity.iter_mut().for_each(|v| *v = Vector3::zeros());
                dt *= p.f_dec;
                alpha = p.alpha;
                downhill_steps = 0;
            }

            for (v, f) in velocity.iter_mut().zip(&forces) {
                *v += f * dt;
            }
            for ((pos, v), &fixed) in cartes.positions.iter_mut().zip(&velocity).zip(frozen) {
                if fixed {
                    continue;
                }
                let mut step = v * dt;
                let len = step.norm();
                if len > p.max_step {
                    step *= p.max_step / len;
                }
                *pos += step;
            }
        }
        (self.backend.energy(cartes, bonds), p.max_iterations)
    }
}

impl<B: EnergyBackend> LocalOptimizer for FireOptimizer<B> {
    fn optimize_molecule(&self, mut molecule: MoleculeConfig) -> MoleculeConfig {
        self.molecule_count.fetch_add(1, Ordering::Relaxed);
        let cartes = molecule.to_cartesians();
        let bonds = detect_bonds(&cartes, DEFAULT_BOND_BLOW);
        let frozen = vec![molecule.constricted; cartes.atom_count()];
        let (relaxed, _) = self.refine_coordinates(0, cartes, &frozen, &bonds);
        molecule.adopt_positions(&relaxed.positions);
        molecule
    }

    fn optimize_geometry(&self, mut geometry: Geometry) -> Geometry {
        self.geometry_count.fetch_add(1, Ordering::Relaxed);
        let (cartes, bonds) = geometry.full_cartesians();
        let mut frozen = geometry.constraint_mask();
        if let Some(env) = &geometry.environment {
            frozen.extend(std::iter::repeat_n(!env.flexible, env.atom_count()));
        }
        let (relaxed, _) = self.refine_coordinates(geometry.id, cartes, &frozen, &bonds);
        geometry.update_from_full_cartesians(&relaxed);

        // rigid molecules were refitted, so score what is actually stored
        let (cartes, bonds) = geometry.full_cartesians();
        geometry.fitness = Some(self.backend.energy(&cartes, &bonds));
        geometry
    }

    fn refine_coordinates(
        &self,
        id: u64,
        mut cartes: Cartesians,
        constraints: &[bool],
        bonds: &BondInfo,
    ) -> (Cartesians, f64) {
        assert_eq!(
            constraints.len(),
            cartes.atom_count(),
            "constraint mask does not match atom count"
        );
        let (energy, iterations) = self.relax(&mut cartes, constraints, bonds);
        if iterations == self.params.max_iterations {
            debug!(id, energy, "FIRE stopped at the iteration limit.");
        } else {
            trace!(id, energy, iterations, "FIRE converged.");
        }
        (cartes, energy)
    }

    fn molecule_optimizations(&self) -> u64 {
        self.molecule_count.load(Ordering::Relaxed)
    }

    fn geometry_optimizations(&self) -> u64 {
        self.geometry_count.load(Ordering::Relaxed)
    }

    fn backend(&self) -> &dyn EnergyBackend {
        &self.backend
    }
}
