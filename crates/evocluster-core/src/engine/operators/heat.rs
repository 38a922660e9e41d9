use super::init::DeferredInitializer;
use super::{Initializer, Mutation};
use crate::core::forcefield::backend::EnergyBackend;
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use crate::core::models::geometry::Geometry;
use crate::core::models::molecule::MoleculeConfig;
use crate::core::utils::random::{
    distinct_indices, perturb_eulers, random_displacement, random_unit_vector, task_rng,
};
use crate::engine::optimizer::LocalOptimizer;
use crate::engine::optimizer::adaptor::{FitnessAdaptor, FitnessFunction};
use crate::engine::validation::GeometryValidator;
use nalgebra::{Point3, Vector3};
use rand::{Rng, RngCore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Boltzmann constant in kJ/(mol·K).
const BOLTZMANN: f64 = 0.008_314_472;
/// Entities whose pulse weight falls below this are left alone.
const GAUSSIAN_THRESHOLD: f64 = 1e-2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulseSelection {
    #[default]
    PickFive,
    TenPercent,
    UpToFive,
    UpToTenPercent,
    /// Gaussian pulse at the cluster's center of mass.
    Center,
    /// Gaussian pulse at a random point on the cluster surface.
    OnSphere,
    /// Gaussian pulse at a random point inside the cluster.
    InSphere,
}

impl PulseSelection {
    fn is_spatial(self) -> bool {
        matches!(self, Self::Center | Self::OnSphere | Self::InSphere)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulseMove {
    Cartesian,
    #[default]
    CentersOfMass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatPulseConfig {
    pub selection: PulseSelection,
    pub movement: PulseMove,
    pub iterations: usize,
    /// Pulses after which amplitude, temperature and Euler strength start to shrink.
    pub eq_iterations: usize,
    /// Initial largest displacement in Å.
    pub amplitude: f64,
    pub scale_factor: f64,
    pub metropolis: bool,
    /// Initial Metropolis temperature in K.
    pub temperature: f64,
    pub sigma: Vector3<f64>,
    pub euler_strength: f64,
    pub check_validity: bool,
    pub reset_after_no_progress: bool,
    pub reset_iterations: usize,
    pub reset_to_random: bool,
}

impl Default for HeatPulseConfig {
    fn default() -> Self {
        Self {
            selection: PulseSelection::default(),
            movement: PulseMove::default(),
            iterations: 10,
            eq_iterations: 3,
            amplitude: 2.0,
            scale_factor: 0.9,
            metropolis: true,
            temperature: 50.0,
            sigma: Vector3::new(0.1, 0.1, 0.1),
            euler_strength: 0.5,
            check_validity: false,
            reset_after_no_progress: false,
            reset_iterations: 1000,
            reset_to_random: false,
        }
    }
}

/// Basin hopping with localized kicks.
///
/// Each pulse disturbs part of the cluster, relaxes it and accepts or rejects the result. The
/// best geometry seen is returned.
pub struct LocalHeatPulses;

struct Schedule {
    amplitude: f64,
    temperature: f64,
    euler_strength: f64,
}

impl LocalHeatPulses {
    pub fn cycle(
        initial: &Geometry,
        fitness: &dyn FitnessFunction,
        validator: &GeometryValidator,
        config: &HeatPulseConfig,
        acceptable_fitness: f64,
        reinit: &dyn Initializer,
        rng: &mut dyn RngCore,
    ) -> Geometry {
        let cluster_radius = if matches!(config.selection, PulseSelection::InSphere) {
            Self::cluster_radius(&initial.cartesians())
        } else {
            0.0
        };
        let mut schedule = Schedule {
            amplitude: config.amplitude,
            temperature: config.temperature,
            euler_strength: config.euler_strength,
        };

        let mut work = initial.clone();
        let mut best: Option<Geometry> = None;
        let mut no_progress = 0;

        for iteration in 0..config.iterations {
            if best.as_ref().is_some_and(|b| score(b) <= acceptable_fitness) {
                debug!(iteration, acceptable_fitness, "Acceptable fitness reached.");
                break;
            }
            let previous = work.clone();

            if iteration > 0 {
                if config.selection.is_spatial() {
                    let pulse = Self::pulse_point(&work, config.selection, cluster_radius, rng);
                    Self::spatial_pulse(&mut work, pulse, config, &schedule, rng);
                } else {
                    Self::distributed_pulse(&mut work, config, &schedule, rng);
                }
                if config.check_validity && !validator.is_cluster_sane(&work) {
                    trace!(iteration, "Pulse produced an insane geometry; reverting.");
                    work = previous;
                    continue;
                }
            }

            work = fitness.fitness(work, false);

            if score(&work) > score(&previous) {
                let accept = config.metropolis && {
                    let beta = 1.0 / (BOLTZMANN * schedule.temperature);
                    let boltzmann = (-beta * (score(&work) - score(&previous))).exp();
                    boltzmann >= rng.r#gen::<f64>()
                };
                if !accept {
                    work = previous;
                    continue;
                }
            }

            if best.as_ref().is_none_or(|b| score(&work) < score(b)) {
                trace!(iteration, fitness = score(&work), "New best in heat pulses.");
                best = Some(work.clone());
                no_progress = 0;
            } else {
                no_progress += 1;
            }

            if config.reset_after_no_progress && no_progress >= config.reset_iterations {
                work = if config.reset_to_random {
                    let mut fresh = reinit.initialize(initial, initial.id, rng);
                    fresh.mother = initial.mother;
                    fresh.father = initial.father;
                    fresh
                } else {
                    initial.clone()
                };
                no_progress = 0;
            }

            if iteration > config.eq_iterations {
                schedule.amplitude *= config.scale_factor;
                schedule.temperature *= config.scale_factor;
                schedule.euler_strength *= config.scale_factor;
            }
        }
        best.unwrap_or(work)
    }

    fn cluster_radius(cartes: &Cartesians) -> f64 {
        let Some(com) = cartes.center_of_mass() else {
            return 0.0;
        };
        cartes
            .positions
            .iter()
            .map(|p| (p - com).norm())
            .fold(0.0, f64::max)
    }

    fn pulse_point(
        geometry: &Geometry,
        selection: PulseSelection,
        cluster_radius: f64,
        rng: &mut dyn RngCore,
    ) -> Point3<f64> {
        let cartes = geometry.cartesians();
        let com = cartes.center_of_mass().unwrap_or_else(Point3::origin);
        match selection {
            PulseSelection::InSphere => {
                com + random_unit_vector(rng) * (cluster_radius * rng.r#gen::<f64>())
            }
            PulseSelection::OnSphere => {
                let direction = random_unit_vector(rng);
                let reach = cartes
                    .positions
                    .iter()
                    .map(|p| (p - com).dot(&direction))
                    .fold(0.0, f64::max);
                com + direction * reach
            }
            _ => com,
        }
    }

    fn weight(offset: &Vector3<f64>, amplitude: f64, sigma: &Vector3<f64>) -> f64 {
        let exponent = offset.x * offset.x / sigma.x
            + offset.y * offset.y / sigma.y
            + offset.z * offset.z / sigma.z;
        amplitude * (-exponent).exp()
    }

    fn spatial_pulse(
        work: &mut Geometry,
        pulse: Point3<f64>,
        config: &HeatPulseConfig,
        schedule: &Schedule,
        rng: &mut dyn RngCore,
    ) {
        let mut moved = 0;
        match config.movement {
            PulseMove::CentersOfMass => {
                for molecule in work.molecules.iter_mut().filter(|m| !m.constricted) {
                    let w = Self::weight(&(molecule.position - pulse), schedule.amplitude, &config.sigma);
                    if w > GAUSSIAN_THRESHOLD {
                        let strength = (schedule.euler_strength * w).min(1.0);
                        Self::kick_molecule(molecule, w, strength, rng);
                        moved += 1;
                    }
                }
            }
            PulseMove::Cartesian => {
                let mut cartes = work.cartesians();
                let frozen = work.constraint_mask();
                for (p, _) in cartes.positions.iter_mut().zip(&frozen).filter(|(_, f)| !**f) {
                    let w = Self::weight(&(*p - pulse), schedule.amplitude, &config.sigma);
                    if w > GAUSSIAN_THRESHOLD {
                        *p += random_displacement(rng, w);
                        moved += 1;
                    }
                }
                work.update_from_cartesians(&cartes);
            }
        }
        trace!(moved, "Spatial heat pulse applied.");
    }

    fn distributed_pulse(
        work: &mut Geometry,
        config: &HeatPulseConfig,
        schedule: &Schedule,
        rng: &mut dyn RngCore,
    ) {
        let entities = match config.movement {
            PulseMove::CentersOfMass => work.molecule_count(),
            PulseMove::Cartesian => work.total_atom_count(),
        };
        let count = match config.selection {
            PulseSelection::TenPercent => (0.1 * entities as f64).round() as usize,
            PulseSelection::UpToFive => rng.gen_range(0..5),
            PulseSelection::UpToTenPercent => {
                (rng.r#gen::<f64>() * 0.1 * entities as f64).round() as usize
            }
            _ => 5,
        }
        .min(entities);
        let picked = distinct_indices(rng, count, entities);

        match config.movement {
            PulseMove::CentersOfMass => {
                for m in picked {
                    let molecule = &mut work.molecules[m];
                    if !molecule.constricted {
                        Self::kick_molecule(molecule, schedule.amplitude, schedule.euler_strength, rng);
                    }
                }
            }
            PulseMove::Cartesian => {
                let mut cartes = work.cartesians();
                let frozen = work.constraint_mask();
                for atom in picked.into_iter().filter(|&a| !frozen[a]) {
                    cartes.positions[atom] += random_displacement(rng, schedule.amplitude);
                }
                work.update_from_cartesians(&cartes);
            }
        }
    }

    fn kick_molecule(
        molecule: &mut MoleculeConfig,
        amplitude: f64,
        euler_strength: f64,
        rng: &mut dyn RngCore,
    ) {
        molecule.position += random_displacement(rng, amplitude);
        molecule.orientation = perturb_eulers(&molecule.orientation, euler_strength, rng);
    }
}

fn score(geometry: &Geometry) -> f64 {
    geometry.fitness.unwrap_or(f64::INFINITY)
}

/// Heat-pulse run used as a mutation.
pub struct LocalHeatMutation {
    config: HeatPulseConfig,
    validator: GeometryValidator,
    fitness: Arc<dyn FitnessFunction>,
    reinit: Arc<DeferredInitializer>,
    acceptable_fitness: f64,
}

impl LocalHeatMutation {
    pub fn new(
        config: HeatPulseConfig,
        validator: GeometryValidator,
        fitness: Arc<dyn FitnessFunction>,
        reinit: Arc<DeferredInitializer>,
        acceptable_fitness: f64,
    ) -> Self {
        Self {
            config,
            validator,
            fitness,
            reinit,
            acceptable_fitness,
        }
    }
}

impl Mutation for LocalHeatMutation {
    fn mutate(&self, parent: &Geometry, rng: &mut dyn RngCore) -> Geometry {
        LocalHeatPulses::cycle(
            parent,
            self.fitness.as_ref(),
            &self.validator,
            &self.config,
            self.acceptable_fitness,
            self.reinit.as_ref(),
            rng,
        )
    }

    fn name(&self) -> &'static str {
        "local-heat"
    }

    fn returns_optimized(&self) -> bool {
        true
    }
}

/// Heat-pulse run used as a local optimizer around an inner optimizer.
///
/// The optimizer interface carries no generator, so each geometry gets one derived from the
/// configured seed and its id.
pub struct LocalHeatOptimizer {
    inner: Arc<dyn LocalOptimizer>,
    fitness: FitnessAdaptor,
    config: HeatPulseConfig,
    validator: GeometryValidator,
    reinit: Arc<DeferredInitializer>,
    acceptable_fitness: f64,
    seed: u64,
    geometry_count: AtomicU64,
}

impl LocalHeatOptimizer {
    pub fn new(
        inner: Arc<dyn LocalOptimizer>,
        config: HeatPulseConfig,
        validator: GeometryValidator,
        reinit: Arc<DeferredInitializer>,
        acceptable_fitness: f64,
        seed: u64,
    ) -> Self {
        Self {
            fitness: FitnessAdaptor::new(inner.clone()),
            inner,
            config,
            validator,
            reinit,
            acceptable_fitness,
            seed,
            geometry_count: AtomicU64::new(0),
        }
    }
}

impl LocalOptimizer for LocalHeatOptimizer {
    fn optimize_molecule(&self, molecule: MoleculeConfig) -> MoleculeConfig {
        self.inner.optimize_molecule(molecule)
    }

    fn optimize_geometry(&self, geometry: Geometry) -> Geometry {
        self.geometry_count.fetch_add(1, Ordering::Relaxed);
        let mut rng = task_rng(self.seed, geometry.id);
        LocalHeatPulses::cycle(
            &geometry,
            &self.fitness,
            &self.validator,
            &self.config,
            self.acceptable_fitness,
            self.reinit.as_ref(),
            &mut rng,
        )
    }

    fn refine_coordinates(
        &self,
        id: u64,
        cartes: Cartesians,
        constraints: &[bool],
        bonds: &BondInfo,
    ) -> (Cartesians, f64) {
        self.inner.refine_coordinates(id, cartes, constraints, bonds)
    }

    fn molecule_optimizations(&self) -> u64 {
        self.inner.molecule_optimizations()
    }

    fn geometry_optimizations(&self) -> u64 {
        self.geometry_count.load(Ordering::Relaxed)
    }

    fn backend(&self) -> &dyn EnergyBackend {
        self.inner.backend()
    }
}
