mod defaults;

pub use defaults::DefaultsConfig;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use evocluster::core::collision::dissociation::DissociationCriterion;
use evocluster::core::models::environment::FitMode;
use evocluster::core::space::AllowedSpace;
use evocluster::engine::config as core_config;
use evocluster::engine::operators::heat::{HeatPulseConfig, PulseMove, PulseSelection};
use evocluster::engine::operators::mutation::MonteCarloMode;
use evocluster::engine::operators::packing::{Dimensionality, PackingConfig, PackingOrder};
use evocluster::engine::optimizer::fire::FireParams;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// One molecule kind of the cluster, read from an XYZ file.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeSpec {
    pub name: String,
    pub path: PathBuf,
    pub count: usize,
    pub flexible: bool,
    pub constricted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSpec {
    pub path: PathBuf,
    /// `None` uses the environment's center of mass.
    pub reference: Option<Point3<f64>>,
    pub space: AllowedSpace,
    pub mode: FitMode,
    pub flexible: bool,
}

/// Everything `run` needs after file values, CLI overrides and defaults are merged.
#[derive(Debug, Clone)]
pub struct RunSetup {
    pub search: core_config::SearchConfig,
    pub molecules: Vec<MoleculeSpec>,
    pub environment: Option<EnvironmentSpec>,
    pub params_path: PathBuf,
    pub fire: FireParams,
    pub heat_pulses: bool,
    pub keep: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMolecule {
    file: PathBuf,
    name: Option<String>,
    #[serde(default = "one")]
    count: usize,
    #[serde(default)]
    flexible: bool,
    #[serde(default)]
    constricted: bool,
}

fn one() -> usize {
    1
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialClusterConfig {
    #[serde(default)]
    molecules: Vec<PartialMolecule>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
enum PartialSpace {
    Sphere {
        center: Option<[f64; 3]>,
        radius: f64,
    },
    Orbit {
        center: Option<[f64; 3]>,
        inner: f64,
        outer: f64,
    },
    HalfSphere {
        center: Option<[f64; 3]>,
        radius: f64,
    },
}

impl PartialSpace {
    fn resolve(self) -> Result<AllowedSpace> {
        let point = |c: Option<[f64; 3]>| c.map_or_else(Point3::origin, Point3::from);
        let space = match self {
            Self::Sphere { center, radius } => AllowedSpace::sphere(point(center), radius),
            Self::Orbit {
                center,
                inner,
                outer,
            } => AllowedSpace::orbit(point(center), inner, outer),
            Self::HalfSphere { center, radius } => {
                AllowedSpace::half_sphere(point(center), radius)
            }
        };
        space.map_err(|e| CliError::Config(e.to_string()))
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEnvironmentConfig {
    file: PathBuf,
    reference: Option<[f64; 3]>,
    space: PartialSpace,
    mode: Option<String>,
    #[serde(default)]
    flexible: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialForcefieldConfig {
    params: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    seed: Option<u64>,
    global_iterations: Option<usize>,
    batch_size: Option<usize>,
    acceptable_fitness: Option<f64>,
    emergency_cap: Option<usize>,
    initializer: Option<PartialInitializer>,
    /// `"none"` disables the dissociation check.
    dissociation: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialInitializer {
    Random,
    Packing,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialBlowConfig {
    collision: Option<f64>,
    dissociation: Option<f64>,
    bonds: Option<f64>,
    environment: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPoolConfig {
    size: Option<usize>,
    max_per_niche: Option<usize>,
    duplicate_tolerance: Option<f64>,
    selection_beta: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPackingConfig {
    order: Option<String>,
    #[serde(default)]
    planar: bool,
    cell: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialPulseSelection {
    PickFive,
    TenPercent,
    UpToFive,
    UpToTenPercent,
    Center,
    OnSphere,
    InSphere,
}

impl From<PartialPulseSelection> for PulseSelection {
    fn from(p: PartialPulseSelection) -> Self {
        match p {
            PartialPulseSelection::PickFive => Self::PickFive,
            PartialPulseSelection::TenPercent => Self::TenPercent,
            PartialPulseSelection::UpToFive => Self::UpToFive,
            PartialPulseSelection::UpToTenPercent => Self::UpToTenPercent,
            PartialPulseSelection::Center => Self::Center,
            PartialPulseSelection::OnSphere => Self::OnSphere,
            PartialPulseSelection::InSphere => Self::InSphere,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialHeatConfig {
    selection: Option<PartialPulseSelection>,
    /// Kick single atoms instead of whole molecules.
    #[serde(default)]
    cartesian: bool,
    iterations: Option<usize>,
    eq_iterations: Option<usize>,
    amplitude: Option<f64>,
    scale_factor: Option<f64>,
    metropolis: Option<bool>,
    temperature: Option<f64>,
    sigma: Option<[f64; 3]>,
    euler_strength: Option<f64>,
    check_validity: Option<bool>,
    reset_iterations: Option<usize>,
    reset_to_random: Option<bool>,
}

impl PartialHeatConfig {
    fn resolve(self) -> HeatPulseConfig {
        let base = HeatPulseConfig::default();
        HeatPulseConfig {
            selection: self.selection.map_or(base.selection, Into::into),
            movement: if self.cartesian {
                PulseMove::Cartesian
            } else {
                base.movement
            },
            iterations: self.iterations.unwrap_or(base.iterations),
            eq_iterations: self.eq_iterations.unwrap_or(base.eq_iterations),
            amplitude: self.amplitude.unwrap_or(base.amplitude),
            scale_factor: self.scale_factor.unwrap_or(base.scale_factor),
            metropolis: self.metropolis.unwrap_or(base.metropolis),
            temperature: self.temperature.unwrap_or(base.temperature),
            sigma: self.sigma.map_or(base.sigma, Vector3::from),
            euler_strength: self.euler_strength.unwrap_or(base.euler_strength),
            check_validity: self.check_validity.unwrap_or(base.check_validity),
            reset_after_no_progress: self.reset_iterations.is_some(),
            reset_iterations: self.reset_iterations.unwrap_or(base.reset_iterations),
            reset_to_random: self.reset_to_random.unwrap_or(base.reset_to_random),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOperatorConfig {
    crossover_cuts: Option<usize>,
    crossover_probability: Option<f64>,
    mutation_probability: Option<f64>,
    /// 0 moves one atom, 1 moves all atoms, 2 moves a random subset.
    mutation_mode: Option<u8>,
    max_move: Option<f64>,
    max_tries: Option<usize>,
    packing: Option<PartialPackingConfig>,
    heat: Option<PartialHeatConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOptimizerConfig {
    max_iterations: Option<usize>,
    force_tolerance: Option<f64>,
    max_step: Option<f64>,
    heat_pulses: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialCrossover {
    Orientation,
    Molecule,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialMutation {
    MonteCarlo,
    Packing,
    LocalHeat,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialStrategy {
    crossover: PartialCrossover,
    mutation: PartialMutation,
    percentage: u32,
}

impl From<PartialStrategy> for core_config::StrategySpec {
    fn from(p: PartialStrategy) -> Self {
        Self {
            crossover: match p.crossover {
                PartialCrossover::Orientation => core_config::CrossoverKind::Orientation,
                PartialCrossover::Molecule => core_config::CrossoverKind::Molecule,
            },
            mutation: match p.mutation {
                PartialMutation::MonteCarlo => core_config::MutationKind::MonteCarlo,
                PartialMutation::Packing => core_config::MutationKind::Packing,
                PartialMutation::LocalHeat => core_config::MutationKind::LocalHeat,
            },
            percentage: p.percentage,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
enum PartialNicher {
    #[serde(rename_all = "kebab-case")]
    InteriorCount { surface_fraction: f64 },
    CoulombMatrix { width: f64, number: usize },
}

impl From<PartialNicher> for core_config::NicherKind {
    fn from(p: PartialNicher) -> Self {
        match p {
            PartialNicher::InteriorCount { surface_fraction } => {
                Self::InteriorCount { surface_fraction }
            }
            PartialNicher::CoulombMatrix { width, number } => Self::CoulombMatrix { width, number },
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialRunConfig {
    cluster: Option<PartialClusterConfig>,
    environment: Option<PartialEnvironmentConfig>,
    forcefield: Option<PartialForcefieldConfig>,
    search: Option<PartialSearchConfig>,
    space: Option<PartialSpace>,
    blow: Option<PartialBlowConfig>,
    pool: Option<PartialPoolConfig>,
    operators: Option<PartialOperatorConfig>,
    optimizer: Option<PartialOptimizerConfig>,
    strategies: Option<Vec<PartialStrategy>>,
    niching: Option<Vec<PartialNicher>>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the file values against CLI overrides and defaults. Relative paths are taken
    /// relative to `base_dir`, the directory of the config file.
    pub fn merge_with_cli(
        mut self,
        args: &RunArgs,
        base_dir: &Path,
        defaults: &DefaultsConfig,
    ) -> Result<RunSetup> {
        self.apply_set_values(&args.set_values)?;
        let resolve_path = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let molecules = self.merge_molecules(&resolve_path)?;
        let environment = self
            .environment
            .take()
            .map(|env| -> Result<EnvironmentSpec> {
                let mode = match env.mode {
                    Some(m) => {
                        FitMode::from_str(&m).map_err(|e| CliError::Config(e.to_string()))?
                    }
                    None => FitMode::default(),
                };
                Ok(EnvironmentSpec {
                    path: resolve_path(&env.file),
                    reference: env.reference.map(Point3::from),
                    space: env.space.resolve()?,
                    mode,
                    flexible: env.flexible,
                })
            })
            .transpose()?;

        let params_path = self
            .forcefield
            .take()
            .and_then(|f| f.params)
            .map(|p| resolve_path(&p))
            .ok_or_else(|| CliError::Config("`forcefield.params` is required.".to_string()))?;

        let optimizer = self.optimizer.take().unwrap_or_default();
        let fire_base = FireParams::default();
        let fire = FireParams {
            max_iterations: optimizer.max_iterations.unwrap_or(fire_base.max_iterations),
            force_tolerance: optimizer
                .force_tolerance
                .unwrap_or(fire_base.force_tolerance),
            max_step: optimizer.max_step.unwrap_or(fire_base.max_step),
            ..fire_base
        };
        let heat_pulses =
            args.heat_pulses || optimizer.heat_pulses.unwrap_or(defaults.heat_pulses);

        let search = self.merge_search(args, defaults)?;

        Ok(RunSetup {
            search,
            molecules,
            environment,
            params_path,
            fire,
            heat_pulses,
            keep: args.keep.unwrap_or(defaults.keep).max(1),
        })
    }

    fn merge_molecules(
        &mut self,
        resolve_path: &impl Fn(&Path) -> PathBuf,
    ) -> Result<Vec<MoleculeSpec>> {
        let partials = self.cluster.take().unwrap_or_default().molecules;
        if partials.is_empty() {
            return Err(CliError::Config(
                "At least one `[[cluster.molecules]]` entry is required.".to_string(),
            ));
        }
        partials
            .into_iter()
            .map(|m| {
                if m.flexible && m.constricted {
                    return Err(CliError::Config(format!(
                        "Molecule '{}' cannot be both flexible and constricted.",
                        m.file.display()
                    )));
                }
                let name = m.name.unwrap_or_else(|| {
                    m.file
                        .file_stem()
                        .map_or_else(|| "molecule".to_string(), |s| s.to_string_lossy().into())
                });
                Ok(MoleculeSpec {
                    name,
                    path: resolve_path(&m.file),
                    count: m.count,
                    flexible: m.flexible,
                    constricted: m.constricted,
                })
            })
            .collect()
    }

    fn merge_search(
        self,
        args: &RunArgs,
        defaults: &DefaultsConfig,
    ) -> Result<core_config::SearchConfig> {
        let search = self.search.unwrap_or_default();
        let space = match self.space {
            Some(space) => space.resolve()?,
            None => AllowedSpace::sphere(Point3::origin(), defaults.space_radius)
                .map_err(|e| CliError::Config(e.to_string()))?,
        };

        let blow_file = self.blow.unwrap_or_default();
        let blow_base = core_config::BlowFactors::default();
        let blow = core_config::BlowFactors {
            collision: blow_file.collision.unwrap_or(blow_base.collision),
            dissociation: blow_file.dissociation.unwrap_or(blow_base.dissociation),
            bonds: blow_file.bonds.unwrap_or(blow_base.bonds),
            environment: blow_file.environment.unwrap_or(blow_base.environment),
        };

        let dissociation = match search.dissociation.as_deref() {
            None => Some(DissociationCriterion::default()),
            Some("none") => None,
            Some(other) => Some(
                DissociationCriterion::from_str(other)
                    .map_err(|e| CliError::Config(e.to_string()))?,
            ),
        };

        let pool_file = self.pool.unwrap_or_default();
        let pool_base = core_config::PoolConfig::default();
        let pool = core_config::PoolConfig {
            size: args.pool_size.or(pool_file.size).unwrap_or(pool_base.size),
            max_per_niche: pool_file.max_per_niche.unwrap_or(pool_base.max_per_niche),
            duplicate_tolerance: pool_file
                .duplicate_tolerance
                .unwrap_or(pool_base.duplicate_tolerance),
            selection_beta: pool_file.selection_beta.unwrap_or(pool_base.selection_beta),
        };

        let operators = Self::merge_operators(self.operators.unwrap_or_default())?;

        let mut builder = core_config::SearchConfigBuilder::new()
            .seed(args.seed.or(search.seed).unwrap_or(defaults.seed))
            .global_iterations(
                args.iterations
                    .or(search.global_iterations)
                    .unwrap_or(defaults.global_iterations),
            )
            .space(space)
            .blow(blow)
            .dissociation(dissociation)
            .pool(pool)
            .operators(operators);
        if let Some(size) = search.batch_size {
            builder = builder.batch_size(size);
        }
        if let Some(fitness) = search.acceptable_fitness {
            builder = builder.acceptable_fitness(fitness);
        }
        if let Some(cap) = search.emergency_cap {
            builder = builder.emergency_cap(cap);
        }
        if let Some(kind) = search.initializer {
            builder = builder.initializer(match kind {
                PartialInitializer::Random => core_config::InitializerKind::Random,
                PartialInitializer::Packing => core_config::InitializerKind::Packing,
            });
        }
        if let Some(strategies) = self.strategies {
            builder = builder.strategies(strategies.into_iter().map(Into::into).collect());
        }
        if let Some(niching) = self.niching {
            builder = builder.niching(niching.into_iter().map(Into::into).collect());
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_operators(partial: PartialOperatorConfig) -> Result<core_config::OperatorConfig> {
        let base = core_config::OperatorConfig::default();
        let mutation_mode = match partial.mutation_mode {
            Some(code) => {
                MonteCarloMode::try_from(code).map_err(|e| CliError::Config(e.to_string()))?
            }
            None => base.mutation_mode,
        };
        let packing = match partial.packing {
            Some(p) => PackingConfig {
                order: match p.order {
                    Some(order) => PackingOrder::from_str(&order)
                        .map_err(|e| CliError::Config(e.to_string()))?,
                    None => PackingOrder::default(),
                },
                dimensionality: if p.planar {
                    Dimensionality::Planar
                } else {
                    Dimensionality::Volumetric
                },
                cell: p.cell.map_or(base.packing.cell, Vector3::from),
            },
            None => base.packing.clone(),
        };
        Ok(core_config::OperatorConfig {
            crossover_cuts: partial.crossover_cuts.unwrap_or(base.crossover_cuts),
            crossover_probability: partial
                .crossover_probability
                .unwrap_or(base.crossover_probability),
            mutation_probability: partial
                .mutation_probability
                .unwrap_or(base.mutation_probability),
            mutation_mode,
            max_move: partial.max_move.unwrap_or(base.max_move),
            max_tries: partial.max_tries.unwrap_or(base.max_tries),
            packing,
            heat: partial.heat.map_or(base.heat, PartialHeatConfig::resolve),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
                )));
            };
            match key {
                "search.seed" => {
                    self.search.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value)?)
                }
                "search.global-iterations" => {
                    self.search
                        .get_or_insert_with(Default::default)
                        .global_iterations = Some(parse_value(key, value)?)
                }
                "search.batch-size" => {
                    self.search.get_or_insert_with(Default::default).batch_size =
                        Some(parse_value(key, value)?)
                }
                "search.acceptable-fitness" => {
                    self.search
                        .get_or_insert_with(Default::default)
                        .acceptable_fitness = Some(parse_value(key, value)?)
                }
                "search.dissociation" => {
                    self.search.get_or_insert_with(Default::default).dissociation =
                        Some(value.to_string())
                }
                "pool.size" => {
                    self.pool.get_or_insert_with(Default::default).size =
                        Some(parse_value(key, value)?)
                }
                "pool.max-per-niche" => {
                    self.pool.get_or_insert_with(Default::default).max_per_niche =
                        Some(parse_value(key, value)?)
                }
                "operators.max-move" => {
                    self.operators.get_or_insert_with(Default::default).max_move =
                        Some(parse_value(key, value)?)
                }
                "operators.mutation-probability" => {
                    self.operators
                        .get_or_insert_with(Default::default)
                        .mutation_probability = Some(parse_value(key, value)?)
                }
                "operators.crossover-cuts" => {
                    self.operators
                        .get_or_insert_with(Default::default)
                        .crossover_cuts = Some(parse_value(key, value)?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{key}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {key}: {value}")))
}
