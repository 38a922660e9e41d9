use super::operators::heat::HeatPulseConfig;
use super::operators::mutation::MonteCarloMode;
use super::operators::packing::PackingConfig;
use crate::core::collision::dissociation::DissociationCriterion;
use crate::core::space::AllowedSpace;
use thiserror::Error;

pub const DEFAULT_COLLISION_BLOW: f64 = 1.2;
pub const DEFAULT_DISSOCIATION_BLOW: f64 = 3.0;
pub const DEFAULT_BOND_BLOW: f64 = 1.2;
pub const DEFAULT_ENVIRONMENT_BLOW: f64 = 0.8;
pub const DEFAULT_EMERGENCY_CAP: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlowFactors {
    pub collision: f64,
    pub dissociation: f64,
    pub bonds: f64,
    pub environment: f64,
}

impl Default for BlowFactors {
    fn default() -> Self {
        Self {
            collision: DEFAULT_COLLISION_BLOW,
            dissociation: DEFAULT_DISSOCIATION_BLOW,
            bonds: DEFAULT_BOND_BLOW,
            environment: DEFAULT_ENVIRONMENT_BLOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverKind {
    /// Swaps Euler angles between cut points.
    Orientation,
    /// Swaps whole molecule placements between cut points.
    Molecule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    MonteCarlo,
    Packing,
    LocalHeat,
}

/// One weighted entry of the global-optimization dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySpec {
    pub crossover: CrossoverKind,
    pub mutation: MutationKind,
    pub percentage: u32,
}

/// How the first population is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitializerKind {
    /// Centers of mass scattered over the allowed space.
    #[default]
    Random,
    /// Molecules added one by one around the growing cluster.
    Packing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NicherKind {
    /// Buckets by the number of molecules not on the cluster surface.
    InteriorCount { surface_fraction: f64 },
    /// Buckets by the relative gaps in the Coulomb-matrix eigenvalue spectrum.
    CoulombMatrix { width: f64, number: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    pub crossover_cuts: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub mutation_mode: MonteCarloMode,
    pub max_move: f64,
    pub max_tries: usize,
    pub packing: PackingConfig,
    pub heat: HeatPulseConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            crossover_cuts: 1,
            crossover_probability: 1.0,
            mutation_probability: 0.05,
            mutation_mode: MonteCarloMode::AllAtoms,
            max_move: 0.5,
            max_tries: 10,
            packing: PackingConfig::default(),
            heat: HeatPulseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub size: usize,
    pub max_per_niche: usize,
    /// Candidates whose fitness lies this close to a pool member's are treated as duplicates.
    pub duplicate_tolerance: f64,
    /// Inverse temperature for Boltzmann parent selection, in mol/kJ.
    pub selection_beta: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 100,
            max_per_niche: 20,
            duplicate_tolerance: 1e-6,
            selection_beta: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub seed: u64,
    pub global_iterations: usize,
    /// Candidates produced from one pool snapshot. Results are offered in id order after each
    /// batch, so a run does not depend on thread scheduling.
    pub batch_size: usize,
    pub space: AllowedSpace,
    pub blow: BlowFactors,
    pub dissociation: Option<DissociationCriterion>,
    pub emergency_cap: usize,
    pub acceptable_fitness: f64,
    pub initializer: InitializerKind,
    pub pool: PoolConfig,
    pub operators: OperatorConfig,
    pub strategies: Vec<StrategySpec>,
    pub niching: Vec<NicherKind>,
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    seed: Option<u64>,
    global_iterations: Option<usize>,
    batch_size: Option<usize>,
    space: Option<AllowedSpace>,
    blow: Option<BlowFactors>,
    dissociation: Option<Option<DissociationCriterion>>,
    emergency_cap: Option<usize>,
    acceptable_fitness: Option<f64>,
    initializer: Option<InitializerKind>,
    pool: Option<PoolConfig>,
    operators: Option<OperatorConfig>,
    strategies: Option<Vec<StrategySpec>>,
    niching: Option<Vec<NicherKind>>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn global_iterations(mut self, iterations: usize) -> Self {
        self.global_iterations = Some(iterations);
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }
    pub fn space(mut self, space: AllowedSpace) -> Self {
        self.space = Some(space);
        self
    }
    pub fn blow(mut self, blow: BlowFactors) -> Self {
        self.blow = Some(blow);
        self
    }
    pub fn dissociation(mut self, criterion: Option<DissociationCriterion>) -> Self {
        self.dissociation = Some(criterion);
        self
    }
    pub fn emergency_cap(mut self, cap: usize) -> Self {
        self.emergency_cap = Some(cap);
        self
    }
    pub fn acceptable_fitness(mut self, fitness: f64) -> Self {
        self.acceptable_fitness = Some(fitness);
        self
    }
    pub fn initializer(mut self, kind: InitializerKind) -> Self {
        self.initializer = Some(kind);
        self
    }
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }
    pub fn operators(mut self, operators: OperatorConfig) -> Self {
        self.operators = Some(operators);
        self
    }
    pub fn strategies(mut self, strategies: Vec<StrategySpec>) -> Self {
        self.strategies = Some(strategies);
        self
    }
    pub fn niching(mut self, niching: Vec<NicherKind>) -> Self {
        self.niching = Some(niching);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let config = SearchConfig {
            seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
            global_iterations: self
                .global_iterations
                .ok_or(ConfigError::MissingParameter("global_iterations"))?,
            batch_size: self.batch_size.unwrap_or(16),
            space: self.space.ok_or(ConfigError::MissingParameter("space"))?,
            blow: self.blow.unwrap_or_default(),
            dissociation: self
                .dissociation
                .unwrap_or(Some(DissociationCriterion::Connectivity)),
            emergency_cap: self.emergency_cap.unwrap_or(DEFAULT_EMERGENCY_CAP),
            acceptable_fitness: self.acceptable_fitness.unwrap_or(f64::NEG_INFINITY),
            initializer: self.initializer.unwrap_or_default(),
            pool: self.pool.unwrap_or_default(),
            operators: self.operators.unwrap_or_default(),
            strategies: self.strategies.unwrap_or_else(default_strategies),
            niching: self.niching.unwrap_or_else(|| {
                vec![NicherKind::InteriorCount {
                    surface_fraction: 0.75,
                }]
            }),
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn default_strategies() -> Vec<StrategySpec> {
    vec![
        StrategySpec {
            crossover: CrossoverKind::Molecule,
            mutation: MutationKind::MonteCarlo,
            percentage: 60,
        },
        StrategySpec {
            crossover: CrossoverKind::Orientation,
            mutation: MutationKind::MonteCarlo,
            percentage: 30,
        },
        StrategySpec {
            crossover: CrossoverKind::Molecule,
            mutation: MutationKind::Packing,
            percentage: 10,
        },
    ]
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: &str| ConfigError::InvalidParameter {
            name,
            reason: reason.to_string(),
        };
        if self.pool.size < 2 {
            return Err(invalid("pool.size", "needs at least two members to pick parents"));
        }
        if self.pool.max_per_niche == 0 {
            return Err(invalid("pool.max_per_niche", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be positive"));
        }
        if self.emergency_cap == 0 {
            return Err(invalid("emergency_cap", "must be positive"));
        }
        let blows = [
            self.blow.collision,
            self.blow.dissociation,
            self.blow.bonds,
            self.blow.environment,
        ];
        if blows.iter().any(|b| !(b.is_finite() && *b > 0.0)) {
            return Err(invalid("blow", "blow factors must be positive and finite"));
        }
        let ops = &self.operators;
        if !(ops.max_move.is_finite() && ops.max_move > 0.0) {
            return Err(invalid("operators.max_move", "must be positive"));
        }
        for (name, p) in [
            ("operators.crossover_probability", ops.crossover_probability),
            ("operators.mutation_probability", ops.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(name, "must lie in [0, 1]"));
            }
        }
        if ops.max_tries == 0 {
            return Err(invalid("operators.max_tries", "must be positive"));
        }
        if ops.crossover_cuts == 0 {
            return Err(invalid("operators.crossover_cuts", "must be positive"));
        }
        if self.strategies.is_empty() {
            return Err(invalid("strategies", "at least one strategy is required"));
        }
        if self.pool.selection_beta <= 0.0 {
            return Err(invalid("pool.selection_beta", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn space() -> AllowedSpace {
        AllowedSpace::sphere(Point3::origin(), 5.0).unwrap()
    }

    #[test]
    fn build_fails_without_required_parameters() {
        let result = SearchConfigBuilder::new().global_iterations(10).space(space()).build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("seed"));

        let result = SearchConfigBuilder::new().seed(1).global_iterations(10).build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("space"));
    }

    #[test]
    fn build_applies_defaults() {
        let config = SearchConfigBuilder::new()
            .seed(7)
            .global_iterations(100)
            .space(space())
            .build()
            .unwrap();
        assert_eq!(config.blow, BlowFactors::default());
        assert_eq!(config.emergency_cap, DEFAULT_EMERGENCY_CAP);
        assert_eq!(config.pool.size, 100);
        assert_eq!(
            config.strategies.iter().map(|s| s.percentage).sum::<u32>(),
            100
        );
        assert_eq!(config.dissociation, Some(DissociationCriterion::Connectivity));
    }

    #[test]
    fn build_rejects_non_positive_max_move() {
        let operators = OperatorConfig {
            max_move: 0.0,
            ..OperatorConfig::default()
        };
        let result = SearchConfigBuilder::new()
            .seed(7)
            .global_iterations(1)
            .space(space())
            .operators(operators)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "operators.max_move",
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_tiny_pool() {
        let result = SearchConfigBuilder::new()
            .seed(7)
            .global_iterations(1)
            .space(space())
            .pool(PoolConfig {
                size: 1,
                ..PoolConfig::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "pool.size", .. })
        ));
    }
}
