use super::config::{
    CrossoverKind, InitializerKind, MutationKind, NicherKind, SearchConfig, StrategySpec,
};
use super::darwin::{GeneticStrategy, GlobalOptimization};
use super::dispatch::WeightedDispatcher;
use super::error::EngineError;
use super::niche::coulomb::CoulombMatrixNicher;
use super::niche::interior::{DistanceSurfaceDetector, InteriorCountNicher};
use super::niche::{ChainedNicher, NicheComputer};
use super::operators::crossover::{MoleculeCrossover, OrientationCrossover};
use super::operators::heat::LocalHeatMutation;
use super::operators::init::{DeferredInitializer, RandomInitializer};
use super::operators::mutation::MonteCarloMutation;
use super::operators::packing::PackingInitializer;
use super::operators::{Crossover, Initializer, Mutation};
use super::optimizer::LocalOptimizer;
use super::optimizer::adaptor::FitnessAdaptor;
use super::validation::GeometryValidator;
use std::sync::Arc;
use tracing::debug;

/// Everything a search run needs, wired together from one configuration.
pub struct SearchComponents {
    pub validator: GeometryValidator,
    pub fitness: Arc<FitnessAdaptor>,
    pub initializer: Arc<dyn Initializer>,
    pub strategy: WeightedDispatcher,
    pub nicher: ChainedNicher,
}

impl SearchComponents {
    /// Builds the operator graph.
    ///
    /// Heat-pulse mutations need an initializer for their resets, so they receive a deferred slot
    /// that is bound to the real initializer once that exists.
    pub fn assemble(
        config: &SearchConfig,
        optimizer: Arc<dyn LocalOptimizer>,
    ) -> Result<Self, EngineError> {
        let validator = GeometryValidator::from_config(config);
        let fitness = Arc::new(FitnessAdaptor::new(optimizer));
        let deferred = Arc::new(DeferredInitializer::new());

        let strategies = config
            .strategies
            .iter()
            .map(|spec| build_strategy(spec, config, &validator, &fitness, &deferred))
            .collect::<Result<Vec<_>, EngineError>>()?;
        let percentages: Vec<u32> = config.strategies.iter().map(|s| s.percentage).collect();
        let strategy = WeightedDispatcher::new(strategies, &percentages)?;

        let initializer: Arc<dyn Initializer> = match config.initializer {
            InitializerKind::Random => Arc::new(RandomInitializer::new(
                config.space.clone(),
                validator.clone(),
                config.emergency_cap,
            )),
            InitializerKind::Packing => Arc::new(PackingInitializer::new(
                config.operators.packing.clone(),
                validator.clone(),
                config.emergency_cap,
            )),
        };
        deferred.bind(initializer.clone())?;

        let nicher = ChainedNicher::new(config.niching.iter().map(build_nicher).collect());
        debug!(strategy = %strategy.name(), nichers = nicher.len(), "Search components assembled.");

        Ok(Self {
            validator,
            fitness,
            initializer,
            strategy,
            nicher,
        })
    }
}

fn build_strategy(
    spec: &StrategySpec,
    config: &SearchConfig,
    validator: &GeometryValidator,
    fitness: &Arc<FitnessAdaptor>,
    deferred: &Arc<DeferredInitializer>,
) -> Result<Box<dyn GlobalOptimization>, EngineError> {
    let ops = &config.operators;
    let crossover: Box<dyn Crossover> = match spec.crossover {
        CrossoverKind::Orientation => Box::new(OrientationCrossover::new(ops.crossover_cuts)),
        CrossoverKind::Molecule => Box::new(MoleculeCrossover::new(ops.crossover_cuts)),
    };
    let mutation: Box<dyn Mutation> = match spec.mutation {
        MutationKind::MonteCarlo => {
            Box::new(MonteCarloMutation::new(ops.mutation_mode, ops.max_move)?)
        }
        MutationKind::Packing => Box::new(PackingInitializer::new(
            ops.packing.clone(),
            validator.clone(),
            config.emergency_cap,
        )),
        MutationKind::LocalHeat => Box::new(LocalHeatMutation::new(
            ops.heat.clone(),
            validator.clone(),
            fitness.clone(),
            deferred.clone(),
            config.acceptable_fitness,
        )),
    };
    Ok(Box::new(GeneticStrategy::new(
        crossover,
        mutation,
        ops.crossover_probability,
        ops.mutation_probability,
        ops.max_tries,
        validator.clone(),
        fitness.clone(),
    )))
}

fn build_nicher(kind: &NicherKind) -> Box<dyn NicheComputer> {
    match *kind {
        NicherKind::InteriorCount { surface_fraction } => Box::new(InteriorCountNicher::new(
            DistanceSurfaceDetector::new(surface_fraction),
        )),
        NicherKind::CoulombMatrix { width, number } => {
            Box::new(CoulombMatrixNicher::new(width, number))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::AllowedSpace;
    use crate::engine::config::{SearchConfigBuilder, StrategySpec};
    use crate::engine::dispatch::DispatchError;
    use crate::engine::optimizer::fire::{FireOptimizer, FireParams};
    use crate::testing::argon_backend;
    use nalgebra::Point3;

    fn optimizer() -> Arc<dyn LocalOptimizer> {
        Arc::new(FireOptimizer::new(argon_backend(), FireParams::default()))
    }

    fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
            .seed(1)
            .global_iterations(10)
            .space(AllowedSpace::sphere(Point3::origin(), 5.0).unwrap())
    }

    #[test]
    fn default_configuration_assembles() {
        let config = builder().build().unwrap();
        let components = SearchComponents::assemble(&config, optimizer()).unwrap();
        assert_eq!(components.strategy.len(), 3);
        assert_eq!(components.nicher.len(), 1);
    }

    #[test]
    fn bad_percentages_are_fatal() {
        let config = builder()
            .strategies(vec![StrategySpec {
                crossover: CrossoverKind::Orientation,
                mutation: MutationKind::LocalHeat,
                percentage: 90,
            }])
            .build()
            .unwrap();
        let result = SearchComponents::assemble(&config, optimizer());
        assert!(matches!(
            result,
            Err(EngineError::Dispatch(DispatchError::BadSum { sum: 90 }))
        ));
    }
}
