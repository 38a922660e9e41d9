use crate::core::io::history::HistoryRecord;
use crate::core::models::geometry::Geometry;
use crate::engine::components::SearchComponents;
use crate::engine::darwin::GlobalOptimization;
use crate::engine::config::SearchConfig;
use crate::engine::context::{OfferTally, SearchContext};
use crate::engine::error::EngineError;
use crate::engine::optimizer::LocalOptimizer;
use crate::engine::pool::{NichedPool, PopulationPool};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{PoolEntry, SearchStatistics};
use crate::engine::tasks;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Final pool, best first.
    pub entries: Vec<PoolEntry>,
    pub statistics: SearchStatistics,
    /// One record per offered candidate, in offer order.
    pub history: Vec<HistoryRecord>,
}

impl SearchResult {
    pub fn best(&self) -> Option<&PoolEntry> {
        self.entries.first()
    }
}

#[instrument(skip_all, name = "search_workflow")]
pub fn run(
    template: &Geometry,
    config: &SearchConfig,
    optimizer: Arc<dyn LocalOptimizer>,
    reporter: &ProgressReporter,
) -> Result<SearchResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    check_template(template, config)?;
    let components = SearchComponents::assemble(config, optimizer)?;
    let pool = NichedPool::new(&config.pool);
    let tally = OfferTally::default();
    let context = SearchContext::new(config, template, &components, &pool, reporter, &tally);
    info!(
        molecules = template.molecule_count(),
        atoms = template.total_atom_count(),
        strategy = %components.strategy.name(),
        seed = config.seed,
        "Search prepared."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Initial population ===
    let mut history = tasks::initialization::run(&context);
    if pool.len() < 2 {
        return Err(EngineError::PhaseFailed {
            phase: "Initialization",
            reason: format!(
                "only {} of {} initial geometries were accepted into the pool",
                pool.len(),
                config.pool.size
            ),
        });
    }

    // === Phase 2: Global optimization ===
    if converged(&pool, config) {
        info!("Initial population already reached the acceptable fitness.");
    } else {
        run_global_phase(&context, &mut history);
    }

    // === Phase 3: Results ===
    let result = SearchResult {
        entries: pool.entries(),
        statistics: SearchStatistics {
            fitness_evaluations: components.fitness.evaluations(),
            local_optimizations: components.fitness.optimizations(),
            accepted: tally.accepted.load(Ordering::Relaxed),
            rejected: tally.rejected.load(Ordering::Relaxed),
            failed: tally.failed.load(Ordering::Relaxed),
        },
        history,
    };
    info!(
        members = result.entries.len(),
        best = result.best().map(|e| e.fitness),
        evaluations = result.statistics.fitness_evaluations,
        "Search complete."
    );
    Ok(result)
}

fn check_template(template: &Geometry, config: &SearchConfig) -> Result<(), EngineError> {
    let cuts = config.operators.crossover_cuts;
    if template.molecule_count() <= cuts {
        return Err(EngineError::PhaseFailed {
            phase: "Preparation",
            reason: format!(
                "{} molecule(s) cannot be recombined with {} cut(s)",
                template.molecule_count(),
                cuts
            ),
        });
    }
    if template.molecules.iter().all(|m| m.constricted) {
        warn!("Every molecule is constricted; global moves will not change the cluster.");
    }
    Ok(())
}

fn converged(pool: &dyn PopulationPool, config: &SearchConfig) -> bool {
    pool.best()
        .is_some_and(|e| e.fitness <= config.acceptable_fitness)
}

fn run_global_phase(context: &SearchContext, history: &mut Vec<HistoryRecord>) {
    let config = context.config;
    info!(
        iterations = config.global_iterations,
        batch_size = config.batch_size,
        "Starting global optimization."
    );
    context.reporter.report(Progress::PhaseStart {
        name: "Global Optimization",
    });
    context.reporter.report(Progress::TaskStart {
        total_steps: config.global_iterations as u64,
    });

    let mut next_id = config.pool.size as u64;
    let mut remaining = config.global_iterations;
    while remaining > 0 {
        let count = remaining.min(config.batch_size);
        history.extend(tasks::generation::run(context, next_id, count));
        next_id += count as u64;
        remaining -= count;

        if converged(context.pool, config) {
            info!(
                remaining,
                "Acceptable fitness reached; stopping global optimization early."
            );
            break;
        }
    }

    context.reporter.report(Progress::TaskFinish);
    context.reporter.report(Progress::PhaseFinish);
}
