use crate::core::io::history::HistoryRecord;
use crate::core::models::geometry::Geometry;
use crate::core::utils::random::task_rng;
use crate::engine::context::SearchContext;
use crate::engine::niche::{Niche, NicheComputer};
use crate::engine::optimizer::adaptor::FitnessFunction;
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fills the pool with freshly initialized, locally optimized geometries.
///
/// Ids `0..pool.size` are reserved for this phase.
#[instrument(skip_all, name = "initialization_task")]
pub fn run(context: &SearchContext) -> Vec<HistoryRecord> {
    let size = context.config.pool.size as u64;
    info!(size, "Building initial population.");
    context.reporter.report(Progress::PhaseStart {
        name: "Initialization",
    });
    context
        .reporter
        .report(Progress::TaskStart { total_steps: size });

    let ids: Vec<u64> = (0..size).collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = ids.iter();

    #[cfg(feature = "parallel")]
    let iterator = ids.par_iter();

    let candidates: Vec<Option<(Geometry, Niche)>> = iterator
        .map(|&id| Some(initialize_one(id, context)))
        .collect();

    context.reporter.report(Progress::TaskFinish);
    let records = context.offer_all(candidates);

    info!(
        members = context.pool.len(),
        best = context.pool.best().map(|e| e.fitness),
        "Initial population ready."
    );
    context.reporter.report(Progress::PhaseFinish);
    records
}

fn initialize_one(id: u64, context: &SearchContext) -> (Geometry, Niche) {
    let components = context.components;
    let mut rng = task_rng(context.config.seed, id);
    let geometry = components
        .initializer
        .initialize(context.template, id, &mut rng);
    let geometry = components.fitness.fitness(geometry, false);
    let niche = components.nicher.compute_niche(&geometry);
    debug!(id, fitness = ?geometry.fitness, %niche, "Initial geometry evaluated.");
    context.reporter.report(Progress::TaskIncrement);
    (geometry, niche)
}
