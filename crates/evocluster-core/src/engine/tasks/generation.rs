use crate::core::io::history::HistoryRecord;
use crate::core::models::geometry::Geometry;
use crate::core::utils::random::task_rng;
use crate::engine::context::SearchContext;
use crate::engine::darwin::GlobalOptimization;
use crate::engine::niche::{Niche, NicheComputer};
use crate::engine::progress::Progress;
use rand::rngs::StdRng;
use tracing::{debug, instrument, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

struct WorkUnit {
    id: u64,
    mother: Geometry,
    father: Geometry,
    rng: StdRng,
}

/// Runs `count` global optimization steps against one snapshot of the pool.
///
/// Parents are drawn serially in id order from each step's own generator; the steps themselves
/// run in parallel and their children are offered back in id order.
#[instrument(skip_all, name = "generation_task", fields(first_id = first_id, count = count))]
pub fn run(context: &SearchContext, first_id: u64, count: usize) -> Vec<HistoryRecord> {
    let mut work = Vec::with_capacity(count);
    for id in first_id..first_id + count as u64 {
        let mut rng = task_rng(context.config.seed, id);
        match context.pool.select_parents(&mut rng) {
            Some((mother, father)) => work.push(WorkUnit {
                id,
                mother,
                father,
                rng,
            }),
            None => warn!(id, "Pool cannot provide two parents; skipping step."),
        }
    }
    let skipped = count - work.len();

    #[cfg(not(feature = "parallel"))]
    let iterator = work.into_iter();

    #[cfg(feature = "parallel")]
    let iterator = work.into_par_iter();

    let mut candidates: Vec<Option<(Geometry, Niche)>> =
        iterator.map(|unit| evolve(unit, context)).collect();
    candidates.extend(std::iter::repeat_n(None, skipped));

    let records = context.offer_all(candidates);
    debug!(
        first_id,
        offered = records.len(),
        accepted = records.iter().filter(|r| r.accepted).count(),
        "Batch offered to pool."
    );
    records
}

fn evolve(mut unit: WorkUnit, context: &SearchContext) -> Option<(Geometry, Niche)> {
    let components = context.components;
    let child = components.strategy.global_optimization(
        unit.id,
        &unit.mother,
        &unit.father,
        &mut unit.rng,
    );
    context.reporter.report(Progress::TaskIncrement);
    let Some(child) = child else {
        trace!(id = unit.id, "No valid child produced.");
        return None;
    };
    let niche = components.nicher.compute_niche(&child);
    Some((child, niche))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::AllowedSpace;
    use crate::engine::components::SearchComponents;
    use crate::engine::config::{PoolConfig, SearchConfigBuilder};
    use crate::engine::context::OfferTally;
    use crate::engine::optimizer::fire::{FireOptimizer, FireParams};
    use crate::engine::pool::{NichedPool, PopulationPool};
    use crate::engine::progress::ProgressReporter;
    use crate::testing::{argon_backend, argon_cluster, argon_line};
    use nalgebra::Point3;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[test]
    fn run_produces_children_with_lineage() {
        let config = SearchConfigBuilder::new()
            .seed(3)
            .global_iterations(4)
            .space(AllowedSpace::sphere(Point3::origin(), 4.0).unwrap())
            .pool(PoolConfig {
                size: 4,
                duplicate_tolerance: 0.0,
                ..PoolConfig::default()
            })
            .build()
            .unwrap();
        let template = argon_line(3, 4.0);
        let optimizer = Arc::new(FireOptimizer::new(argon_backend(), FireParams::default()));
        let components = SearchComponents::assemble(&config, optimizer).unwrap();
        let pool = NichedPool::new(&config.pool);
        for (id, x) in [(0, 4.0), (1, 4.5)] {
            let mut seed = argon_cluster(&[
                Point3::origin(),
                Point3::new(x, 0.0, 0.0),
                Point3::new(0.0, 4.0, 0.0),
            ]);
            seed.id = id;
            seed.fitness = Some(-1.0 - id as f64);
            pool.offer(seed, Niche::new("seed"));
        }
        let reporter = ProgressReporter::default();
        let tally = OfferTally::default();
        let context = SearchContext::new(&config, &template, &components, &pool, &reporter, &tally);

        let records = run(&context, 10, 4);
        let failed = tally.failed.load(Ordering::Relaxed) as usize;
        assert_eq!(records.len() + failed, 4);
        for record in &records {
            assert!((10..14).contains(&record.id));
            let mother = record.mother.unwrap();
            let father = record.father.unwrap();
            assert_ne!(mother, father);
            assert!(mother <= 1 && father <= 1);
        }
        assert!(pool.best().unwrap().fitness < -2.0);
    }

    #[test]
    fn run_skips_steps_when_pool_is_too_small() {
        let config = SearchConfigBuilder::new()
            .seed(3)
            .global_iterations(2)
            .space(AllowedSpace::sphere(Point3::origin(), 4.0).unwrap())
            .build()
            .unwrap();
        let template = argon_line(2, 4.0);
        let optimizer = Arc::new(FireOptimizer::new(argon_backend(), FireParams::default()));
        let components = SearchComponents::assemble(&config, optimizer).unwrap();
        let pool = NichedPool::new(&config.pool);
        let reporter = ProgressReporter::default();
        let tally = OfferTally::default();
        let context = SearchContext::new(&config, &template, &components, &pool, &reporter, &tally);

        let records = run(&context, 0, 3);
        assert!(records.is_empty());
        assert_eq!(tally.failed.load(Ordering::Relaxed), 3);
    }
}
