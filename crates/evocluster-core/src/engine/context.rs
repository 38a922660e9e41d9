use super::components::SearchComponents;
use super::config::SearchConfig;
use super::niche::Niche;
use super::pool::PopulationPool;
use super::progress::{Progress, ProgressReporter};
use crate::core::io::history::HistoryRecord;
use crate::core::models::geometry::Geometry;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Shared, read-only view of one search run handed to every task.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub template: &'a Geometry,
    pub components: &'a SearchComponents,
    pub pool: &'a dyn PopulationPool,
    pub reporter: &'a ProgressReporter<'a>,
    pub tally: &'a OfferTally,
}

/// Outcome counters for candidates handed to the pool.
#[derive(Debug, Default)]
pub struct OfferTally {
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    pub failed: AtomicU64,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        config: &'a SearchConfig,
        template: &'a Geometry,
        components: &'a SearchComponents,
        pool: &'a dyn PopulationPool,
        reporter: &'a ProgressReporter<'a>,
        tally: &'a OfferTally,
    ) -> Self {
        Self {
            config,
            template,
            components,
            pool,
            reporter,
            tally,
        }
    }

    /// Offers evaluated candidates in the given order and returns their genealogy rows.
    ///
    /// `None` entries are tasks that produced nothing; they are only counted.
    pub fn offer_all(&self, candidates: Vec<Option<(Geometry, Niche)>>) -> Vec<HistoryRecord> {
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some((geometry, niche)) = candidate else {
                self.tally.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let previous_best = self.pool.best().map(|e| e.fitness);
            let record = HistoryRecord {
                id: geometry.id,
                mother: geometry.mother,
                father: geometry.father,
                fitness: geometry.fitness,
                niche: niche.to_string(),
                accepted: false,
            };
            let fitness = geometry.fitness;
            let accepted = self.pool.offer(geometry, niche);
            if accepted {
                self.tally.accepted.fetch_add(1, Ordering::Relaxed);
                if let Some(f) = fitness.filter(|&f| previous_best.is_none_or(|b| f < b)) {
                    info!(id = record.id, fitness = f, "New best geometry.");
                    self.reporter.report(Progress::NewBest {
                        id: record.id,
                        fitness: f,
                    });
                }
            } else {
                self.tally.rejected.fetch_add(1, Ordering::Relaxed);
            }
            records.push(HistoryRecord { accepted, ..record });
        }
        records
    }
}
