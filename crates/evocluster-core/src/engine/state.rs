use super::niche::Niche;
use crate::core::models::geometry::Geometry;
use std::cmp::Ordering;

/// An evaluated pool member.
///
/// Ordering is reversed on fitness: the entry with the *lower* fitness compares greater, so a
/// max-heap or a descending sort yields the best geometry first.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub fitness: f64,
    pub niche: Niche,
    pub geometry: Geometry,
}

impl PartialEq for PoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fitness == other.fitness
    }
}
impl Eq for PoolEntry {}

impl PartialOrd for PoolEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.fitness.total_cmp(&self.fitness)
    }
}

/// Counters collected over one search run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    pub fitness_evaluations: u64,
    pub local_optimizations: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Tasks that produced no candidate, e.g. because every try was invalid.
    pub failed: u64,
}
