use super::config::PoolConfig;
use super::niche::Niche;
use super::state::PoolEntry;
use super::utils::sampling::boltzmann_sample;
use crate::core::models::geometry::Geometry;
use rand::RngCore;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

pub trait PopulationPool: Send + Sync {
    /// Offers an evaluated candidate. Returns `false` when it is rejected.
    fn offer(&self, candidate: Geometry, niche: Niche) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn best(&self) -> Option<PoolEntry>;

    /// Snapshot of all members, best first.
    fn entries(&self) -> Vec<PoolEntry>;

    /// Two distinct members to serve as mother and father.
    fn select_parents(&self, rng: &mut dyn RngCore) -> Option<(Geometry, Geometry)>;
}

/// In-memory pool kept sorted by fitness, with a cap on members per niche.
///
/// A candidate is rejected when it is unevaluated, has a non-finite fitness, lies within the
/// duplicate tolerance of a member, or is not better than the member it would displace.
pub struct NichedPool {
    members: Mutex<Vec<PoolEntry>>,
    capacity: usize,
    max_per_niche: usize,
    duplicate_tolerance: f64,
    selection_beta: f64,
}

impl NichedPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            members: Mutex::new(Vec::with_capacity(config.size)),
            capacity: config.size,
            max_per_niche: config.max_per_niche,
            duplicate_tolerance: config.duplicate_tolerance,
            selection_beta: config.selection_beta,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PoolEntry>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index of the worst member, optionally restricted to one niche.
    fn worst_index(members: &[PoolEntry], niche: Option<&Niche>) -> Option<usize> {
        members
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| niche.is_none_or(|n| &e.niche == n))
            .map(|(i, _)| i)
    }
}

impl PopulationPool for NichedPool {
    fn offer(&self, candidate: Geometry, niche: Niche) -> bool {
        let Some(fitness) = candidate.fitness.filter(|f| f.is_finite()) else {
            trace!(id = candidate.id, "Rejected: no finite fitness.");
            return false;
        };
        let mut members = self.lock();

        if members
            .iter()
            .any(|e| (e.fitness - fitness).abs() <= self.duplicate_tolerance)
        {
            trace!(id = candidate.id, fitness, "Rejected: duplicate.");
            return false;
        }

        let in_niche = members.iter().filter(|e| e.niche == niche).count();
        let displaced = if in_niche >= self.max_per_niche {
            Self::worst_index(&members, Some(&niche))
        } else if members.len() >= self.capacity {
            Self::worst_index(&members, None)
        } else {
            None
        };
        if let Some(index) = displaced {
            if members[index].fitness <= fitness {
                trace!(id = candidate.id, fitness, %niche, "Rejected: not better than displaced member.");
                return false;
            }
            members.remove(index);
        } else if members.len() >= self.capacity {
            warn!("Pool is full but no member could be displaced.");
            return false;
        }

        let position = members.partition_point(|e| e.fitness < fitness);
        trace!(id = candidate.id, fitness, %niche, rank = position, "Accepted into pool.");
        members.insert(
            position,
            PoolEntry {
                fitness,
                niche,
                geometry: candidate,
            },
        );
        true
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn best(&self) -> Option<PoolEntry> {
        self.lock().first().cloned()
    }

    fn entries(&self) -> Vec<PoolEntry> {
        self.lock().clone()
    }

    fn select_parents(&self, rng: &mut dyn RngCore) -> Option<(Geometry, Geometry)> {
        let members = self.lock();
        if members.len() < 2 {
            return None;
        }
        let fitnesses: Vec<f64> = members.iter().map(|e| e.fitness).collect();
        let mother = boltzmann_sample(&fitnesses, self.selection_beta, rng).ok()?;

        let mut rest = fitnesses;
        rest.remove(mother);
        let mut father = boltzmann_sample(&rest, self.selection_beta, rng).ok()?;
        if father >= mother {
            father += 1;
        }
        Some((
            members[mother].geometry.clone(),
            members[father].geometry.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::argon_line;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(size: usize, max_per_niche: usize) -> NichedPool {
        NichedPool::new(&PoolConfig {
            size,
            max_per_niche,
            duplicate_tolerance: 1e-6,
            selection_beta: 1.0,
        })
    }

    fn candidate(id: u64, fitness: f64) -> Geometry {
        let mut g = argon_line(2, 4.0);
        g.id = id;
        g.fitness = Some(fitness);
        g
    }

    #[test]
    fn keeps_members_sorted_best_first() {
        let pool = pool(10, 10);
        for (id, f) in [(0, -1.0), (1, -3.0), (2, -2.0)] {
            assert!(pool.offer(candidate(id, f), Niche::new("a")));
        }
        let fitnesses: Vec<f64> = pool.entries().iter().map(|e| e.fitness).collect();
        assert_eq!(fitnesses, vec![-3.0, -2.0, -1.0]);
        assert_eq!(pool.best().unwrap().geometry.id, 1);
    }

    #[test]
    fn rejects_unevaluated_and_duplicates() {
        let pool = pool(10, 10);
        let mut g = candidate(0, 0.0);
        g.fitness = None;
        assert!(!pool.offer(g, Niche::default()));
        assert!(!pool.offer(candidate(1, f64::NAN), Niche::default()));
        assert!(pool.offer(candidate(2, -1.0), Niche::default()));
        assert!(!pool.offer(candidate(3, -1.0 + 1e-9), Niche::default()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn full_pool_replaces_worst_only_when_better() {
        let pool = pool(2, 10);
        assert!(pool.offer(candidate(0, -1.0), Niche::new("a")));
        assert!(pool.offer(candidate(1, -2.0), Niche::new("b")));
        assert!(!pool.offer(candidate(2, -0.5), Niche::new("c")));
        assert!(pool.offer(candidate(3, -1.5), Niche::new("c")));
        let ids: Vec<u64> = pool.entries().iter().map(|e| e.geometry.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn crowded_niche_displaces_its_own_worst() {
        let pool = pool(10, 2);
        assert!(pool.offer(candidate(0, -1.0), Niche::new("x")));
        assert!(pool.offer(candidate(1, -2.0), Niche::new("x")));
        assert!(pool.offer(candidate(2, -0.1), Niche::new("y")));
        assert!(!pool.offer(candidate(3, -0.5), Niche::new("x")));
        assert!(pool.offer(candidate(4, -3.0), Niche::new("x")));
        let ids: Vec<u64> = pool.entries().iter().map(|e| e.geometry.id).collect();
        assert_eq!(ids, vec![4, 1, 2]);
    }

    #[test]
    fn parents_are_distinct_members() {
        let pool = pool(10, 10);
        assert!(pool.select_parents(&mut StdRng::seed_from_u64(0)).is_none());
        for id in 0..5 {
            pool.offer(candidate(id, -(id as f64)), Niche::default());
        }
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..100 {
            let (mother, father) = pool.select_parents(&mut rng).unwrap();
            assert_ne!(mother.id, father.id);
        }
    }
}
