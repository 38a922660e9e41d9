use super::darwin::GlobalOptimization;
use crate::core::models::geometry::Geometry;
use rand::{Rng, RngCore};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DispatchError {
    #[error("Got {strategies} strategies but {percentages} percentages")]
    LengthMismatch {
        strategies: usize,
        percentages: usize,
    },
    #[error("At least one strategy is required")]
    Empty,
    #[error("Strategy percentages must sum to 100, got {sum}")]
    BadSum { sum: u32 },
}

/// Picks one of several strategies per call, with fixed integer percentages.
pub struct WeightedDispatcher {
    strategies: Vec<Box<dyn GlobalOptimization>>,
    /// Cumulative percentages; the last entry is always 100.
    boundaries: Vec<u32>,
}

impl std::fmt::Debug for WeightedDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedDispatcher")
            .field("strategies", &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("boundaries", &self.boundaries)
            .finish()
    }
}

impl WeightedDispatcher {
    pub fn new(
        strategies: Vec<Box<dyn GlobalOptimization>>,
        percentages: &[u32],
    ) -> Result<Self, DispatchError> {
        if strategies.len() != percentages.len() {
            return Err(DispatchError::LengthMismatch {
                strategies: strategies.len(),
                percentages: percentages.len(),
            });
        }
        if strategies.is_empty() {
            return Err(DispatchError::Empty);
        }
        let boundaries: Vec<u32> = percentages
            .iter()
            .scan(0u32, |acc, &p| {
                *acc = acc.saturating_add(p);
                Some(*acc)
            })
            .collect();
        let sum = boundaries.last().copied().unwrap_or(0);
        if sum != 100 {
            return Err(DispatchError::BadSum { sum });
        }
        Ok(Self {
            strategies,
            boundaries,
        })
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Draws `u` in `[1, 100]` and returns the first strategy whose boundary reaches it.
    pub fn select(&self, rng: &mut dyn RngCore) -> usize {
        let draw = rng.gen_range(1..=100);
        self.boundaries
            .iter()
            .position(|&b| b >= draw)
            .unwrap_or(self.boundaries.len() - 1)
    }
}

impl GlobalOptimization for WeightedDispatcher {
    fn global_optimization(
        &self,
        future_id: u64,
        mother: &Geometry,
        father: &Geometry,
        rng: &mut dyn RngCore,
    ) -> Option<Geometry> {
        let chosen = self.select(rng);
        trace!(future_id, strategy = %self.strategies[chosen].name(), "Strategy selected.");
        self.strategies[chosen].global_optimization(future_id, mother, father, rng)
    }

    fn name(&self) -> String {
        let parts: Vec<String> = self
            .strategies
            .iter()
            .zip(&self.boundaries)
            .scan(0, |prev, (s, &b)| {
                let share = b - *prev;
                *prev = b;
                Some(format!("{}:{share}", s.name()))
            })
            .collect();
        format!("dispatch[{}]", parts.join(","))
    }
}
