use super::operators::{Crossover, Mutation};
use super::optimizer::adaptor::FitnessFunction;
use super::validation::GeometryValidator;
use crate::core::models::geometry::Geometry;
use rand::{Rng, RngCore};
use std::sync::Arc;
use tracing::{debug, trace};

/// One way of turning two parents into a single new, evaluated candidate.
pub trait GlobalOptimization: Send + Sync {
    /// Returns `None` when no valid child could be produced.
    fn global_optimization(
        &self,
        future_id: u64,
        mother: &Geometry,
        father: &Geometry,
        rng: &mut dyn RngCore,
    ) -> Option<Geometry>;

    fn name(&self) -> String;
}

/// Crossover, optional mutation, validation and local optimization, keeping the better child.
///
/// Children from a mutation that [returns optimized](Mutation::returns_optimized) geometries
/// keep the fitness the mutation assigned and skip the local optimization.
pub struct GeneticStrategy {
    crossover: Box<dyn Crossover>,
    mutation: Box<dyn Mutation>,
    crossover_probability: f64,
    mutation_probability: f64,
    max_tries: usize,
    validator: GeometryValidator,
    fitness: Arc<dyn FitnessFunction>,
}

impl GeneticStrategy {
    pub fn new(
        crossover: Box<dyn Crossover>,
        mutation: Box<dyn Mutation>,
        crossover_probability: f64,
        mutation_probability: f64,
        max_tries: usize,
        validator: GeometryValidator,
        fitness: Arc<dyn FitnessFunction>,
    ) -> Self {
        Self {
            crossover,
            mutation,
            crossover_probability,
            mutation_probability,
            max_tries: max_tries.max(1),
            validator,
            fitness,
        }
    }

    fn make_children(
        &self,
        future_id: u64,
        mother: &Geometry,
        father: &Geometry,
        rng: &mut dyn RngCore,
    ) -> (Geometry, Geometry) {
        if rng.r#gen::<f64>() < self.crossover_probability {
            match self.crossover.crossover(mother, father, future_id, rng) {
                Ok(children) => return children,
                Err(e) => debug!(error = %e, "Crossover skipped."),
            }
        }
        let mut child1 = mother.clone();
        let mut child2 = father.clone();
        child1.rebirth(future_id, mother.id, father.id);
        child2.rebirth(future_id, mother.id, father.id);
        (child1, child2)
    }
}

impl GlobalOptimization for GeneticStrategy {
    fn global_optimization(
        &self,
        future_id: u64,
        mother: &Geometry,
        father: &Geometry,
        rng: &mut dyn RngCore,
    ) -> Option<Geometry> {
        for attempt in 1..=self.max_tries {
            let (child1, child2) = self.make_children(future_id, mother, father, rng);
            // (child, already locally optimized)
            let candidates: Vec<(Geometry, bool)> = [child1, child2]
                .into_iter()
                .map(|child| {
                    if rng.r#gen::<f64>() < self.mutation_probability {
                        let mutated = self.mutation.mutate(&child, rng);
                        let optimized =
                            self.mutation.returns_optimized() && mutated.fitness.is_some();
                        (mutated, optimized)
                    } else {
                        (child, false)
                    }
                })
                .filter(|(child, _)| self.validator.is_valid(child))
                .collect();
            if candidates.is_empty() {
                trace!(future_id, attempt, "Both children invalid; retrying.");
                continue;
            }

            let best = candidates
                .into_iter()
                .map(|(child, optimized)| {
                    if optimized {
                        child
                    } else {
                        self.fitness.fitness(child, false)
                    }
                })
                .filter(|child| child.fitness.is_some_and(f64::is_finite))
                .min_by(|a, b| fitness_of(a).total_cmp(&fitness_of(b)));
            if best.is_some() {
                return best;
            }
        }
        debug!(future_id, tries = self.max_tries, "No valid child produced.");
        None
    }

    fn name(&self) -> String {
        format!("{}+{}", self.crossover.name(), self.mutation.name())
    }
}

fn fitness_of(geometry: &Geometry) -> f64 {
    geometry.fitness.unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::operators::crossover::OrientationCrossover;
    use crate::engine::operators::mutation::{MonteCarloMode, MonteCarloMutation};
    use crate::engine::optimizer::adaptor::FitnessAdaptor;
    use crate::engine::optimizer::fire::{FireOptimizer, FireParams};
    use crate::testing::{argon_backend, argon_cluster, argon_line};
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn strategy(validator: GeometryValidator) -> GeneticStrategy {
        let optimizer = Arc::new(FireOptimizer::new(argon_backend(), FireParams::default()));
        GeneticStrategy::new(
            Box::new(OrientationCrossover::new(1)),
            Box::new(MonteCarloMutation::new(MonteCarloMode::AllAtoms, 0.3).unwrap()),
            1.0,
            0.5,
            3,
            validator,
            Arc::new(FitnessAdaptor::new(optimizer)),
        )
    }

    #[test]
    fn produces_evaluated_child_with_lineage() {
        let mut mother = argon_line(3, 4.0);
        let mut father = argon_cluster(&[
            Point3::origin(),
            Point3::new(3.9, 0.0, 0.0),
            Point3::new(1.9, 3.4, 0.0),
        ]);
        mother.id = 1;
        father.id = 2;
        let mut rng = StdRng::seed_from_u64(4);
        let child = strategy(GeometryValidator::new(1.2, None))
            .global_optimization(10, &mother, &father, &mut rng)
            .unwrap();
        assert_eq!(child.id, 10);
        assert_eq!((child.mother, child.father), (Some(1), Some(2)));
        assert!(child.fitness.unwrap() < 0.0);
    }

    #[test]
    fn invalid_parents_yield_none() {
        // every child collides
        let mother = argon_line(3, 0.5);
        let father = argon_line(3, 0.5);
        let mut rng = StdRng::seed_from_u64(4);
        let result = strategy(GeometryValidator::new(1.2, None))
            .global_optimization(10, &mother, &father, &mut rng);
        assert!(result.is_none());
    }

    /// Marks its output as optimized with a fixed fitness.
    struct PreScored {
        optimized: bool,
    }

    impl Mutation for PreScored {
        fn mutate(&self, parent: &Geometry, _rng: &mut dyn RngCore) -> Geometry {
            let mut child = parent.clone();
            child.fitness = Some(-1.0);
            child
        }

        fn name(&self) -> &'static str {
            "pre-scored"
        }

        fn returns_optimized(&self) -> bool {
            self.optimized
        }
    }

    #[derive(Default)]
    struct CountingFitness {
        calls: AtomicUsize,
    }

    impl FitnessFunction for CountingFitness {
        fn fitness(&self, mut geometry: Geometry, _force: bool) -> Geometry {
            self.calls.fetch_add(1, Ordering::Relaxed);
            geometry.fitness = Some(-2.0);
            geometry
        }
    }

    fn pre_scored_run(optimized: bool) -> (Geometry, usize) {
        let fitness = Arc::new(CountingFitness::default());
        let strategy = GeneticStrategy::new(
            Box::new(OrientationCrossover::new(1)),
            Box::new(PreScored { optimized }),
            1.0,
            1.0,
            3,
            GeometryValidator::new(1.2, None),
            fitness.clone(),
        );
        let mother = argon_line(3, 4.0);
        let father = argon_line(3, 4.2);
        let child = strategy
            .global_optimization(10, &mother, &father, &mut StdRng::seed_from_u64(9))
            .unwrap();
        (child, fitness.calls.load(Ordering::Relaxed))
    }

    #[test]
    fn optimized_mutation_children_are_not_evaluated_again() {
        let (child, calls) = pre_scored_run(true);
        assert_eq!(calls, 0);
        assert_eq!(child.fitness, Some(-1.0));
    }

    #[test]
    fn plain_mutation_children_are_evaluated() {
        let (child, calls) = pre_scored_run(false);
        assert_eq!(calls, 2);
        assert_eq!(child.fitness, Some(-2.0));
    }

    #[test]
    fn name_combines_operators() {
        assert_eq!(
            strategy(GeometryValidator::new(1.2, None)).name(),
            "orientation+monte-carlo"
        );
    }
}
