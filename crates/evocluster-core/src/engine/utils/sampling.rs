use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input fitness list is empty, cannot perform sampling")]
    EmptyFitnesses,
    #[error("All weights vanished, resulting in zero total weight for sampling")]
    ZeroTotalWeight,
    #[error("Invalid beta value: {0}. Beta must be positive for Boltzmann sampling")]
    InvalidBeta(f64),
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Draws an index with probability proportional to `exp(-beta · (f - f_min))`.
///
/// Weights are taken relative to the lowest fitness, so the best entry always has weight one
/// and the total weight cannot underflow to zero for finite input.
#[instrument(level = "trace", skip_all, fields(beta))]
pub fn boltzmann_sample<R: Rng + ?Sized>(
    fitnesses: &[f64],
    beta: f64,
    rng: &mut R,
) -> Result<usize, SamplingError> {
    if fitnesses.is_empty() {
        return Err(SamplingError::EmptyFitnesses);
    }
    if !(beta > 0.0) {
        return Err(SamplingError::InvalidBeta(beta));
    }

    let min_fitness = fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
    let weights: Vec<f64> = fitnesses
        .iter()
        .map(|&f| (-(f - min_fitness) * beta).exp())
        .map(|w| if w.is_finite() { w } else { 0.0 })
        .collect();

    if weights.iter().sum::<f64>() <= f64::EPSILON {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let dist = WeightedIndex::new(&weights)?;
    Ok(dist.sample(rng))
}
