//! Parallel units of work in a search run.
//!
//! Each task derives its generator from the run seed and the geometry id, does its heavy work on
//! the rayon pool (when the `parallel` feature is enabled) and hands results back in id order, so
//! the pool sees the same sequence of offers regardless of thread scheduling.

pub mod generation;
pub mod initialization;
