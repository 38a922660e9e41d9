//! # evocluster
//!
//! Genetic-algorithm global optimization of molecular cluster geometries.
//!
//! A cluster is a set of rigid or flexible molecules, optionally docked onto a fixed environment.
//! Candidates are built by crossover and mutation, relaxed by a local optimizer, classified into
//! niches and kept in a bounded pool that steers the next generation.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Geometry`, `MoleculeConfig`,
//!   `Environment`), validity checks, placement regions, energy backends and file I/O.
//!
//! - **[`engine`]: The Logic Core.** Operators, local optimizers, the strategy dispatcher, the
//!   niched population pool and the parallel tasks that drive them.
//!
//! - **[`workflows`]: The Public API.** Complete searches that tie `core` and `engine` together.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
