//! # Engine Module
//!
//! The stateful half of the library: the genetic operators, the population pool and the
//! machinery that runs them in parallel while keeping a seeded search reproducible.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Search parameters, operator settings and their builder
//! - **Operators** ([`operators`]) - Crossovers, mutations and initializers
//! - **Local Optimization** ([`optimizer`]) - FIRE relaxation, heat pulses and the fitness adaptor
//! - **Strategies** ([`darwin`], [`dispatch`]) - Crossover-mutation cycles and their weighted mix
//! - **Population** ([`pool`], [`niche`]) - The niched pool and the niche classifiers
//! - **Validity** ([`validation`]) - Collision, dissociation and environment checks in one place
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Execution Model
//!
//! A search is split into tasks. Every task draws from its own generator, derived from the run
//! seed and the id of the geometry it produces, and its results are offered to the pool in id
//! order. Thread count and scheduling therefore never change the outcome of a seeded run.

pub mod components;
pub mod config;
pub(crate) mod context;
pub mod darwin;
pub mod dispatch;
pub mod error;
pub mod niche;
pub mod operators;
pub mod optimizer;
pub mod pool;
pub mod progress;
pub mod state;
pub(crate) mod tasks;
pub(crate) mod utils;
pub mod validation;
