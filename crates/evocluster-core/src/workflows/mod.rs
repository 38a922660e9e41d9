//! # Workflows Module
//!
//! End-to-end procedures built from the engine. These are the entry points for users of the
//! library.
//!
//! - **Search Workflow** ([`search`]) - Builds the initial population, runs the global
//!   optimization in batches and returns the best geometries with their genealogy.

pub mod search;
