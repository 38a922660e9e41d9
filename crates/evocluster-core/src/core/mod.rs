//! # Core Module
//!
//! Stateless building blocks of the cluster search: the data models, the geometric validity
//! checks, the spatial regions used for placement, the energy backends and file I/O.
//!
//! ## Architecture
//!
//! - **Cluster Representation** ([`models`]) - Elements, molecules, geometries, environments and bonds
//! - **Validity Checks** ([`collision`]) - Collision, dissociation and bond perception
//! - **Placement Regions** ([`space`]) - Sphere, orbit-shell and half-sphere samplers
//! - **Energy Calculations** ([`forcefield`]) - Pairwise potentials and pluggable energy backends
//! - **File I/O** ([`io`]) - XYZ coordinates, property blocks and genealogy records
//! - **Math Helpers** ([`utils`]) - Euler rotations, alignment and random draws
//!
//! Nothing in this layer holds global state. Every stochastic operation takes its random source
//! as an argument, so a search seeded once per run is reproducible.

pub mod collision;
pub mod forcefield;
pub mod io;
pub mod models;
pub mod space;
pub mod utils;
