//! # Force Field Module
//!
//! Energy evaluation for cluster geometries. The search only talks to the [`backend::EnergyBackend`]
//! trait; the bundled Lennard-Jones backend is one implementation of it.
//!
//! ## Key Components
//!
//! - [`potentials`] - Pairwise potential functions and their radial derivatives
//! - [`params`] - Per-element Lennard-Jones parameters loaded from TOML
//! - [`backend`] - The backend trait and the Lennard-Jones plus Coulomb implementation
//!
//! ## Usage
//!
//! ```ignore
//! use evocluster::core::forcefield::{backend::{EnergyBackend, LennardJonesBackend}, params::ForcefieldParams};
//!
//! let params = ForcefieldParams::load(Path::new("argon.toml"))?;
//! let backend = LennardJonesBackend::new(params);
//! let energy = backend.energy(&geometry.cartesians(), geometry.bonds());
//! ```

pub mod backend;
pub mod params;
pub mod potentials;
