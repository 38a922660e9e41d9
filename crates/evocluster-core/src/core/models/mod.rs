//! # Core Models Module
//!
//! Data structures describing candidate clusters and the coordinates exchanged between the
//! search operators, the validity checks and the energy backends.
//!
//! ## Key Components
//!
//! - [`element`] - Static element table with covalent radii and masses
//! - [`bonds`] - Symmetric bond-type tables in dense or sparse storage
//! - [`cartesians`] - Flattened coordinate sets with per-molecule atom counts
//! - [`molecule`] - Rigid or flexible building blocks placed by position and Euler angles
//! - [`environment`] - External atoms a cluster docks onto, with a six-gene placement genome
//! - [`geometry`] - One candidate cluster, the unit of selection in the search
//!
//! ## Usage
//!
//! ```ignore
//! use evocluster::core::models::{element::Element, geometry::Geometry, molecule::MoleculeConfig};
//!
//! let ar = Element::from_symbol("Ar")?;
//! let atom = MoleculeConfig::from_coordinates("Ar", vec![ar], &[Point3::origin()])?;
//! let geometry = Geometry::with_perceived_bonds(0, vec![atom; 13], None, 1.2)?;
//! let coordinates = geometry.cartesians();
//! ```

pub mod bonds;
pub mod cartesians;
pub mod element;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod molecule;
