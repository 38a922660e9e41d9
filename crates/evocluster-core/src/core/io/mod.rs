//! Input and output of coordinates and search records.
//!
//! Coordinates are exchanged as XYZ through the [`traits::MolecularFile`] interface. Geometries
//! are persisted as XYZ followed by named property blocks, and the genealogy of a search is kept
//! as CSV.

pub mod history;
pub mod traits;
pub mod xyz;
