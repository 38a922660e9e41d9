//! Local optimization behind a pluggable trait, plus the adaptor that turns it into a fitness.

pub mod adaptor;
pub mod fire;

use crate::core::forcefield::backend::EnergyBackend;
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use crate::core::models::geometry::Geometry;
use crate::core::models::molecule::MoleculeConfig;

pub trait LocalOptimizer: Send + Sync {
    fn optimize_molecule(&self, molecule: MoleculeConfig) -> MoleculeConfig;

    /// Relaxes the geometry and sets its fitness.
    fn optimize_geometry(&self, geometry: Geometry) -> Geometry;

    /// Relaxes a bare coordinate set and returns it with its final energy.
    ///
    /// `constraints` holds one flag per atom; what a set flag means is up to the implementation.
    /// The coordinates are consumed, so callers that still need the input must pass a clone.
    fn refine_coordinates(
        &self,
        id: u64,
        cartes: Cartesians,
        constraints: &[bool],
        bonds: &BondInfo,
    ) -> (Cartesians, f64);

    fn molecule_optimizations(&self) -> u64;

    fn geometry_optimizations(&self) -> u64;

    fn backend(&self) -> &dyn EnergyBackend;
}
