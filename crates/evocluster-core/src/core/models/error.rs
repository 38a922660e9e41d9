use super::element::UnknownElement;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Molecule '{species}' is marked both constricted and flexible")]
    ConstrictedAndFlexible { species: String },

    #[error("Molecule '{species}' has {atoms} atoms but {coordinates} coordinates")]
    AtomCountMismatch {
        species: String,
        atoms: usize,
        coordinates: usize,
    },

    #[error("Molecule '{species}' has no atoms")]
    EmptyMolecule { species: String },

    #[error("Bond table covers {bonds} atoms but the geometry has {atoms}")]
    BondTableSize { bonds: usize, atoms: usize },

    #[error("Geometry declares {declared} molecules but {actual} were supplied")]
    ParticleCount { declared: usize, actual: usize },

    #[error(transparent)]
    Element(#[from] UnknownElement),
}
