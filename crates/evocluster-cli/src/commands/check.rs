use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use evocluster::core::collision::bonds::DEFAULT_BOND_BLOW;
use evocluster::core::collision::detection::CollisionDetector;
use evocluster::core::collision::dissociation::{DissociationCriterion, DissociationDetector};
use evocluster::core::collision::info::CollisionInfo;
use evocluster::core::io::traits::MolecularFile;
use evocluster::core::io::xyz::XyzFile;
use evocluster::core::models::cartesians::Cartesians;
use evocluster::core::models::geometry::Geometry;
use evocluster::core::models::molecule::MoleculeConfig;
use evocluster::core::utils::geometry::center_of_mass;
use evocluster::engine::error::EngineError;
use nalgebra::Point3;
use tracing::{debug, info};

/// Findings for one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub atoms: usize,
    pub molecules: usize,
    /// Colliding atom pairs with their overlap, strongest first.
    pub collisions: Vec<(usize, usize, f64)>,
    pub dissociated: bool,
}

impl CheckReport {
    pub fn is_sane(&self) -> bool {
        self.collisions.is_empty() && !self.dissociated
    }
}

pub fn run(args: CheckArgs) -> Result<()> {
    let (cartes, meta) = XyzFile::read_from_path(&args.input).map_err(|e| {
        CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        }
    })?;
    debug!(comment = %meta.comment, "Structure loaded.");

    let report = inspect(
        &cartes,
        &args.molecules,
        args.collision_blow,
        args.dissociation_blow,
    )?;
    info!(
        collisions = report.collisions.len(),
        dissociated = report.dissociated,
        "Structure checked."
    );

    println!(
        "{}: {} atom(s) in {} molecule(s)",
        args.input.display(),
        report.atoms,
        report.molecules
    );
    for (a, b, strength) in &report.collisions {
        println!("  collision between atoms {a} and {b} (overlap {strength:.3} Å)");
    }
    if report.dissociated {
        println!("  cluster is dissociated");
    }
    println!(
        "{}",
        if report.is_sane() {
            "Structure is sane."
        } else {
            "Structure is NOT sane."
        }
    );
    Ok(())
}

/// Splits `cartes` into molecules of the given sizes, perceives their bonds and runs the
/// collision and connectivity checks. Empty `sizes` means one atom per molecule.
pub fn inspect(
    cartes: &Cartesians,
    sizes: &[usize],
    collision_blow: f64,
    dissociation_blow: f64,
) -> Result<CheckReport> {
    let sizes = if sizes.is_empty() {
        vec![1; cartes.atom_count()]
    } else {
        sizes.to_vec()
    };
    let total: usize = sizes.iter().sum();
    if total != cartes.atom_count() {
        return Err(CliError::Config(format!(
            "Molecule sizes add up to {total} atoms, but the file holds {}.",
            cartes.atom_count()
        )));
    }

    let mut molecules = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for (index, &size) in sizes.iter().enumerate() {
        let range = start..start + size;
        let mut molecule = MoleculeConfig::from_coordinates(
            format!("molecule-{index}"),
            cartes.elements[range.clone()].to_vec(),
            &cartes.positions[range.clone()],
        )
        .map_err(EngineError::from)?;
        let masses: Vec<f64> = molecule.elements.iter().map(|e| e.mass).collect();
        molecule.position =
            center_of_mass(&cartes.positions[range], &masses).unwrap_or_else(Point3::origin);
        molecules.push(molecule);
        start += size;
    }
    let geometry = Geometry::with_perceived_bonds(0, molecules, None, DEFAULT_BOND_BLOW)
        .map_err(EngineError::from)?;

    let placed = geometry.cartesians();
    let info = CollisionDetector::new().detect(&placed, collision_blow, geometry.bonds());
    let mut collisions: Vec<(usize, usize, f64)> = info
        .collisions()
        .iter()
        .map(|c| (c.atom_a, c.atom_b, c.strength))
        .collect();
    collisions.sort_by(|x, y| y.2.total_cmp(&x.2));

    let dissociated = DissociationDetector::new(
        DissociationCriterion::Connectivity,
        dissociation_blow,
    )
    .is_dissociated(&placed, geometry.bonds(), Some(info.distances()));

    Ok(CheckReport {
        atoms: placed.atom_count(),
        molecules: geometry.molecule_count(),
        collisions,
        dissociated,
    })
}
