//! Fixtures shared by unit tests across modules.

use crate::core::forcefield::backend::LennardJonesBackend;
use crate::core::forcefield::params::{ForcefieldParams, LennardJonesParam};
use crate::core::models::element::Element;
use crate::core::models::geometry::Geometry;
use crate::core::models::molecule::MoleculeConfig;
use nalgebra::Point3;

pub fn f64_approx_equal(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

pub fn argon_params() -> ForcefieldParams {
    let mut params = ForcefieldParams::default();
    params.lj.insert(
        "Ar".into(),
        LennardJonesParam {
            radius: 3.82,
            well_depth: 0.996,
        },
    );
    params
}

pub fn argon_backend() -> LennardJonesBackend {
    LennardJonesBackend::new(argon_params())
}

pub fn argon_atom() -> MoleculeConfig {
    let ar = Element::from_symbol("Ar").unwrap();
    MoleculeConfig::from_coordinates("Ar", vec![ar], &[Point3::origin()]).unwrap()
}

/// One argon atom per molecule at the given positions.
pub fn argon_cluster(positions: &[Point3<f64>]) -> Geometry {
    let molecules = positions
        .iter()
        .map(|&p| {
            let mut m = argon_atom();
            m.position = p;
            m
        })
        .collect();
    Geometry::with_perceived_bonds(0, molecules, None, 1.2).unwrap()
}

/// Argon atoms on a line with the given spacing.
pub fn argon_line(count: usize, spacing: f64) -> Geometry {
    let positions: Vec<_> = (0..count)
        .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
        .collect();
    argon_cluster(&positions)
}

pub fn water() -> MoleculeConfig {
    let o = Element::from_symbol("O").unwrap();
    let h = Element::from_symbol("H").unwrap();
    MoleculeConfig::from_coordinates(
        "water",
        vec![o, h, h],
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.757, 0.586, 0.0),
            Point3::new(-0.757, 0.586, 0.0),
        ],
    )
    .unwrap()
}

pub fn water_cluster(positions: &[Point3<f64>]) -> Geometry {
    let molecules = positions
        .iter()
        .map(|&p| {
            let mut m = water();
            m.position = p;
            m
        })
        .collect();
    Geometry::with_perceived_bonds(0, molecules, None, 1.2).unwrap()
}
