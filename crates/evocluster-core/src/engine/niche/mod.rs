//! Diversity buckets for the population pool.
//!
//! A [`Niche`] is an opaque string key. Nichers can be chained; the chain evaluates its members
//! in declaration order and concatenates their keys.

pub mod coulomb;
pub mod interior;

use crate::core::models::geometry::Geometry;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Niche(String);

impl Niche {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Niche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Niche {
    fn from(key: String) -> Self {
        Self(key)
    }
}

pub trait NicheComputer: Send + Sync {
    fn compute_niche(&self, geometry: &Geometry) -> Niche;
}

/// Reports which molecules of a geometry lie on its surface.
pub trait SurfaceDetector: Send + Sync {
    fn detect_surface(&self, geometry: &Geometry) -> BTreeSet<usize>;
}

#[derive(Default)]
pub struct ChainedNicher {
    nichers: Vec<Box<dyn NicheComputer>>,
}

impl ChainedNicher {
    pub fn new(nichers: Vec<Box<dyn NicheComputer>>) -> Self {
        Self { nichers }
    }

    pub fn push(&mut self, nicher: Box<dyn NicheComputer>) {
        self.nichers.push(nicher);
    }

    pub fn len(&self) -> usize {
        self.nichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nichers.is_empty()
    }
}

impl NicheComputer for ChainedNicher {
    fn compute_niche(&self, geometry: &Geometry) -> Niche {
        let key: String = self
            .nichers
            .iter()
            .map(|n| n.compute_niche(geometry).0)
            .collect();
        Niche(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::bonds::BondInfo;

    struct Fixed(&'static str);

    impl NicheComputer for Fixed {
        fn compute_niche(&self, _geometry: &Geometry) -> Niche {
            Niche::new(self.0)
        }
    }

    fn empty_geometry() -> Geometry {
        Geometry::new(0, Vec::new(), BondInfo::dense(0), None).unwrap()
    }

    #[test]
    fn chain_concatenates_in_declaration_order() {
        let g = empty_geometry();
        let ab = ChainedNicher::new(vec![Box::new(Fixed("a-")), Box::new(Fixed("b7"))]);
        let ba = ChainedNicher::new(vec![Box::new(Fixed("b7")), Box::new(Fixed("a-"))]);
        assert_eq!(ab.compute_niche(&g).as_str(), "a-b7");
        assert_eq!(ba.compute_niche(&g).as_str(), "b7a-");
        assert_ne!(ab.compute_niche(&g), ba.compute_niche(&g));
    }

    #[test]
    fn chain_is_deterministic() {
        let g = empty_geometry();
        let mut chain = ChainedNicher::default();
        chain.push(Box::new(Fixed("x")));
        chain.push(Box::new(Fixed("y")));
        assert_eq!(chain.compute_niche(&g), chain.compute_niche(&g));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn empty_chain_yields_empty_key() {
        assert_eq!(
            ChainedNicher::default().compute_niche(&empty_geometry()),
            Niche::default()
        );
    }
}
