use super::info::DistanceCache;
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default slack for the connectivity criterion.
pub const DEFAULT_DISSOCIATION_BLOW: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DissociationCriterion {
    /// The cluster must form one connected graph, where atoms are adjacent when
    /// `dist <= blow · (r_a + r_b)`.
    #[default]
    Connectivity,
    /// No bonded pair may be stretched beyond `blow · (r_a + r_b)`.
    BondStretch,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid dissociation criterion: '{0}'")]
pub struct ParseCriterionError(String);

impl FromStr for DissociationCriterion {
    type Err = ParseCriterionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "connectivity" | "dfs" => Ok(Self::Connectivity),
            "bond-stretch" | "bonds" => Ok(Self::BondStretch),
            _ => Err(ParseCriterionError(s.to_string())),
        }
    }
}

impl fmt::Display for DissociationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connectivity => "connectivity",
            Self::BondStretch => "bond-stretch",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DissociationDetector {
    pub criterion: DissociationCriterion,
    pub blow: f64,
}

impl DissociationDetector {
    pub fn new(criterion: DissociationCriterion, blow: f64) -> Self {
        Self { criterion, blow }
    }

    /// Uses `cache` when it holds a complete scan of `cartes`, otherwise computes distances.
    pub fn is_dissociated(
        &self,
        cartes: &Cartesians,
        bonds: &BondInfo,
        cache: Option<&DistanceCache>,
    ) -> bool {
        let n = cartes.atom_count();
        let cache = cache.filter(|c| c.is_complete() && c.atom_count() == n);
        let distance = |a: usize, b: usize| match cache {
            Some(c) => c.get(a, b),
            None => (cartes.positions[a] - cartes.positions[b]).norm(),
        };
        match self.criterion {
            DissociationCriterion::Connectivity => !self.is_connected(cartes, distance),
            DissociationCriterion::BondStretch => bonds.bonded_pairs().iter().any(|&(a, b, _)| {
                distance(a, b) > self.blow * (cartes.radius(a) + cartes.radius(b))
            }),
        }
    }

    fn is_connected(&self, cartes: &Cartesians, distance: impl Fn(usize, usize) -> f64) -> bool {
        let n = cartes.atom_count();
        if n <= 1 {
            return true;
        }
        let mut visited = vec![false; n];
        let mut stack = vec![0usize];
        visited[0] = true;
        let mut reached = 1;

        while let Some(a) = stack.pop() {
            for b in 0..n {
                if visited[b] {
                    continue;
                }
                if distance(a, b) <= self.blow * (cartes.radius(a) + cartes.radius(b)) {
                    visited[b] = true;
                    reached += 1;
                    stack.push(b);
                }
            }
        }
        reached == n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collision::detection::CollisionDetector;
    use crate::core::collision::info::CollisionInfo;
    use crate::core::models::bonds::BondType;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn argon_line(xs: &[f64]) -> Cartesians {
        let ar = Element::from_symbol("Ar").unwrap();
        Cartesians {
            positions: xs.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect(),
            elements: vec![ar; xs.len()],
            atoms_per_molecule: vec![1; xs.len()],
            charges: vec![0.0; xs.len()],
            spins: vec![0; xs.len()],
        }
    }

    #[test]
    fn chain_within_reach_is_connected() {
        // each neighbour within 3 * 2.12 Å
        let cartes = argon_line(&[0.0, 4.0, 8.0, 12.0]);
        let detector = DissociationDetector::new(DissociationCriterion::Connectivity, 3.0);
        assert!(!detector.is_dissociated(&cartes, &BondInfo::dense(4), None));
    }

    #[test]
    fn distant_fragment_is_dissociated() {
        let cartes = argon_line(&[0.0, 4.0, 50.0]);
        let detector = DissociationDetector::new(DissociationCriterion::Connectivity, 3.0);
        assert!(detector.is_dissociated(&cartes, &BondInfo::dense(3), None));
    }

    #[test]
    fn complete_cache_gives_same_answer() {
        let cartes = argon_line(&[0.0, 4.0, 50.0]);
        let bonds = BondInfo::dense(3);
        let info = CollisionDetector::new().detect(&cartes, 1.0, &bonds);
        let detector = DissociationDetector::new(DissociationCriterion::Connectivity, 3.0);
        assert!(detector.is_dissociated(&cartes, &bonds, Some(info.distances())));
    }

    #[test]
    fn stretched_bond_is_dissociated() {
        let cartes = argon_line(&[0.0, 5.0]);
        let mut bonds = BondInfo::dense(2);
        bonds.set_bond(0, 1, BondType::Single);
        let tight = DissociationDetector::new(DissociationCriterion::BondStretch, 1.0);
        let loose = DissociationDetector::new(DissociationCriterion::BondStretch, 3.0);
        assert!(tight.is_dissociated(&cartes, &bonds, None));
        assert!(!loose.is_dissociated(&cartes, &bonds, None));
    }

    #[test]
    fn single_atom_is_never_dissociated() {
        let cartes = argon_line(&[0.0]);
        let detector = DissociationDetector::new(DissociationCriterion::Connectivity, 0.1);
        assert!(!detector.is_dissociated(&cartes, &BondInfo::dense(1), None));
    }

    #[test]
    fn criterion_parses_and_displays() {
        assert_eq!(
            "Connectivity".parse::<DissociationCriterion>().unwrap(),
            DissociationCriterion::Connectivity
        );
        assert_eq!(DissociationCriterion::BondStretch.to_string(), "bond-stretch");
        assert!("warshall".parse::<DissociationCriterion>().is_err());
    }
}
