use super::config::SearchConfig;
use crate::core::collision::detection::CollisionDetector;
use crate::core::collision::dissociation::DissociationDetector;
use crate::core::collision::info::{CollisionInfo, SingleCollisionInfo};
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use crate::core::models::geometry::Geometry;
use tracing::trace;

/// Gatekeeper run on every candidate before it is evaluated.
///
/// A geometry is valid when its cluster has no collision, is not dissociated (if a criterion is
/// configured) and, when it carries an environment, fits onto it.
#[derive(Debug, Clone)]
pub struct GeometryValidator {
    detector: CollisionDetector,
    collision_blow: f64,
    dissociation: Option<DissociationDetector>,
}

impl GeometryValidator {
    pub fn new(collision_blow: f64, dissociation: Option<DissociationDetector>) -> Self {
        Self {
            detector: CollisionDetector::new(),
            collision_blow,
            dissociation,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.blow.collision,
            config
                .dissociation
                .map(|criterion| DissociationDetector::new(criterion, config.blow.dissociation)),
        )
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    pub fn collision_blow(&self) -> f64 {
        self.collision_blow
    }

    /// Collision and dissociation check on a bare coordinate set.
    pub fn is_sane(&self, cartes: &Cartesians, bonds: &BondInfo) -> bool {
        let mut info = SingleCollisionInfo::new(cartes.atom_count());
        self.detector
            .detect_into(cartes, self.collision_blow, bonds, &mut info);
        self.finish_check(cartes, bonds, &info)
    }

    /// Like [`Self::is_sane`], but only pairs touching atoms `[offset, endset)` are checked for
    /// collisions. The caller guarantees the remaining atoms are collision-free among
    /// themselves. Dissociation always looks at the whole set.
    pub fn is_sane_after_move(
        &self,
        cartes: &Cartesians,
        bonds: &BondInfo,
        offset: usize,
        endset: usize,
    ) -> bool {
        let mut info = SingleCollisionInfo::new(cartes.atom_count());
        self.detector
            .detect_range(cartes, self.collision_blow, bonds, offset, endset, &mut info);
        self.finish_check(cartes, bonds, &info)
    }

    fn finish_check(&self, cartes: &Cartesians, bonds: &BondInfo, info: &dyn CollisionInfo) -> bool {
        if let Some(first) = info.collisions().first() {
            trace!(a = first.atom_a, b = first.atom_b, "Rejected: collision.");
            return false;
        }
        match &self.dissociation {
            Some(dd) if dd.is_dissociated(cartes, bonds, Some(info.distances())) => {
                trace!("Rejected: dissociated.");
                false
            }
            _ => true,
        }
    }

    pub fn is_cluster_sane(&self, geometry: &Geometry) -> bool {
        self.is_sane(&geometry.cartesians(), geometry.bonds())
    }

    pub fn is_valid(&self, geometry: &Geometry) -> bool {
        let cluster = geometry.cartesians();
        if !self.is_sane(&cluster, geometry.bonds()) {
            return false;
        }
        match &geometry.environment {
            Some(env) => env.fits(&cluster, &self.detector),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collision::dissociation::DissociationCriterion;
    use crate::core::models::element::Element;
    use crate::core::models::molecule::MoleculeConfig;
    use nalgebra::Point3;

    fn argon_cluster(xs: &[f64]) -> Geometry {
        let ar = Element::from_symbol("Ar").unwrap();
        let molecules = xs
            .iter()
            .map(|&x| {
                let mut m = MoleculeConfig::from_coordinates("Ar", vec![ar], &[Point3::origin()])
                    .unwrap();
                m.position = Point3::new(x, 0.0, 0.0);
                m
            })
            .collect();
        Geometry::with_perceived_bonds(0, molecules, None, 1.2).unwrap()
    }

    fn validator() -> GeometryValidator {
        GeometryValidator::new(
            1.2,
            Some(DissociationDetector::new(DissociationCriterion::Connectivity, 3.0)),
        )
    }

    #[test]
    fn well_spaced_cluster_is_valid() {
        assert!(validator().is_valid(&argon_cluster(&[0.0, 3.8, 7.6])));
    }

    #[test]
    fn overlapping_atoms_are_rejected() {
        assert!(!validator().is_valid(&argon_cluster(&[0.0, 1.0])));
    }

    #[test]
    fn range_check_only_sees_pairs_touching_the_range() {
        // atoms 0 and 1 overlap; atom 2 sits clear of both
        let g = argon_cluster(&[0.0, 1.0, 4.8]);
        let cartes = g.cartesians();
        let v = GeometryValidator::new(1.2, None);
        assert!(!v.is_sane(&cartes, g.bonds()));
        assert!(v.is_sane_after_move(&cartes, g.bonds(), 2, 3));
        assert!(!v.is_sane_after_move(&cartes, g.bonds(), 1, 3));
    }

    #[test]
    fn range_check_still_sees_dissociation() {
        let g = argon_cluster(&[0.0, 3.8, 40.0]);
        assert!(!validator().is_sane_after_move(&g.cartesians(), g.bonds(), 2, 3));
        let chain = argon_cluster(&[0.0, 3.8, 7.6]);
        assert!(validator().is_sane_after_move(&chain.cartesians(), chain.bonds(), 2, 3));
    }

    #[test]
    fn distant_fragment_is_rejected_only_with_criterion() {
        let g = argon_cluster(&[0.0, 3.8, 40.0]);
        assert!(!validator().is_cluster_sane(&g));
        assert!(GeometryValidator::new(1.2, None).is_cluster_sane(&g));
    }
}
