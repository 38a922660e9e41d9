use super::info::{CollisionInfo, MultiCollisionInfo};
use crate::core::models::bonds::BondInfo;
use crate::core::models::cartesians::Cartesians;
use tracing::trace;

/// Pairwise collision detection over covalent radii.
///
/// Two atoms collide when they are not bonded and `dist < blow · (r_a + r_b)`. The detector is
/// stateless; the distance cache lives in the [`CollisionInfo`] the caller passes in, so a
/// worker can reuse one record across many checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionDetector;

impl CollisionDetector {
    pub fn new() -> Self {
        Self
    }

    /// Full scan returning every collision.
    pub fn detect(&self, cartes: &Cartesians, blow: f64, bonds: &BondInfo) -> MultiCollisionInfo {
        let mut info = MultiCollisionInfo::new(cartes.atom_count());
        self.detect_into(cartes, blow, bonds, &mut info);
        info
    }

    /// Full scan into a reusable record.
    ///
    /// The scan stops as soon as the record is saturated, leaving the distance cache incomplete.
    /// Otherwise every pair is visited and the cache is marked complete.
    pub fn detect_into(
        &self,
        cartes: &Cartesians,
        blow: f64,
        bonds: &BondInfo,
        info: &mut dyn CollisionInfo,
    ) {
        check_sizes(cartes, bonds);
        let n = cartes.atom_count();
        info.resize_and_clear(n);

        for a in 0..n {
            for b in (a + 1)..n {
                let dist = (cartes.positions[a] - cartes.positions[b]).norm();
                info.distances_mut().set(a, b, dist);
                if let Some(strength) = overlap(cartes, a, b, dist, blow, bonds) {
                    if !info.report_collision(a, b, strength) || info.is_saturated() {
                        trace!(a, b, "Collision record saturated; scan stopped.");
                        return;
                    }
                }
            }
        }
        info.distances_mut().mark_complete();
    }

    /// Checks only pairs with at least one atom in `[offset, endset)` against the whole set.
    ///
    /// Intended for use after a localized move. Only the scanned pairs get cache entries, so the
    /// cache is left incomplete unless the range covers every atom. Stops early like
    /// [`Self::detect_into`].
    pub fn detect_range(
        &self,
        cartes: &Cartesians,
        blow: f64,
        bonds: &BondInfo,
        offset: usize,
        endset: usize,
        info: &mut dyn CollisionInfo,
    ) {
        check_sizes(cartes, bonds);
        let n = cartes.atom_count();
        assert!(
            offset <= endset && endset <= n,
            "invalid atom range {offset}..{endset} for {n} atoms"
        );
        info.resize_and_clear(n);

        for a in offset..endset {
            for b in 0..n {
                // pairs inside the range are visited once, with a < b
                if b == a || (b >= offset && b < endset && b < a) {
                    continue;
                }
                let dist = (cartes.positions[a] - cartes.positions[b]).norm();
                info.distances_mut().set(a, b, dist);
                if let Some(strength) = overlap(cartes, a, b, dist, blow, bonds) {
                    if !info.report_collision(a.min(b), a.max(b), strength) || info.is_saturated()
                    {
                        return;
                    }
                }
            }
        }
        if offset == 0 && endset == n {
            info.distances_mut().mark_complete();
        }
    }

    /// Yes/no check that stops at the first collision and keeps no distances.
    pub fn has_collision(&self, cartes: &Cartesians, blow: f64, bonds: &BondInfo) -> bool {
        check_sizes(cartes, bonds);
        let n = cartes.atom_count();
        for a in 0..n {
            for b in (a + 1)..n {
                let dist = (cartes.positions[a] - cartes.positions[b]).norm();
                if overlap(cartes, a, b, dist, blow, bonds).is_some() {
                    trace!(a, b, dist, "First collision found.");
                    return true;
                }
            }
        }
        false
    }
}

fn check_sizes(cartes: &Cartesians, bonds: &BondInfo) {
    assert_eq!(
        bonds.atom_count(),
        cartes.atom_count(),
        "bond table size does not match atom count"
    );
}

#[inline]
fn overlap(
    cartes: &Cartesians,
    a: usize,
    b: usize,
    dist: f64,
    blow: f64,
    bonds: &BondInfo,
) -> Option<f64> {
    let limit = blow * (cartes.radius(a) + cartes.radius(b));
    (dist < limit && !bonds.has_bond(a, b)).then_some(limit - dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collision::info::SingleCollisionInfo;
    use crate::core::models::bonds::BondType;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn neon_chain(xs: &[f64]) -> Cartesians {
        let ne = Element::from_symbol("Ne").unwrap();
        Cartesians {
            positions: xs.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect(),
            elements: vec![ne; xs.len()],
            atoms_per_molecule: vec![1; xs.len()],
            charges: vec![0.0; xs.len()],
            spins: vec![0; xs.len()],
        }
    }

    #[test]
    fn identical_positions_always_collide() {
        let cartes = neon_chain(&[0.0, 0.0]);
        let bonds = BondInfo::dense(2);
        for blow in [0.01, 0.5, 1.0, 3.0] {
            assert!(CollisionDetector::new().detect(&cartes, blow, &bonds).has_collision());
            assert!(CollisionDetector::new().has_collision(&cartes, blow, &bonds));
        }
    }

    #[test]
    fn far_apart_atoms_never_collide() {
        let cartes = neon_chain(&[0.0, 1.0e6]);
        let bonds = BondInfo::dense(2);
        let info = CollisionDetector::new().detect(&cartes, 10.0, &bonds);
        assert!(!info.has_collision());
        assert!(!CollisionDetector::new().has_collision(&cartes, 10.0, &bonds));
    }

    #[test]
    fn bonded_pairs_are_exempt() {
        let cartes = neon_chain(&[0.0, 0.1]);
        let mut bonds = BondInfo::dense(2);
        bonds.set_bond(0, 1, BondType::Single);
        assert!(!CollisionDetector::new().has_collision(&cartes, 1.0, &bonds));
    }

    #[test]
    fn full_scan_fills_complete_cache() {
        let cartes = neon_chain(&[0.0, 2.0, 5.0]);
        let info = CollisionDetector::new().detect(&cartes, 1.0, &BondInfo::dense(3));
        assert!(info.distances().is_complete());
        assert!((info.distances().get(0, 2) - 5.0).abs() < 1e-12);
        assert!((info.distances().get(2, 1) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn collision_strength_is_interpenetration_depth() {
        let cartes = neon_chain(&[0.0, 1.0]);
        let info = CollisionDetector::new().detect(&cartes, 1.0, &BondInfo::dense(2));
        let limit = 2.0 * cartes.radius(0);
        assert!((info.collisions()[0].strength - (limit - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn range_scan_finds_collisions_involving_changed_atoms() {
        // atoms 0 and 1 overlap, atom 3 overlaps atom 2
        let cartes = neon_chain(&[0.0, 0.1, 10.0, 10.1]);
        let bonds = BondInfo::dense(4);
        let mut info = MultiCollisionInfo::new(4);

        CollisionDetector::new().detect_range(&cartes, 1.0, &bonds, 3, 4, &mut info);
        assert_eq!(info.collision_count(), 1);
        assert_eq!((info.collisions()[0].atom_a, info.collisions()[0].atom_b), (2, 3));
        assert!(!info.distances().is_complete());
    }

    #[test]
    fn range_scan_visits_each_pair_once() {
        let cartes = neon_chain(&[0.0, 0.1, 0.2]);
        let bonds = BondInfo::dense(3);
        let mut info = MultiCollisionInfo::new(3);
        CollisionDetector::new().detect_range(&cartes, 1.0, &bonds, 0, 3, &mut info);
        assert_eq!(info.collision_count(), 3);
        assert!(info.distances().is_complete());
    }

    #[test]
    fn detect_into_reuses_single_record() {
        let cartes = neon_chain(&[0.0, 0.1, 0.2]);
        let bonds = BondInfo::dense(3);
        let mut info = SingleCollisionInfo::new(1);
        CollisionDetector::new().detect_into(&cartes, 1.0, &bonds, &mut info);
        assert_eq!(info.collision_count(), 1);
        assert_eq!(info.distances().atom_count(), 3);
    }

    #[test]
    fn single_record_stops_at_first_collision() {
        // every pair overlaps
        let cartes = neon_chain(&[0.0, 0.05, 0.1, 0.15, 0.2, 0.25]);
        let bonds = BondInfo::dense(6);
        let mut info = SingleCollisionInfo::new(6);
        CollisionDetector::new().detect_into(&cartes, 1.0, &bonds, &mut info);
        assert_eq!(info.collision_count(), 1);
        assert_eq!((info.collisions()[0].atom_a, info.collisions()[0].atom_b), (0, 1));
        assert!(!info.distances().is_complete());

        let multi = CollisionDetector::new().detect(&cartes, 1.0, &bonds);
        assert_eq!(multi.collision_count(), 15);
    }

    #[test]
    fn single_range_scan_stops_at_first_collision() {
        let cartes = neon_chain(&[0.0, 0.05, 0.1, 10.0]);
        let bonds = BondInfo::dense(4);
        let mut info = SingleCollisionInfo::new(4);
        CollisionDetector::new().detect_range(&cartes, 1.0, &bonds, 2, 4, &mut info);
        assert_eq!(info.collision_count(), 1);
        assert_eq!((info.collisions()[0].atom_a, info.collisions()[0].atom_b), (0, 2));
    }

    #[test]
    #[should_panic]
    fn mismatched_bond_table_is_fatal() {
        let cartes = neon_chain(&[0.0, 5.0]);
        CollisionDetector::new().has_collision(&cartes, 1.0, &BondInfo::dense(3));
    }
}
