use crate::core::models::bonds::{BondInfo, BondType};
use crate::core::models::cartesians::Cartesians;

/// Slack applied to covalent radii when perceiving bonds.
pub const DEFAULT_BOND_BLOW: f64 = 1.2;

/// Marks every pair closer than `blow · (r_a + r_b)` as [`BondType::Unspecified`].
///
/// Large coordinate sets get sparse storage, where only the perceived bonds are kept.
pub fn detect_bonds(cartes: &Cartesians, blow: f64) -> BondInfo {
    let n = cartes.atom_count();
    let mut bonds = if n > SPARSE_THRESHOLD {
        BondInfo::sparse(n)
    } else {
        BondInfo::dense(n)
    };
    for a in 0..n {
        for b in (a + 1)..n {
            let limit = blow * (cartes.radius(a) + cartes.radius(b));
            let dist_sq = (cartes.positions[a] - cartes.positions[b]).norm_squared();
            if dist_sq <= limit * limit {
                bonds.set_bond(a, b, BondType::Unspecified);
            }
        }
    }
    bonds
}

const SPARSE_THRESHOLD: usize = 2000;
