use nalgebra::DMatrix;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondType {
    #[default]
    None,
    Single,
    Double,
    Triple,
    Aromatic,
    VanDerWaals,
    Unspecified,
}

impl BondType {
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Aromatic => 4,
            Self::VanDerWaals => 5,
            Self::Unspecified => 99,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Aromatic),
            5 => Some(Self::VanDerWaals),
            99 => Some(Self::Unspecified),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid bond type string: '{0}'")]
pub struct ParseBondTypeError(String);

impl FromStr for BondType {
    type Err = ParseBondTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "none" => Ok(Self::None),
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "ar" | "aromatic" => Ok(Self::Aromatic),
            "5" | "vdw" | "van-der-waals" => Ok(Self::VanDerWaals),
            "99" | "?" | "unspecified" => Ok(Self::Unspecified),
            _ => Err(ParseBondTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "None",
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
                Self::VanDerWaals => "VanDerWaals",
                Self::Unspecified => "Unspecified",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BondStorage {
    Dense(DMatrix<BondType>),
    Sparse(HashMap<(usize, usize), BondType>),
}

/// Symmetric bond table over the atoms of a coordinate set.
///
/// Dense storage answers [`BondInfo::full_matrix`] by cloning its matrix; sparse storage has to
/// assemble it. Callers that need the whole table in a hot loop should check
/// [`BondInfo::full_matrix_is_fast`] first and fall back to [`BondInfo::bond_type`] otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BondInfo {
    atom_count: usize,
    storage: BondStorage,
}

impl BondInfo {
    pub fn dense(atom_count: usize) -> Self {
        Self {
            atom_count,
            storage: BondStorage::Dense(DMatrix::from_element(
                atom_count,
                atom_count,
                BondType::None,
            )),
        }
    }

    pub fn sparse(atom_count: usize) -> Self {
        Self {
            atom_count,
            storage: BondStorage::Sparse(HashMap::new()),
        }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    #[inline]
    pub fn full_matrix_is_fast(&self) -> bool {
        matches!(self.storage, BondStorage::Dense(_))
    }

    pub fn bond_type(&self, a: usize, b: usize) -> BondType {
        assert!(
            a < self.atom_count && b < self.atom_count,
            "bond index ({a}, {b}) out of range for {} atoms",
            self.atom_count
        );
        if a == b {
            return BondType::None;
        }
        match &self.storage {
            BondStorage::Dense(matrix) => matrix[(a, b)],
            BondStorage::Sparse(map) => map
                .get(&(a.min(b), a.max(b)))
                .copied()
                .unwrap_or(BondType::None),
        }
    }

    #[inline]
    pub fn has_bond(&self, a: usize, b: usize) -> bool {
        self.bond_type(a, b) != BondType::None
    }

    /// Sets the bond between `a` and `b` in both directions. Requests on the diagonal are ignored.
    pub fn set_bond(&mut self, a: usize, b: usize, bond: BondType) {
        assert!(
            a < self.atom_count && b < self.atom_count,
            "bond index ({a}, {b}) out of range for {} atoms",
            self.atom_count
        );
        if a == b {
            return;
        }
        match &mut self.storage {
            BondStorage::Dense(matrix) => {
                matrix[(a, b)] = bond;
                matrix[(b, a)] = bond;
            }
            BondStorage::Sparse(map) => {
                let key = (a.min(b), a.max(b));
                if bond == BondType::None {
                    map.remove(&key);
                } else {
                    map.insert(key, bond);
                }
            }
        }
    }

    pub fn full_matrix(&self) -> DMatrix<BondType> {
        match &self.storage {
            BondStorage::Dense(matrix) => matrix.clone(),
            BondStorage::Sparse(map) => {
                let mut matrix =
                    DMatrix::from_element(self.atom_count, self.atom_count, BondType::None);
                for (&(a, b), &bond) in map {
                    matrix[(a, b)] = bond;
                    matrix[(b, a)] = bond;
                }
                matrix
            }
        }
    }

    pub fn bonded_pairs(&self) -> Vec<(usize, usize, BondType)> {
        let mut pairs: Vec<_> = match &self.storage {
            BondStorage::Dense(matrix) => (0..self.atom_count)
                .flat_map(|a| ((a + 1)..self.atom_count).map(move |b| (a, b)))
                .filter_map(|(a, b)| {
                    let bond = matrix[(a, b)];
                    (bond != BondType::None).then_some((a, b, bond))
                })
                .collect(),
            BondStorage::Sparse(map) => map.iter().map(|(&(a, b), &t)| (a, b, t)).collect(),
        };
        pairs.sort_unstable_by_key(|&(a, b, _)| (a, b));
        pairs
    }

    /// Block-diagonal combination: `self` occupies the first atoms, `other` the rest.
    pub fn block_diagonal(&self, other: &BondInfo) -> BondInfo {
        let offset = self.atom_count;
        let mut combined = self.with_same_storage(offset + other.atom_count);
        for (a, b, bond) in self.bonded_pairs() {
            combined.set_bond(a, b, bond);
        }
        for (a, b, bond) in other.bonded_pairs() {
            combined.set_bond(a + offset, b + offset, bond);
        }
        combined
    }

    /// Restricts the table to `atoms`, renumbering them in the given order.
    pub fn subset(&self, atoms: &[usize]) -> BondInfo {
        let mut sub = self.with_same_storage(atoms.len());
        for (i, &a) in atoms.iter().enumerate() {
            for (j, &b) in atoms.iter().enumerate().skip(i + 1) {
                let bond = self.bond_type(a, b);
                if bond != BondType::None {
                    sub.set_bond(i, j, bond);
                }
            }
        }
        sub
    }

    fn with_same_storage(&self, atom_count: usize) -> BondInfo {
        if self.full_matrix_is_fast() {
            BondInfo::dense(atom_count)
        } else {
            BondInfo::sparse(atom_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_type_from_str_parses_valid_strings() {
        assert_eq!("1".parse::<BondType>().unwrap(), BondType::Single);
        assert_eq!("double".parse::<BondType>().unwrap(), BondType::Double);
        assert_eq!("T".parse::<BondType>().unwrap(), BondType::Triple);
        assert_eq!("ar".parse::<BondType>().unwrap(), BondType::Aromatic);
        assert_eq!("vdw".parse::<BondType>().unwrap(), BondType::VanDerWaals);
        assert_eq!("99".parse::<BondType>().unwrap(), BondType::Unspecified);
        assert!("quadruple".parse::<BondType>().is_err());
    }

    #[test]
    fn bond_type_codes_round_trip() {
        for bond in [
            BondType::None,
            BondType::Single,
            BondType::Double,
            BondType::Triple,
            BondType::Aromatic,
            BondType::VanDerWaals,
            BondType::Unspecified,
        ] {
            assert_eq!(BondType::from_code(bond.code()), Some(bond));
        }
        assert_eq!(BondType::from_code(42), None);
    }

    #[test]
    fn set_bond_is_symmetric_for_both_storages() {
        for mut bonds in [BondInfo::dense(4), BondInfo::sparse(4)] {
            bonds.set_bond(0, 3, BondType::Double);
            assert_eq!(bonds.bond_type(0, 3), BondType::Double);
            assert_eq!(bonds.bond_type(3, 0), BondType::Double);
            assert!(bonds.has_bond(3, 0));
            assert!(!bonds.has_bond(1, 2));
        }
    }

    #[test]
    fn diagonal_is_always_none() {
        let mut bonds = BondInfo::dense(3);
        bonds.set_bond(1, 1, BondType::Single);
        assert_eq!(bonds.bond_type(1, 1), BondType::None);
    }

    #[test]
    fn performance_flag_reflects_storage() {
        assert!(BondInfo::dense(2).full_matrix_is_fast());
        assert!(!BondInfo::sparse(2).full_matrix_is_fast());
    }

    #[test]
    fn sparse_full_matrix_matches_dense_full_matrix() {
        let mut dense = BondInfo::dense(3);
        let mut sparse = BondInfo::sparse(3);
        for bonds in [&mut dense, &mut sparse] {
            bonds.set_bond(0, 1, BondType::Single);
            bonds.set_bond(2, 1, BondType::Aromatic);
        }
        assert_eq!(dense.full_matrix(), sparse.full_matrix());
    }

    #[test]
    fn clearing_a_sparse_bond_removes_it() {
        let mut bonds = BondInfo::sparse(3);
        bonds.set_bond(0, 2, BondType::Single);
        bonds.set_bond(2, 0, BondType::None);
        assert!(bonds.bonded_pairs().is_empty());
    }

    #[test]
    fn block_diagonal_offsets_second_table() {
        let mut first = BondInfo::dense(2);
        first.set_bond(0, 1, BondType::Single);
        let mut second = BondInfo::dense(3);
        second.set_bond(0, 2, BondType::Double);

        let combined = first.block_diagonal(&second);
        assert_eq!(combined.atom_count(), 5);
        assert_eq!(combined.bond_type(0, 1), BondType::Single);
        assert_eq!(combined.bond_type(2, 4), BondType::Double);
        assert!(!combined.has_bond(1, 2));
    }

    #[test]
    fn subset_renumbers_atoms() {
        let mut bonds = BondInfo::dense(5);
        bonds.set_bond(1, 4, BondType::Triple);
        let sub = bonds.subset(&[4, 0, 1]);
        assert_eq!(sub.atom_count(), 3);
        assert_eq!(sub.bond_type(0, 2), BondType::Triple);
        assert!(!sub.has_bond(0, 1));
    }

    #[test]
    #[should_panic]
    fn out_of_range_access_panics() {
        BondInfo::dense(2).bond_type(0, 2);
    }
}
