use phf::phf_map;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Covalent radius in Å.
    pub covalent_radius: f64,
    /// Standard atomic mass in g/mol.
    pub mass: f64,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown element symbol: '{0}'")]
pub struct UnknownElement(pub String);

macro_rules! element {
    ($sym:literal, $z:literal, $r:literal, $m:literal) => {
        Element {
            symbol: $sym,
            atomic_number: $z,
            covalent_radius: $r,
            mass: $m,
        }
    };
}

static ELEMENTS: phf::Map<&'static str, Element> = phf_map! {
    "H" => element!("H", 1, 0.31, 1.008),
    "He" => element!("He", 2, 0.28, 4.0026),
    "Li" => element!("Li", 3, 1.28, 6.94),
    "Be" => element!("Be", 4, 0.96, 9.0122),
    "B" => element!("B", 5, 0.84, 10.81),
    "C" => element!("C", 6, 0.76, 12.011),
    "N" => element!("N", 7, 0.71, 14.007),
    "O" => element!("O", 8, 0.66, 15.999),
    "F" => element!("F", 9, 0.57, 18.998),
    "Ne" => element!("Ne", 10, 0.58, 20.180),
    "Na" => element!("Na", 11, 1.66, 22.990),
    "Mg" => element!("Mg", 12, 1.41, 24.305),
    "Al" => element!("Al", 13, 1.21, 26.982),
    "Si" => element!("Si", 14, 1.11, 28.085),
    "P" => element!("P", 15, 1.07, 30.974),
    "S" => element!("S", 16, 1.05, 32.06),
    "Cl" => element!("Cl", 17, 1.02, 35.45),
    "Ar" => element!("Ar", 18, 1.06, 39.948),
    "K" => element!("K", 19, 2.03, 39.098),
    "Ca" => element!("Ca", 20, 1.76, 40.078),
    "Fe" => element!("Fe", 26, 1.32, 55.845),
    "Ni" => element!("Ni", 28, 1.24, 58.693),
    "Cu" => element!("Cu", 29, 1.32, 63.546),
    "Zn" => element!("Zn", 30, 1.22, 65.38),
    "Br" => element!("Br", 35, 1.20, 79.904),
    "Kr" => element!("Kr", 36, 1.16, 83.798),
    "Ag" => element!("Ag", 47, 1.45, 107.87),
    "I" => element!("I", 53, 1.39, 126.90),
    "Xe" => element!("Xe", 54, 1.40, 131.29),
    "Pt" => element!("Pt", 78, 1.36, 195.08),
    "Au" => element!("Au", 79, 1.36, 196.97),
};

impl Element {
    /// Looks up an element by symbol, ignoring case ("CL", "cl" and "Cl" all resolve).
    pub fn from_symbol(symbol: &str) -> Result<&'static Element, UnknownElement> {
        let trimmed = symbol.trim();
        let mut chars = trimmed.chars();
        let normalized: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(|c| c.to_lowercase()))
                .collect(),
            None => String::new(),
        };
        ELEMENTS
            .get(normalized.as_str())
            .ok_or_else(|| UnknownElement(trimmed.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let upper = Element::from_symbol("CL").unwrap();
        let lower = Element::from_symbol("cl").unwrap();
        assert_eq!(upper.atomic_number, 17);
        assert_eq!(upper, lower);
    }

    #[test]
    fn lookup_trims_whitespace() {
        assert_eq!(Element::from_symbol("  Ar ").unwrap().symbol, "Ar");
    }

    #[test]
    fn unknown_symbol_returns_error() {
        let err = Element::from_symbol("Qq").unwrap_err();
        assert_eq!(err, UnknownElement("Qq".to_string()));
    }

    #[test]
    fn empty_symbol_returns_error() {
        assert!(Element::from_symbol("").is_err());
    }
}
