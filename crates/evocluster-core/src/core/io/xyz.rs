use super::traits::MolecularFile;
use crate::core::models::cartesians::Cartesians;
use crate::core::models::element::{Element, UnknownElement};
use crate::core::models::geometry::Geometry;
use nalgebra::Point3;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyzMetadata {
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Missing atom count header")]
    MissingHeader,
    #[error("Invalid atom count '{0}'")]
    InvalidCount(String),
    #[error("Expected {expected} atoms, found {found}")]
    TruncatedFile { expected: usize, found: usize },
    #[error("Atom line needs a symbol and three coordinates")]
    ShortAtomLine,
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error(transparent)]
    Element(#[from] UnknownElement),
}

/// Plain XYZ: an atom count, a comment line, then one `symbol x y z` line per atom.
///
/// XYZ carries no molecule partition, so everything read comes back as one molecule.
pub struct XyzFile;

impl MolecularFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Cartesians, Self::Metadata), Self::Error> {
        let mut lines = reader.lines().enumerate();

        let (expected, header_line) = loop {
            match lines.next() {
                Some((i, line)) => {
                    let line = line?;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let count = trimmed.parse::<usize>().map_err(|_| XyzError::Parse {
                        line: i + 1,
                        kind: XyzParseErrorKind::InvalidCount(trimmed.to_string()),
                    })?;
                    break (count, i + 1);
                }
                None => {
                    return Err(XyzError::Parse {
                        line: 1,
                        kind: XyzParseErrorKind::MissingHeader,
                    });
                }
            }
        };

        let comment = match lines.next() {
            Some((_, line)) => line?.trim_end().to_string(),
            None => String::new(),
        };

        let mut elements = Vec::with_capacity(expected);
        let mut positions = Vec::with_capacity(expected);
        for (i, line) in lines {
            if positions.len() == expected {
                break;
            }
            let line = line?;
            let line_no = i + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 4 {
                return Err(XyzError::Parse {
                    line: line_no,
                    kind: XyzParseErrorKind::ShortAtomLine,
                });
            }
            let element = Element::from_symbol(fields[0]).map_err(|e| XyzError::Parse {
                line: line_no,
                kind: e.into(),
            })?;
            let mut xyz = [0.0; 3];
            for (slot, field) in xyz.iter_mut().zip(&fields[1..4]) {
                *slot = field
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| XyzError::Parse {
                        line: line_no,
                        kind: XyzParseErrorKind::InvalidCoordinate(field.to_string()),
                    })?;
            }
            elements.push(element);
            positions.push(Point3::new(xyz[0], xyz[1], xyz[2]));
        }

        if positions.len() != expected {
            return Err(XyzError::Parse {
                line: header_line,
                kind: XyzParseErrorKind::TruncatedFile {
                    expected,
                    found: positions.len(),
                },
            });
        }
        Ok((
            Cartesians::single_molecule(elements, positions),
            XyzMetadata { comment },
        ))
    }

    fn write_to(
        cartes: &Cartesians,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", cartes.atom_count())?;
        writeln!(writer, "{}", metadata.comment.replace('\n', " "))?;
        for (element, p) in cartes.elements.iter().zip(&cartes.positions) {
            writeln!(
                writer,
                "{:<3}{:>16.8}{:>16.8}{:>16.8}",
                element.symbol, p.x, p.y, p.z
            )?;
        }
        Ok(())
    }
}

/// Appends one named property block: `name\n\t<value>\n\n`.
pub fn write_property(
    writer: &mut impl Write,
    name: &str,
    value: impl Display,
) -> io::Result<()> {
    write!(writer, "{name}\n\t{value}\n\n")
}

/// Writes the geometry (merged with its environment) as XYZ, followed by its identity and
/// lineage as property blocks.
pub fn write_geometry(writer: &mut impl Write, geometry: &Geometry) -> Result<(), XyzError> {
    let (cartes, _) = geometry.full_cartesians();
    let comment = match geometry.fitness {
        Some(fitness) => format!("geometry {} fitness {fitness:.8}", geometry.id),
        None => format!("geometry {}", geometry.id),
    };
    XyzFile::write_to(&cartes, &XyzMetadata { comment }, writer)?;
    writeln!(writer)?;
    write_property(writer, "id", geometry.id)?;
    write_property(writer, "fitness", display_or_none(geometry.fitness))?;
    write_property(writer, "mother", display_or_none(geometry.mother))?;
    write_property(writer, "father", display_or_none(geometry.father))?;
    Ok(())
}

fn display_or_none<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::MoleculeConfig;
    use std::io::Cursor;
    use tempfile::tempdir;

    const WATER: &str = "3\nwater monomer\nO 0.0 0.0 0.0\nH 0.757 0.586 0.0\nH -0.757 0.586 0.0\n";

    #[test]
    fn read_parses_atoms_and_comment() {
        let (cartes, meta) = XyzFile::read_from(&mut Cursor::new(WATER)).unwrap();
        assert_eq!(cartes.atom_count(), 3);
        assert_eq!(cartes.atoms_per_molecule, vec![3]);
        assert_eq!(cartes.elements[1].symbol, "H");
        assert_eq!(cartes.positions[2], Point3::new(-0.757, 0.586, 0.0));
        assert_eq!(meta.comment, "water monomer");
    }

    #[test]
    fn read_rejects_truncated_file() {
        let result = XyzFile::read_from(&mut Cursor::new("3\n\nO 0 0 0\n"));
        assert!(matches!(
            result,
            Err(XyzError::Parse {
                kind: XyzParseErrorKind::TruncatedFile { expected: 3, found: 1 },
                ..
            })
        ));
    }

    #[test]
    fn read_rejects_unknown_element_with_line_number() {
        let result = XyzFile::read_from(&mut Cursor::new("1\n\nQq 0 0 0\n"));
        assert!(matches!(
            result,
            Err(XyzError::Parse {
                line: 3,
                kind: XyzParseErrorKind::Element(_)
            })
        ));
    }

    #[test]
    fn read_rejects_bad_coordinate() {
        let result = XyzFile::read_from(&mut Cursor::new("1\n\nAr 0 zero 0\n"));
        assert!(matches!(
            result,
            Err(XyzError::Parse {
                kind: XyzParseErrorKind::InvalidCoordinate(_),
                ..
            })
        ));
    }

    #[test]
    fn read_rejects_non_finite_coordinates() {
        for (text, field) in [
            ("1\n\nAr nan 0 0\n", "nan"),
            ("1\n\nAr 0 inf 0\n", "inf"),
            ("1\n\nAr 0 0 -infinity\n", "-infinity"),
        ] {
            match XyzFile::read_from(&mut Cursor::new(text)) {
                Err(XyzError::Parse {
                    line: 3,
                    kind: XyzParseErrorKind::InvalidCoordinate(bad),
                }) => assert_eq!(bad, field),
                other => panic!("unexpected result for {text:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("water.xyz");
        let (cartes, meta) = XyzFile::read_from(&mut Cursor::new(WATER)).unwrap();
        XyzFile::write_to_path(&cartes, &meta, &path).unwrap();
        let (back, back_meta) = XyzFile::read_from_path(&path).unwrap();
        assert_eq!(back_meta, meta);
        for (a, b) in back.positions.iter().zip(&cartes.positions) {
            assert!((a - b).norm() < 1e-8);
        }
    }

    #[test]
    fn write_property_uses_tab_indented_block() {
        let mut out = Vec::new();
        write_property(&mut out, "fitness", -1.5).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "fitness\n\t-1.5\n\n");
    }

    #[test]
    fn write_geometry_appends_lineage_properties() {
        let ar = Element::from_symbol("Ar").unwrap();
        let atom = MoleculeConfig::from_coordinates("Ar", vec![ar], &[Point3::origin()]).unwrap();
        let mut geometry = Geometry::with_perceived_bonds(12, vec![atom], None, 1.2).unwrap();
        geometry.mother = Some(3);
        geometry.fitness = Some(-2.0);

        let mut out = Vec::new();
        write_geometry(&mut out, &geometry).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("1\ngeometry 12 fitness"));
        assert!(text.contains("id\n\t12\n\n"));
        assert!(text.contains("fitness\n\t-2\n\n"));
        assert!(text.contains("mother\n\t3\n\n"));
        assert!(text.ends_with("father\n\tnone\n\n"));
    }
}
