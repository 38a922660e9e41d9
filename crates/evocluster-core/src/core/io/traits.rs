use crate::core::models::cartesians::Cartesians;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reading and writing of coordinate file formats.
///
/// Implementors provide the stream-based methods; the path-based variants open buffered files
/// around them.
pub trait MolecularFile {
    /// Format-specific data that does not fit into [`Cartesians`], such as a comment line.
    type Metadata;

    type Error: Error + From<io::Error>;

    fn read_from(reader: &mut impl BufRead) -> Result<(Cartesians, Self::Metadata), Self::Error>;

    fn write_to(
        cartes: &Cartesians,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Cartesians, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        cartes: &Cartesians,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(cartes, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
