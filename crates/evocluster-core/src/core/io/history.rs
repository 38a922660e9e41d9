use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// One row of the genealogy: which geometry was produced from which parents, how it scored
/// and whether the pool took it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub mother: Option<u64>,
    pub father: Option<u64>,
    pub fitness: Option<f64>,
    pub niche: String,
    pub accepted: bool,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

pub struct HistoryWriter<W: Write> {
    writer: csv::Writer<W>,
    label: String,
}

impl HistoryWriter<std::fs::File> {
    pub fn create(path: &Path) -> Result<Self, HistoryError> {
        let label = path.to_string_lossy().to_string();
        let writer = csv::Writer::from_path(path).map_err(|e| HistoryError::Csv {
            path: label.clone(),
            source: e,
        })?;
        Ok(Self { writer, label })
    }
}

impl<W: Write> HistoryWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            label: "<stream>".to_string(),
        }
    }

    pub fn append(&mut self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.writer.serialize(record).map_err(|e| HistoryError::Csv {
            path: self.label.clone(),
            source: e,
        })
    }

    pub fn append_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a HistoryRecord>,
    ) -> Result<(), HistoryError> {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(self) -> Result<W, HistoryError> {
        let label = self.label;
        self.writer.into_inner().map_err(|e| HistoryError::Io {
            path: label,
            source: e.into_error(),
        })
    }
}

pub fn read_history(path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
    let label = path.to_string_lossy().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| HistoryError::Csv {
        path: label.clone(),
        source: e,
    })?;
    reader
        .deserialize()
        .map(|row| {
            row.map_err(|e| HistoryError::Csv {
                path: label.clone(),
                source: e,
            })
        })
        .collect()
}
