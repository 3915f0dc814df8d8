//! CSV-backed [`RecordStore`].

use std::path::{Path, PathBuf};

use migration::{Ledger, Record, RecordStore, StoreError};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::pivotal::read_pivotal;

/// Reads the source export and reads/writes the ledger as CSV files.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    source: PathBuf,
    ledger: PathBuf,
}

impl CsvRecordStore {
    pub fn new(source: impl Into<PathBuf>, ledger: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ledger: ledger.into(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger
    }
}

impl RecordStore for CsvRecordStore {
    fn load_source(&self) -> Result<Vec<Record>, StoreError> {
        read_pivotal(&self.source)
    }

    fn load_ledger(&self) -> Result<Ledger, StoreError> {
        let ledger = read_ledger(&self.ledger)?;
        info!(path = %self.ledger.display(), rows = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<(), StoreError> {
        write_ledger(&self.ledger, ledger)?;
        info!(path = %self.ledger.display(), rows = ledger.len(), "ledger written");
        Ok(())
    }
}

/// Reads a ledger file. Every row must have exactly as many cells as the
/// header, and at least one data row must exist.
pub fn read_ledger(path: &Path) -> Result<Ledger, StoreError> {
    let csv_error = |e: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let file = std::fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let mut record = Record::new();
        for (name, value) in headers.iter().zip(row.iter()) {
            // First occurrence of a repeated header wins.
            if !record.contains(name) {
                record.set(name.as_str(), value);
            }
        }
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(Ledger::new(headers, rows))
}

/// Replaces the ledger file at `path` with `ledger`.
///
/// The rows are written to a temporary file in the same directory, which is
/// then renamed over `path`; a crash mid-write leaves the previous file intact.
pub fn write_ledger(path: &Path, ledger: &Ledger) -> Result<(), StoreError> {
    let io_error = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    {
        let mut writer = csv::Writer::from_writer(staged.as_file_mut());
        writer.write_record(ledger.headers()).map_err(|e| csv_failure(path, e))?;
        for cells in ledger.cells() {
            writer.write_record(&cells).map_err(|e| csv_failure(path, e))?;
        }
        writer.flush().map_err(io_error)?;
    }
    staged.as_file_mut().sync_all().map_err(io_error)?;
    staged.persist(path).map_err(|e| io_error(e.error))?;
    debug!(path = %path.display(), "ledger replaced atomically");
    Ok(())
}

fn csv_failure(path: &Path, error: csv::Error) -> StoreError {
    StoreError::Csv {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
