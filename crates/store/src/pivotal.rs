//! Reader for Pivotal Tracker CSV exports.
//!
//! The export format has a few quirks this reader absorbs:
//!
//! - a story with several comments repeats the `Comment` column; the cells are
//!   joined into one value separated by [`COMMENT_SEPARATOR`];
//! - other repeated headers (tasks, owners) keep their first occurrence;
//! - rows shorter than the header are padded with empty cells;
//! - rows longer than the header are an error.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use migration::{pivotal, Record, StoreError};
use tracing::{info, warn};

/// Placed between the texts of repeated `Comment` cells.
pub const COMMENT_SEPARATOR: &str = "\n\n===========================\n\n";

/// Reads the export at `path`.
pub fn read_pivotal(path: &Path) -> Result<Vec<Record>, StoreError> {
    info!(path = %path.display(), "reading source export");
    let file = std::fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_pivotal(file, path)?;
    info!(rows = records.len(), "source export read");
    Ok(records)
}

/// Parses an export from any reader. `path` is used in errors and logs only.
pub fn parse_pivotal<R: Read>(input: R, path: &Path) -> Result<Vec<Record>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let csv_error = |e: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut rows = reader.records();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.map_err(csv_error)?.iter().map(str::to_owned).collect(),
        None => {
            return Err(StoreError::Empty {
                path: path.to_path_buf(),
            })
        }
    };
    let layout = HeaderLayout::new(&headers);

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        let row = row.map_err(csv_error)?;
        // Header is line 1.
        let line = row.position().map_or(i as u64 + 2, |p| p.line());
        if row.len() > headers.len() {
            return Err(StoreError::RowTooLong {
                path: path.to_path_buf(),
                line,
                expected: headers.len(),
                found: row.len(),
            });
        }
        if row.len() < headers.len() {
            warn!(
                line,
                expected = headers.len(),
                found = row.len(),
                "short row padded with empty fields"
            );
        }
        records.push(layout.record(&row));
    }

    if records.is_empty() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(records)
}

/// Column positions by header name, in header order.
struct HeaderLayout {
    columns: Vec<(String, Vec<usize>)>,
}

impl HeaderLayout {
    fn new(headers: &[String]) -> Self {
        let mut columns: Vec<(String, Vec<usize>)> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, name) in headers.iter().enumerate() {
            match seen.get(name.as_str()) {
                Some(&slot) => columns[slot].1.push(index),
                None => {
                    seen.insert(name.as_str(), columns.len());
                    columns.push((name.clone(), vec![index]));
                }
            }
        }
        Self { columns }
    }

    fn record(&self, row: &csv::StringRecord) -> Record {
        let cell = |index: usize| row.get(index).unwrap_or("");
        self.columns
            .iter()
            .map(|(name, indices)| {
                let value = if name == pivotal::COMMENT {
                    indices
                        .iter()
                        .map(|&i| cell(i))
                        .filter(|c| !c.is_empty())
                        .collect::<Vec<_>>()
                        .join(COMMENT_SEPARATOR)
                } else {
                    cell(indices[0]).to_owned()
                };
                (name.clone(), value)
            })
            .collect()
    }
}
