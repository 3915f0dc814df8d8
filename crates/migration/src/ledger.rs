//! The ledger: the converted import file with its key and error columns.
//!
//! The [`Ledger`] is loaded at the start of a phase, merged with the phase's
//! outcomes in memory by the single owner of the phase, and handed back to the
//! [`RecordStore`](crate::RecordStore) to be rewritten as a whole. Columns the
//! migration does not understand are carried through untouched.

use std::collections::{HashMap, HashSet};

use crate::{columns, ErrorFlag, IssueKey, MigrationError, Outcome, Record, SourceId, TargetKey};

/// Resolved `SourceId → IssueKey` pairs, excluding rows that failed or were
/// never attempted.
pub type IssueMapping = HashMap<SourceId, IssueKey>;

/// Header plus rows of the ledger file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    headers: Vec<String>,
    rows: Vec<Record>,
}

impl Ledger {
    /// Creates a ledger from a header row and its records.
    pub fn new(headers: Vec<String>, rows: Vec<Record>) -> Self {
        Self { headers, rows }
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails unless both the source-id and target-key columns are present.
    pub fn require_key_columns(&self) -> Result<(), MigrationError> {
        let missing: Vec<&str> = [columns::SOURCE_ID, columns::TARGET_KEY]
            .into_iter()
            .filter(|c| !self.headers.iter().any(|h| h == c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::MissingColumns {
                columns: missing.into_iter().map(str::to_owned).collect(),
            })
        }
    }

    /// Fails on the first source id carried by more than one row. Rows with a
    /// blank id are not considered.
    pub fn require_unique_source_ids(&self) -> Result<(), MigrationError> {
        let mut seen = HashSet::new();
        for id in self.rows.iter().filter_map(Record::source_id) {
            if !seen.insert(id.clone()) {
                return Err(MigrationError::DuplicateSourceId { id });
            }
        }
        Ok(())
    }

    /// Writes outcomes into the key and error columns.
    ///
    /// The `Error` column is appended on first use with every existing row
    /// defaulting to blank. Rows without an outcome keep their previous values.
    /// Returns the number of rows updated.
    pub fn merge(&mut self, outcomes: &HashMap<SourceId, Outcome<IssueKey>>) -> usize {
        self.ensure_error_column();

        let mut updated = 0;
        for row in &mut self.rows {
            let Some(outcome) = row.source_id().and_then(|id| outcomes.get(&id)) else {
                continue;
            };
            let (key, flag) = match outcome {
                Outcome::Success(key) => (TargetKey::Created(key.clone()), ErrorFlag::Succeeded),
                Outcome::Failure(_) => (TargetKey::Failed, ErrorFlag::Failed),
            };
            row.set(columns::TARGET_KEY, key.as_str());
            row.set(columns::ERROR, flag.as_str());
            updated += 1;
        }
        updated
    }

    /// Marks the row at `index` (zero-based) as failed. Used for rows that
    /// have no source id to key an outcome by. Returns `false` when the index
    /// is out of range.
    pub fn mark_failed(&mut self, index: usize) -> bool {
        self.ensure_error_column();
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        row.set(columns::TARGET_KEY, TargetKey::Failed.as_str());
        row.set(columns::ERROR, ErrorFlag::Failed.as_str());
        true
    }

    fn ensure_error_column(&mut self) {
        if self.headers.iter().any(|h| h == columns::ERROR) {
            return;
        }
        self.headers.push(columns::ERROR.to_owned());
        for row in &mut self.rows {
            row.set(columns::ERROR, "");
        }
    }

    /// Builds the `SourceId → IssueKey` mapping used to resolve attachment
    /// groups. Pending and `"ERROR"` rows are left out.
    pub fn issue_mapping(&self) -> IssueMapping {
        self.rows
            .iter()
            .filter_map(|row| {
                let id = row.source_id()?;
                match row.target_key() {
                    TargetKey::Created(key) => Some((id, key)),
                    TargetKey::Pending | TargetKey::Failed => None,
                }
            })
            .collect()
    }

    /// Rows rendered as cells in header order, ready for a CSV writer.
    pub fn cells(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| self.headers.iter().map(|h| row.get(h)).collect())
    }
}
