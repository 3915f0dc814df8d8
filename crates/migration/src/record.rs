//! Records and the column vocabulary shared by the source export and the ledger.
//!
//! A [`Record`] is one row of a CSV file keyed by header name. Two schemas are
//! in play: the Pivotal export ([`pivotal`] columns) and the converted Jira
//! import file ([`columns`]), which doubles as the ledger once the
//! [`columns::TARGET_KEY`] and [`columns::ERROR`] columns are filled in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{IssueKey, SourceId};

/// Column names of the converted import file (the ledger).
pub mod columns {
    /// Source identifier carried over from the Pivotal `Id` column.
    pub const SOURCE_ID: &str = "JIRA Issue ID";
    pub const TITLE: &str = "Title";
    pub const DESCRIPTION: &str = "Description";
    pub const LABELS: &str = "Labels";
    pub const TYPE: &str = "Type";
    pub const STATUS: &str = "JIRA Status";
    pub const STORY_POINTS: &str = "Story Points";
    pub const CREATED_DATE: &str = "Created Date";
    pub const RESOLVED_DATE: &str = "Resolved Date";
    pub const ASSIGNEE: &str = "Assignee";
    pub const REPORTER: &str = "Reporter";
    pub const COMMENT: &str = "Comment";
    /// Target key once created; `"ERROR"` after a failed attempt.
    pub const TARGET_KEY: &str = "JIRA Issue Key";
    /// Error flag column, appended on the first ledger rewrite.
    pub const ERROR: &str = "Error";

    /// Column order of a freshly converted file.
    pub const CONVERTED: [&str; 13] = [
        SOURCE_ID,
        TITLE,
        DESCRIPTION,
        LABELS,
        TYPE,
        STATUS,
        STORY_POINTS,
        CREATED_DATE,
        RESOLVED_DATE,
        ASSIGNEE,
        REPORTER,
        COMMENT,
        TARGET_KEY,
    ];
}

/// Column names of the Pivotal Tracker CSV export.
pub mod pivotal {
    pub const ID: &str = "Id";
    pub const TITLE: &str = "Title";
    pub const DESCRIPTION: &str = "Description";
    pub const LABELS: &str = "Labels";
    pub const TYPE: &str = "Type";
    pub const CURRENT_STATE: &str = "Current State";
    pub const ESTIMATE: &str = "Estimate";
    pub const CREATED_AT: &str = "Created at";
    pub const ACCEPTED_AT: &str = "Accepted at";
    pub const OWNED_BY: &str = "Owned By";
    pub const REQUESTED_BY: &str = "Requested By";
    /// May appear several times in one export; the reader joins them.
    pub const COMMENT: &str = "Comment";
}

/// Reserved [`columns::TARGET_KEY`] value meaning "attempted and failed".
pub const ERROR_SENTINEL: &str = "ERROR";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One migratable unit: a mapping from column name to cell value.
///
/// Missing columns read as the empty string, matching how a CSV cell that is
/// absent and a CSV cell that is blank are indistinguishable downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    /// Returns `true` if the record carries `column` at all.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Sets `column` to `value`, replacing any previous value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    /// Builder-style variant of [`Record::set`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Source identifier of a converted record, if present and non-blank.
    pub fn source_id(&self) -> Option<SourceId> {
        SourceId::new(self.get(columns::SOURCE_ID))
    }

    /// Parsed state of the [`columns::TARGET_KEY`] cell.
    pub fn target_key(&self) -> TargetKey {
        TargetKey::parse(self.get(columns::TARGET_KEY))
    }

    /// Parsed state of the [`columns::ERROR`] cell.
    pub fn error_flag(&self) -> ErrorFlag {
        ErrorFlag::parse(self.get(columns::ERROR))
    }

    /// Iterates over `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger cell states
// ---------------------------------------------------------------------------

/// Tri-state value of the [`columns::ERROR`] column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorFlag {
    /// Blank cell: the record has never been attempted.
    NotAttempted,
    /// `"0"`: the last attempt created the issue.
    Succeeded,
    /// `"1"`: the last attempt failed to create the issue.
    Failed,
}

impl ErrorFlag {
    /// Parses a cell value. Anything other than `"0"` or `"1"` is treated as
    /// never attempted.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "0" => Self::Succeeded,
            "1" => Self::Failed,
            _ => Self::NotAttempted,
        }
    }

    /// Cell representation written back to the ledger.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAttempted => "",
            Self::Succeeded => "0",
            Self::Failed => "1",
        }
    }
}

/// Parsed value of the [`columns::TARGET_KEY`] column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKey {
    /// Empty cell: no issue created yet.
    Pending,
    /// An issue exists in the target tracker.
    Created(IssueKey),
    /// The [`ERROR_SENTINEL`] value.
    Failed,
}

impl TargetKey {
    /// Parses a cell value.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == ERROR_SENTINEL {
            return Self::Failed;
        }
        match IssueKey::new(value) {
            Some(key) => Self::Created(key),
            None => Self::Pending,
        }
    }

    /// Cell representation written back to the ledger.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "",
            Self::Created(key) => key.as_str(),
            Self::Failed => ERROR_SENTINEL,
        }
    }

    /// The created key, if any.
    pub fn issue_key(&self) -> Option<&IssueKey> {
        match self {
            Self::Created(key) => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_read_as_empty() {
        let record = Record::new().with(columns::TITLE, "hello");
        assert_eq!(record.get(columns::TITLE), "hello");
        assert_eq!(record.get(columns::DESCRIPTION), "");
        assert!(!record.contains(columns::DESCRIPTION));
    }

    #[test]
    fn target_key_sentinel_is_distinct_from_empty() {
        assert_eq!(TargetKey::parse(""), TargetKey::Pending);
        assert_eq!(TargetKey::parse("ERROR"), TargetKey::Failed);
        let created = TargetKey::parse("PROJ-9");
        assert_eq!(created.issue_key().map(IssueKey::as_str), Some("PROJ-9"));
        assert_eq!(created.as_str(), "PROJ-9");
    }

    #[test]
    fn error_flag_round_trips_cell_values() {
        for flag in [ErrorFlag::NotAttempted, ErrorFlag::Succeeded, ErrorFlag::Failed] {
            assert_eq!(ErrorFlag::parse(flag.as_str()), flag);
        }
        assert_eq!(ErrorFlag::parse("yes"), ErrorFlag::NotAttempted);
    }
}
