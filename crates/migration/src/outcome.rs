//! Per-item results produced by the migration phases.

use serde::{Deserialize, Serialize};

/// Result of migrating one record or uploading one file.
///
/// Produced exactly once per item per run. Failures carry a human-readable
/// reason only; the typed error has already been logged where it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<V> {
    /// The item was migrated; `V` is what it produced (e.g. the issue key).
    Success(V),
    /// The item failed.
    Failure(String),
}

impl<V> Outcome<V> {
    /// Builds a failure from anything displayable.
    pub fn failure(reason: impl std::fmt::Display) -> Self {
        Self::Failure(reason.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the success value, if any.
    pub fn success(&self) -> Option<&V> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure(_) => None,
        }
    }
}

impl<V, E: std::fmt::Display> From<Result<V, E>> for Outcome<V> {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::failure(e),
        }
    }
}

/// Success/failure tally for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    /// Counts one outcome.
    pub fn record<V>(&mut self, outcome: &Outcome<V>) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(self) -> usize {
        self.succeeded + self.failed
    }
}
