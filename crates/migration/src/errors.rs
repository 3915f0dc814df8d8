//! Error types for the migration domain.
//!
//! [`MigrationError`] covers conditions that abort a run. Per-item failures
//! never become a [`MigrationError`]; they are captured as
//! [`Outcome::Failure`](crate::Outcome) by the phase that produced them.
//!
//! [`TrackerError`] and [`StoreError`] are the error types of the two port
//! families, so infrastructure crates can report failures without the domain
//! depending on their libraries.

use std::path::PathBuf;

use thiserror::Error;

use crate::SourceId;

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that abort the migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The target tracker rejected the configured credentials.
    #[error("authentication against the target tracker failed: {0}")]
    Authentication(#[source] TrackerError),

    /// An input or ledger file could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The ledger lacks the columns needed to map records to issues.
    #[error("ledger is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Names of the absent columns.
        columns: Vec<String>,
    },

    /// Two ledger rows carry the same source id, so their keys could not be
    /// told apart when written back.
    #[error("source id {id} appears on more than one ledger row")]
    DuplicateSourceId { id: SourceId },

    /// The source export contains nothing to migrate.
    #[error("no records to convert")]
    NothingToConvert,

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; a run never starts with an invalid config.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Remote operation an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOperation {
    CheckAuth,
    CreateIssue,
    SetStoryPoints,
    ListTransitions,
    ApplyStatus,
    AddComment,
    UploadAttachment,
}

impl std::fmt::Display for TrackerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CheckAuth => "check auth",
            Self::CreateIssue => "create issue",
            Self::SetStoryPoints => "set story points",
            Self::ListTransitions => "list transitions",
            Self::ApplyStatus => "apply status",
            Self::AddComment => "add comment",
            Self::UploadAttachment => "upload attachment",
        };
        f.write_str(name)
    }
}

/// Failure of a single call against the target tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The request never produced an HTTP response (connection, TLS, timeout).
    #[error("{operation}: transport failure: {message}")]
    Transport {
        operation: TrackerOperation,
        message: String,
    },

    /// The tracker answered with an unexpected status code.
    #[error("{operation}: rejected with HTTP {status}: {body}")]
    Rejected {
        operation: TrackerOperation,
        status: u16,
        body: String,
    },

    /// The response could not be interpreted.
    #[error("{operation}: unexpected response: {message}")]
    Decode {
        operation: TrackerOperation,
        message: String,
    },

    /// The issue's workflow offers no transition to the requested status.
    #[error("no transition to status '{status}' is available")]
    TransitionNotFound { status: String },

    /// A local attachment could not be read.
    #[error("cannot read attachment {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrackerError {
    /// Operation the error is attributed to, where known.
    pub fn operation(&self) -> Option<TrackerOperation> {
        match self {
            Self::Transport { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Decode { operation, .. } => Some(*operation),
            Self::TransitionNotFound { .. } => Some(TrackerOperation::ApplyStatus),
            Self::File { .. } => Some(TrackerOperation::UploadAttachment),
        }
    }
}

/// Failure of the record store or attachment catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    /// The file has a header but no data rows.
    #[error("{} contains no data rows", path.display())]
    Empty { path: PathBuf },

    /// A data row has more cells than the header.
    #[error("{} line {line}: {found} fields but the header has {expected}", path.display())]
    RowTooLong {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("attachments folder not found: {}", path.display())]
    AttachmentsRootMissing { path: PathBuf },

    #[error("invalid mapping file {}: {message}", path.display())]
    Mapping { path: PathBuf, message: String },
}
