//! Core migration domain for tracker-migrate.
//!
//! This crate contains every domain concept shared by the migration engine and
//! its infrastructure adapters: records and the ledger, per-item outcomes,
//! mapping rules, the pure conversion step, and the port traits the adapters
//! implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O. It
//! defines *what* the migration needs; the `jira` and `store` crates define
//! *how* it is supplied, and the `engine` crate sequences it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SourceId`, `IssueKey`, `RunId`, ...) |
//! | [`record`] | `Record`, column names, ledger cell states |
//! | [`ledger`] | `Ledger` table and outcome merging |
//! | [`outcome`] | `Outcome` and `Tally` |
//! | [`mapping`] | Issue-type, status and user mapping |
//! | [`issue`] | `NewIssue` construction from a converted record |
//! | [`convert`] | Pivotal → import-file conversion |
//! | [`ports`] | `IssueTracker`, `RecordStore`, `AttachmentCatalog` |
//! | [`events`] | `MigrationEvent` and the injected `EventSink` |
//! | [`errors`] | Run-level and port error types |

pub mod convert;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod issue;
pub mod ledger;
pub mod mapping;
pub mod outcome;
pub mod ports;
pub mod record;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use convert::{convert_date, convert_record, convert_records};
pub use errors::{MigrationError, StoreError, TrackerError, TrackerOperation};
pub use events::{EventSink, MigrationEvent, Phase, RecordingSink, TracingSink};
pub use identifiers::{AccountId, FieldId, IssueKey, ProjectKey, RunId, SourceId, TransitionId};
pub use issue::{normalize_summary, split_labels, story_points, NewIssue, UNTITLED_SUMMARY};
pub use ledger::{IssueMapping, Ledger};
pub use mapping::{is_backlog, IssueType, ResolvedPeople, StatusMap, UserDirectory, BACKLOG_STATUS};
pub use outcome::{Outcome, Tally};
pub use ports::{AttachmentCatalog, AttachmentGroup, IssueTracker, RecordStore, StatusChange};
pub use record::{columns, pivotal, ErrorFlag, Record, TargetKey, ERROR_SENTINEL};
