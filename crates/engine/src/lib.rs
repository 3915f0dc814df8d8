//! Migration engine for tracker-migrate.
//!
//! This crate sequences the domain rules from the [`migration`] crate against
//! the injected ports: the [`BoundedRunner`] fans per-record and per-file work
//! out under a concurrency cap, and the [`Migrator`] runs the convert, import,
//! and attachment phases and owns the ledger while they run.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** No domain rules of its own and no direct I/O:
//! every network call goes through [`migration::IssueTracker`] and every file
//! access through [`migration::RecordStore`] / [`migration::AttachmentCatalog`].

pub mod migrator;
pub mod runner;
pub mod workflow;

pub use migrator::{
    convert_export, Migrator, PhaseReport, PhaseSelection, ReprocessPolicy, RunReport,
};
pub use runner::{BoundedRunner, Completion, DEFAULT_CONCURRENCY};
pub use workflow::{import_record, WorkflowContext};
