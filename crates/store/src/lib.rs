//! Local file adapters for tracker-migrate.
//!
//! | Type / function | Port |
//! |-----------------|------|
//! | [`CsvRecordStore`] | [`migration::RecordStore`] |
//! | [`DirectoryCatalog`] | [`migration::AttachmentCatalog`] |
//! | [`load_user_directory`], [`load_status_map`] | mapping data for the `jira` client and the converter |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** CSV parsing and writing, directory scanning, and JSON
//! loading live here. Failures are reported as [`migration::StoreError`].

pub mod catalog;
pub mod csv_store;
pub mod mapping_files;
pub mod pivotal;

pub use catalog::DirectoryCatalog;
pub use csv_store::{read_ledger, write_ledger, CsvRecordStore};
pub use mapping_files::{load_status_map, load_user_directory};
pub use pivotal::{parse_pivotal, read_pivotal, COMMENT_SEPARATOR};
