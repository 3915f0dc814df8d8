//! Port traits implemented by infrastructure crates.
//!
//! | Trait | Implemented by |
//! |-------|----------------|
//! | [`IssueTracker`] | `jira::JiraClient` |
//! | [`RecordStore`] | `store::CsvRecordStore` |
//! | [`AttachmentCatalog`] | `store::DirectoryCatalog` |
//!
//! Tracker calls are async because every one of them is a network round
//! trip. Store calls are synchronous: they touch local files once per phase.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    is_backlog, IssueKey, Ledger, NewIssue, Record, SourceId, StoreError, TrackerError,
    TransitionId,
};

// ---------------------------------------------------------------------------
// Target tracker
// ---------------------------------------------------------------------------

/// What [`IssueTracker::apply_status`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// A transition was executed.
    Applied,
    /// The requested status is the default state; nothing was sent.
    Skipped,
}

/// Remote operations the migration consumes.
///
/// Implementations perform exactly one logical remote operation per required
/// method. The provided methods layer the migration's skip policies on top.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Verifies the configured credentials.
    async fn check_auth(&self) -> Result<(), TrackerError>;

    /// Creates an issue and returns its key.
    ///
    /// Implementations normalize the summary with
    /// [`normalize_summary`](crate::normalize_summary) and resolve reporter
    /// and assignee through their user directory.
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueKey, TrackerError>;

    async fn set_story_points(&self, key: &IssueKey, points: u32) -> Result<(), TrackerError>;

    /// Available transitions keyed by lowercased target status name.
    async fn list_transitions(
        &self,
        key: &IssueKey,
    ) -> Result<HashMap<String, TransitionId>, TrackerError>;

    async fn transition(&self, key: &IssueKey, transition: &TransitionId)
        -> Result<(), TrackerError>;

    /// Posts a comment unconditionally. Callers normally use
    /// [`IssueTracker::add_comment`].
    async fn post_comment(&self, key: &IssueKey, text: &str) -> Result<(), TrackerError>;

    async fn upload_attachment(
        &self,
        key: &IssueKey,
        file: &std::path::Path,
    ) -> Result<(), TrackerError>;

    /// Moves the issue to `status`.
    ///
    /// `"Backlog"` in any case is the state new issues start in, so it is
    /// reported as [`StatusChange::Skipped`] without any remote call.
    async fn apply_status(&self, key: &IssueKey, status: &str) -> Result<StatusChange, TrackerError> {
        if is_backlog(status) {
            return Ok(StatusChange::Skipped);
        }

        let transitions = self.list_transitions(key).await?;
        let transition = transitions
            .get(&status.trim().to_lowercase())
            .ok_or_else(|| TrackerError::TransitionNotFound {
                status: status.to_owned(),
            })?;

        self.transition(key, transition).await?;
        Ok(StatusChange::Applied)
    }

    /// Adds a comment; an empty comment is a successful no-op.
    async fn add_comment(&self, key: &IssueKey, text: &str) -> Result<(), TrackerError> {
        if text.is_empty() {
            return Ok(());
        }
        self.post_comment(key, text).await
    }
}

// ---------------------------------------------------------------------------
// Local data
// ---------------------------------------------------------------------------

/// Loads source records and persists the ledger.
pub trait RecordStore: Send + Sync {
    /// Reads the source export.
    fn load_source(&self) -> Result<Vec<Record>, StoreError>;

    /// Reads the converted file / ledger.
    fn load_ledger(&self) -> Result<Ledger, StoreError>;

    /// Replaces the ledger file as a whole.
    fn save_ledger(&self, ledger: &Ledger) -> Result<(), StoreError>;
}

/// Files to attach to the issue created for one source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentGroup {
    pub source_id: SourceId,
    pub files: Vec<PathBuf>,
}

/// Enumerates attachment groups.
pub trait AttachmentCatalog: Send + Sync {
    fn groups(&self) -> Result<Vec<AttachmentGroup>, StoreError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::TrackerOperation;

    /// Tracker that only records which required methods were hit.
    #[derive(Default)]
    struct CallLog {
        calls: Mutex<Vec<&'static str>>,
        transitions: HashMap<String, TransitionId>,
    }

    impl CallLog {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn hit(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }
    }

    #[async_trait]
    impl IssueTracker for CallLog {
        async fn check_auth(&self) -> Result<(), TrackerError> {
            self.hit("check_auth");
            Ok(())
        }

        async fn create_issue(&self, _issue: &NewIssue) -> Result<IssueKey, TrackerError> {
            self.hit("create_issue");
            Err(TrackerError::Decode {
                operation: TrackerOperation::CreateIssue,
                message: "unused".into(),
            })
        }

        async fn set_story_points(&self, _key: &IssueKey, _points: u32) -> Result<(), TrackerError> {
            self.hit("set_story_points");
            Ok(())
        }

        async fn list_transitions(
            &self,
            _key: &IssueKey,
        ) -> Result<HashMap<String, TransitionId>, TrackerError> {
            self.hit("list_transitions");
            Ok(self.transitions.clone())
        }

        async fn transition(
            &self,
            _key: &IssueKey,
            _transition: &TransitionId,
        ) -> Result<(), TrackerError> {
            self.hit("transition");
            Ok(())
        }

        async fn post_comment(&self, _key: &IssueKey, _text: &str) -> Result<(), TrackerError> {
            self.hit("post_comment");
            Ok(())
        }

        async fn upload_attachment(
            &self,
            _key: &IssueKey,
            _file: &std::path::Path,
        ) -> Result<(), TrackerError> {
            self.hit("upload_attachment");
            Ok(())
        }
    }

    fn key() -> IssueKey {
        IssueKey::new("P-1").unwrap()
    }

    #[tokio::test]
    async fn backlog_status_never_reaches_the_tracker() {
        let tracker = CallLog::default();
        for status in ["Backlog", "backlog", "BACKLOG", " BackLog "] {
            let change = tracker.apply_status(&key(), status).await.unwrap();
            assert_eq!(change, StatusChange::Skipped);
        }
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn status_lookup_is_case_insensitive() {
        let tracker = CallLog {
            transitions: HashMap::from([("in progress".to_owned(), TransitionId::new("21").unwrap())]),
            ..CallLog::default()
        };

        let change = tracker.apply_status(&key(), "In Progress").await.unwrap();

        assert_eq!(change, StatusChange::Applied);
        assert_eq!(tracker.calls(), vec!["list_transitions", "transition"]);
    }

    #[tokio::test]
    async fn unknown_status_is_an_error_without_transition() {
        let tracker = CallLog::default();
        let err = tracker.apply_status(&key(), "Shipped").await.unwrap_err();
        assert!(matches!(err, TrackerError::TransitionNotFound { status } if status == "Shipped"));
        assert_eq!(tracker.calls(), vec!["list_transitions"]);
    }

    #[tokio::test]
    async fn empty_comment_is_a_no_op() {
        let tracker = CallLog::default();
        tracker.add_comment(&key(), "").await.unwrap();
        assert!(tracker.calls().is_empty());
        tracker.add_comment(&key(), "hello").await.unwrap();
        assert_eq!(tracker.calls(), vec!["post_comment"]);
    }
}
