//! The per-record import workflow.
//!
//! Steps run strictly in order: create the issue, then story points, status,
//! and comment. Only creation decides the record's outcome; the later steps
//! are best-effort and report a [`MigrationEvent::StepDegraded`] when they
//! fail.

use std::sync::Arc;

use migration::{
    columns, story_points, EventSink, IssueKey, IssueTracker, MigrationEvent, NewIssue, Outcome,
    Record, StatusChange, TrackerError, TrackerOperation,
};
use tracing::debug;

/// Shared handles a workflow needs; cloned into every spawned worker.
#[derive(Clone)]
pub struct WorkflowContext {
    pub tracker: Arc<dyn IssueTracker>,
    pub events: Arc<dyn EventSink>,
}

/// Migrates one converted record.
pub async fn import_record(ctx: WorkflowContext, record: Record) -> Outcome<IssueKey> {
    if record.source_id().is_none() {
        return Outcome::failure(format!("record has no {}", columns::SOURCE_ID));
    }

    let issue = NewIssue::from_record(&record);
    let key = match ctx.tracker.create_issue(&issue).await {
        Ok(key) => key,
        Err(e) => return Outcome::failure(e),
    };

    if let Some(points) = story_points(&record) {
        if let Err(e) = ctx.tracker.set_story_points(&key, points).await {
            degraded(&ctx, &key, TrackerOperation::SetStoryPoints, &e);
        }
    }

    let status = record.get(columns::STATUS);
    if !status.is_empty() {
        match ctx.tracker.apply_status(&key, status).await {
            Ok(StatusChange::Applied) => debug!(issue_key = %key, status, "status applied"),
            Ok(StatusChange::Skipped) => debug!(issue_key = %key, status, "default status; no transition"),
            Err(e) => degraded(&ctx, &key, TrackerOperation::ApplyStatus, &e),
        }
    }

    let comment = record.get(columns::COMMENT);
    match ctx.tracker.add_comment(&key, comment).await {
        Ok(()) if !comment.is_empty() => debug!(issue_key = %key, "comment added"),
        Ok(()) => {}
        Err(e) => degraded(&ctx, &key, TrackerOperation::AddComment, &e),
    }

    Outcome::Success(key)
}

fn degraded(ctx: &WorkflowContext, key: &IssueKey, step: TrackerOperation, error: &TrackerError) {
    ctx.events.emit(MigrationEvent::StepDegraded {
        key: key.clone(),
        step,
        reason: error.to_string(),
    });
}
