//! Migration events and the injected sink that receives them.
//!
//! Every user-visible line the migration promises (phase start and finish,
//! per-item failures, degraded sub-steps, rate-limit retries, skipped
//! attachment groups) is an [`MigrationEvent`] handed to an [`EventSink`].
//! Production wiring uses [`TracingSink`], which turns each event into a
//! structured `tracing` event at the right level. Tests use [`RecordingSink`].

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::{IssueKey, SourceId, Tally, TrackerOperation};

/// Independently triggerable migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Convert,
    Import,
    UploadAttachments,
    /// The whole run, from auth check to the last phase.
    Migration,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Convert => "convert",
            Self::Import => "import",
            Self::UploadAttachments => "upload attachments",
            Self::Migration => "migration",
        })
    }
}

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationEvent {
    PhaseStarted {
        phase: Phase,
        items: usize,
    },
    PhaseFinished {
        phase: Phase,
        tally: Tally,
        elapsed: Duration,
    },
    /// A row flagged as failed by a previous run is being attempted again.
    RecordRetried {
        row: usize,
        source_id: SourceId,
    },
    IssueCreated {
        row: usize,
        source_id: SourceId,
        key: IssueKey,
    },
    /// Issue creation failed; the record is marked as an error in the ledger.
    RecordFailed {
        row: usize,
        source_id: Option<SourceId>,
        reason: String,
    },
    /// A best-effort step after creation failed; the record still succeeded.
    StepDegraded {
        key: IssueKey,
        step: TrackerOperation,
        reason: String,
    },
    /// The tracker answered 429; the request will be sent once more.
    RateLimited {
        body: String,
        backoff: Duration,
    },
    /// An attachment group had no resolvable issue and was not uploaded.
    GroupSkipped {
        source_id: SourceId,
    },
    FileUploaded {
        key: IssueKey,
        file: PathBuf,
    },
    FileFailed {
        key: IssueKey,
        file: PathBuf,
        reason: String,
    },
}

/// Receiver for [`MigrationEvent`]s, injected into every component that
/// reports progress.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MigrationEvent);
}

// ---------------------------------------------------------------------------

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: MigrationEvent) {
        match event {
            MigrationEvent::PhaseStarted { phase, items } => {
                info!(%phase, items, "{phase} started");
            }
            MigrationEvent::PhaseFinished {
                phase,
                tally,
                elapsed,
            } => {
                info!(
                    %phase,
                    succeeded = tally.succeeded,
                    failed = tally.failed,
                    total = tally.total(),
                    elapsed_ms = saturating_millis(elapsed),
                    "{phase} finished: success={}, failure={}, elapsed={elapsed:?}",
                    tally.succeeded,
                    tally.failed,
                );
            }
            MigrationEvent::RecordRetried { row, source_id } => {
                info!(row, %source_id, "reprocessing a previously failed record");
            }
            MigrationEvent::IssueCreated {
                row,
                source_id,
                key,
            } => {
                info!(row, %source_id, issue_key = %key, "issue created");
            }
            MigrationEvent::RecordFailed {
                row,
                source_id,
                reason,
            } => {
                let source_id = source_id.as_ref().map(SourceId::as_str).unwrap_or("");
                error!(row, source_id, %reason, "record failed");
            }
            MigrationEvent::StepDegraded { key, step, reason } => {
                warn!(issue_key = %key, %step, %reason, "{step} failed; issue kept");
            }
            MigrationEvent::RateLimited { body, backoff } => {
                warn!(%body, backoff_secs = backoff.as_secs(), "rate limited; retrying once after back-off");
            }
            MigrationEvent::GroupSkipped { source_id } => {
                warn!(%source_id, "no issue found for attachment group; skipping");
            }
            MigrationEvent::FileUploaded { key, file } => {
                info!(issue_key = %key, file = %file.display(), "attachment uploaded");
            }
            MigrationEvent::FileFailed { key, file, reason } => {
                error!(issue_key = %key, file = %file.display(), %reason, "attachment upload failed");
            }
        }
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MigrationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&MigrationEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: MigrationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_millis_saturate_instead_of_wrapping() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(MigrationEvent::PhaseStarted {
            phase: Phase::Import,
            items: 2,
        });
        sink.emit(MigrationEvent::PhaseFinished {
            phase: Phase::Import,
            tally: Tally::default(),
            elapsed: Duration::ZERO,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MigrationEvent::PhaseStarted { items: 2, .. }));
        assert_eq!(
            sink.count(|e| matches!(e, MigrationEvent::PhaseFinished { .. })),
            1
        );
    }
}
