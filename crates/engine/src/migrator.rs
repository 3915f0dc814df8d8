//! Phase orchestration: convert, import, upload attachments.
//!
//! The [`Migrator`] owns the ledger for the duration of a phase. Workers
//! spawned through the [`BoundedRunner`] only return outcomes; the migrator
//! tallies them, emits the per-item events, merges them into the ledger, and
//! hands the ledger back to the [`RecordStore`] once at the end of the phase.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use migration::{
    columns, convert_records, AttachmentCatalog, ErrorFlag, EventSink, IssueKey, IssueTracker,
    Ledger, MigrationError, MigrationEvent, Outcome, Phase, RecordStore, SourceId, StatusMap, Tally,
    TargetKey,
};
use tracing::{info, instrument};

use crate::runner::BoundedRunner;
use crate::workflow::{import_record, WorkflowContext};

/// How the import phase treats rows that already carry an issue key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReprocessPolicy {
    /// Offer every row to the tracker again, including rows created by a
    /// previous run.
    #[default]
    ReprocessAll,
    /// Leave rows with an existing (non-`ERROR`) key alone.
    SkipCreated,
}

/// Which phases [`Migrator::run`] executes.
///
/// The flags filter each other: `attachments_only` wins over `import_only`,
/// and `convert_only` excludes both later phases. With none set, every phase
/// runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseSelection {
    pub convert_only: bool,
    pub import_only: bool,
    pub attachments_only: bool,
}

impl PhaseSelection {
    pub fn runs_convert(self) -> bool {
        !self.import_only && !self.attachments_only
    }

    pub fn runs_import(self) -> bool {
        !self.convert_only && !self.attachments_only
    }

    pub fn runs_attachments(self) -> bool {
        !self.convert_only && (!self.import_only || self.attachments_only)
    }
}

/// Counts and timing of one finished phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub tally: Tally,
    pub elapsed: Duration,
}

/// Reports of every phase executed by [`Migrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
}

impl RunReport {
    /// Item failures across all phases.
    pub fn failures(&self) -> usize {
        self.phases.iter().map(|p| p.tally.failed).sum()
    }

    fn tally(&self) -> Tally {
        self.phases.iter().fold(Tally::default(), |acc, p| Tally {
            succeeded: acc.succeeded + p.tally.succeeded,
            failed: acc.failed + p.tally.failed,
        })
    }
}

/// Drives the migration phases against injected ports.
pub struct Migrator {
    tracker: Arc<dyn IssueTracker>,
    store: Arc<dyn RecordStore>,
    attachments: Arc<dyn AttachmentCatalog>,
    events: Arc<dyn EventSink>,
    runner: BoundedRunner,
    statuses: StatusMap,
    policy: ReprocessPolicy,
}

impl Migrator {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn RecordStore>,
        attachments: Arc<dyn AttachmentCatalog>,
        events: Arc<dyn EventSink>,
        runner: BoundedRunner,
    ) -> Self {
        Self {
            tracker,
            store,
            attachments,
            events,
            runner,
            statuses: StatusMap::default(),
            policy: ReprocessPolicy::default(),
        }
    }

    /// Replaces the default source-state → status table used by [`Migrator::convert`].
    #[must_use]
    pub fn with_statuses(mut self, statuses: StatusMap) -> Self {
        self.statuses = statuses;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReprocessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fails with [`MigrationError::Authentication`] unless the tracker
    /// accepts the configured credentials.
    pub async fn check_auth(&self) -> Result<(), MigrationError> {
        self.tracker
            .check_auth()
            .await
            .map_err(MigrationError::Authentication)?;
        info!("authenticated against the target tracker");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Convert
    // -----------------------------------------------------------------------

    /// Converts the source export into the import file. No network calls.
    pub fn convert(&self) -> Result<PhaseReport, MigrationError> {
        convert_export(self.store.as_ref(), &self.statuses, self.events.as_ref())
    }

    // -----------------------------------------------------------------------
    // Import
    // -----------------------------------------------------------------------

    /// Creates one issue per ledger row and records the keys.
    #[instrument(skip_all, fields(phase = "import", limit = self.runner.limit()))]
    pub async fn import(&self) -> Result<PhaseReport, MigrationError> {
        let started = Instant::now();
        let mut ledger = self.store.load_ledger()?;
        ledger.require_key_columns()?;
        ledger.require_unique_source_ids()?;

        let mut work = Vec::with_capacity(ledger.len());
        let mut retried = Vec::new();
        for (i, record) in ledger.rows().iter().enumerate() {
            if self.policy == ReprocessPolicy::SkipCreated
                && matches!(record.target_key(), TargetKey::Created(_))
            {
                continue;
            }
            let row = i + 1;
            if let (Some(source_id), ErrorFlag::Failed) = (record.source_id(), record.error_flag()) {
                retried.push(MigrationEvent::RecordRetried { row, source_id });
            }
            work.push((row, record.clone()));
        }
        self.started(Phase::Import, work.len());
        for event in retried {
            self.events.emit(event);
        }

        let rows: Vec<(usize, Option<SourceId>)> = work
            .iter()
            .map(|(row, record)| (*row, record.source_id()))
            .collect();
        let ctx = WorkflowContext {
            tracker: Arc::clone(&self.tracker),
            events: Arc::clone(&self.events),
        };
        let completions = self
            .runner
            .run(work, |(_, record)| import_record(ctx.clone(), record))
            .await;

        let mut tally = Tally::default();
        let mut outcomes: HashMap<SourceId, Outcome<IssueKey>> = HashMap::new();
        let mut unkeyed_failures = Vec::new();
        for completion in completions {
            let (row, source_id) = rows[completion.index].clone();
            tally.record(&completion.outcome);
            match &completion.outcome {
                Outcome::Success(key) => {
                    if let Some(source_id) = source_id.clone() {
                        self.events.emit(MigrationEvent::IssueCreated {
                            row,
                            source_id,
                            key: key.clone(),
                        });
                    }
                }
                Outcome::Failure(reason) => self.events.emit(MigrationEvent::RecordFailed {
                    row,
                    source_id: source_id.clone(),
                    reason: reason.clone(),
                }),
            }
            match source_id {
                Some(source_id) => {
                    outcomes.insert(source_id, completion.outcome);
                }
                // No id to key the outcome by; the row is marked by position.
                None if !completion.outcome.is_success() => unkeyed_failures.push(row - 1),
                None => {}
            }
        }

        let mut updated = ledger.merge(&outcomes);
        for index in unkeyed_failures {
            if ledger.mark_failed(index) {
                updated += 1;
            }
        }
        self.store.save_ledger(&ledger)?;
        info!(updated, rows = ledger.len(), "ledger rewritten");

        Ok(self.finished(Phase::Import, tally, started))
    }

    // -----------------------------------------------------------------------
    // Attachments
    // -----------------------------------------------------------------------

    /// Uploads every file of every attachment group whose record has an issue.
    #[instrument(skip_all, fields(phase = "upload_attachments", limit = self.runner.limit()))]
    pub async fn upload_attachments(&self) -> Result<PhaseReport, MigrationError> {
        let started = Instant::now();
        let ledger = self.store.load_ledger()?;
        ledger.require_key_columns()?;
        let mapping = ledger.issue_mapping();
        let groups = self.attachments.groups()?;

        let mut uploads: Vec<(IssueKey, PathBuf)> = Vec::new();
        let mut skipped = Vec::new();
        for group in groups {
            let Some(key) = mapping.get(&group.source_id) else {
                skipped.push(MigrationEvent::GroupSkipped {
                    source_id: group.source_id,
                });
                continue;
            };
            uploads.extend(group.files.into_iter().map(|file| (key.clone(), file)));
        }
        self.started(Phase::UploadAttachments, uploads.len());
        for event in skipped {
            self.events.emit(event);
        }

        let tracker = Arc::clone(&self.tracker);
        let completions = self
            .runner
            .run(uploads.clone(), |(key, file)| {
                let tracker = Arc::clone(&tracker);
                async move { Outcome::from(tracker.upload_attachment(&key, &file).await) }
            })
            .await;

        let mut tally = Tally::default();
        for completion in completions {
            let (key, file) = uploads[completion.index].clone();
            tally.record(&completion.outcome);
            match completion.outcome {
                Outcome::Success(()) => self.events.emit(MigrationEvent::FileUploaded { key, file }),
                Outcome::Failure(reason) => {
                    self.events
                        .emit(MigrationEvent::FileFailed { key, file, reason })
                }
            }
        }

        Ok(self.finished(Phase::UploadAttachments, tally, started))
    }

    // -----------------------------------------------------------------------
    // Whole run
    // -----------------------------------------------------------------------

    /// Checks authentication, then runs the selected phases in order.
    ///
    /// Only a fatal error stops the sequence; item failures in one phase do
    /// not prevent the next from running.
    #[instrument(skip_all)]
    pub async fn run(&self, selection: PhaseSelection) -> Result<RunReport, MigrationError> {
        let started = Instant::now();
        self.check_auth().await?;
        self.started(Phase::Migration, 0);

        let mut report = RunReport::default();
        if selection.runs_convert() {
            report.phases.push(self.convert()?);
        }
        if selection.runs_import() {
            report.phases.push(self.import().await?);
        }
        if selection.runs_attachments() {
            report.phases.push(self.upload_attachments().await?);
        }

        self.finished(Phase::Migration, report.tally(), started);
        Ok(report)
    }

    fn started(&self, phase: Phase, items: usize) {
        phase_started(self.events.as_ref(), phase, items);
    }

    fn finished(&self, phase: Phase, tally: Tally, started: Instant) -> PhaseReport {
        phase_finished(self.events.as_ref(), phase, tally, started)
    }
}

/// Converts the source export into the import file and writes it as the
/// ledger, replacing any previous one.
///
/// Needs no tracker; [`Migrator::convert`] delegates here.
#[instrument(skip_all, fields(phase = "convert"))]
pub fn convert_export(
    store: &dyn RecordStore,
    statuses: &StatusMap,
    events: &dyn EventSink,
) -> Result<PhaseReport, MigrationError> {
    let started = Instant::now();
    let source = store.load_source()?;
    phase_started(events, Phase::Convert, source.len());

    let converted = convert_records(&source, statuses)?;
    let tally = Tally {
        succeeded: converted.len(),
        failed: 0,
    };
    let headers = columns::CONVERTED.iter().map(|c| (*c).to_owned()).collect();
    store.save_ledger(&Ledger::new(headers, converted))?;

    Ok(phase_finished(events, Phase::Convert, tally, started))
}

fn phase_started(events: &dyn EventSink, phase: Phase, items: usize) {
    events.emit(MigrationEvent::PhaseStarted { phase, items });
}

fn phase_finished(
    events: &dyn EventSink,
    phase: Phase,
    tally: Tally,
    started: Instant,
) -> PhaseReport {
    let elapsed = started.elapsed();
    events.emit(MigrationEvent::PhaseFinished {
        phase,
        tally,
        elapsed,
    });
    PhaseReport {
        phase,
        tally,
        elapsed,
    }
}
