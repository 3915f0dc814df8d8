use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use engine::{BoundedRunner, Migrator, PhaseSelection, ReprocessPolicy};
use migration::{
    columns, pivotal, AttachmentCatalog, AttachmentGroup, IssueKey, IssueTracker, Ledger,
    MigrationError, MigrationEvent, NewIssue, Phase, Record, RecordStore, RecordingSink,
    SourceId, StoreError, TrackerError, TrackerOperation, TransitionId,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeTracker {
    reject_auth: bool,
    /// Source ids whose creation is rejected.
    reject_create: HashSet<String>,
    fail_story_points: bool,
    fail_comments: bool,
    next_key: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeTracker {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn hit(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected(operation: TrackerOperation) -> TrackerError {
        TrackerError::Rejected {
            operation,
            status: 400,
            body: "nope".into(),
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn check_auth(&self) -> Result<(), TrackerError> {
        self.hit("check_auth".into());
        if self.reject_auth {
            return Err(TrackerError::Rejected {
                operation: TrackerOperation::CheckAuth,
                status: 401,
                body: "bad token".into(),
            });
        }
        Ok(())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueKey, TrackerError> {
        self.hit(format!("create_issue {}", issue.summary));
        let rejected = self
            .reject_create
            .iter()
            .any(|id| issue.summary.starts_with(&format!("[{id}]")));
        if rejected {
            return Err(Self::rejected(TrackerOperation::CreateIssue));
        }
        let n = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssueKey::new(format!("PROJ-{n}")).unwrap())
    }

    async fn set_story_points(&self, key: &IssueKey, points: u32) -> Result<(), TrackerError> {
        self.hit(format!("set_story_points {key} {points}"));
        if self.fail_story_points {
            return Err(Self::rejected(TrackerOperation::SetStoryPoints));
        }
        Ok(())
    }

    async fn list_transitions(
        &self,
        key: &IssueKey,
    ) -> Result<HashMap<String, TransitionId>, TrackerError> {
        self.hit(format!("list_transitions {key}"));
        Ok(HashMap::from([(
            "in progress".to_owned(),
            TransitionId::new("21").unwrap(),
        )]))
    }

    async fn transition(
        &self,
        key: &IssueKey,
        transition: &TransitionId,
    ) -> Result<(), TrackerError> {
        self.hit(format!("transition {key} {transition}"));
        Ok(())
    }

    async fn post_comment(&self, key: &IssueKey, _text: &str) -> Result<(), TrackerError> {
        self.hit(format!("post_comment {key}"));
        if self.fail_comments {
            return Err(Self::rejected(TrackerOperation::AddComment));
        }
        Ok(())
    }

    async fn upload_attachment(&self, key: &IssueKey, file: &Path) -> Result<(), TrackerError> {
        self.hit(format!("upload_attachment {key} {}", file.display()));
        if file.to_string_lossy().contains("corrupt") {
            return Err(Self::rejected(TrackerOperation::UploadAttachment));
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    source: Vec<Record>,
    ledger: Mutex<Option<Ledger>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(Some(ledger)),
            ..Self::default()
        }
    }

    fn ledger(&self) -> Ledger {
        self.ledger.lock().unwrap().clone().expect("ledger saved")
    }
}

impl RecordStore for MemoryStore {
    fn load_source(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.source.clone())
    }

    fn load_ledger(&self) -> Result<Ledger, StoreError> {
        self.ledger
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StoreError::Empty {
                path: PathBuf::from("ledger.csv"),
            })
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.ledger.lock().unwrap() = Some(ledger.clone());
        Ok(())
    }
}

#[derive(Default)]
struct StaticCatalog(Vec<AttachmentGroup>);

impl AttachmentCatalog for StaticCatalog {
    fn groups(&self) -> Result<Vec<AttachmentGroup>, StoreError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn ledger_headers() -> Vec<String> {
    columns::CONVERTED.iter().map(|c| (*c).to_owned()).collect()
}

fn converted(id: &str) -> Record {
    Record::new()
        .with(columns::SOURCE_ID, id)
        .with(columns::TITLE, format!("Story {id}"))
        .with(columns::TYPE, "feature")
        .with(columns::TARGET_KEY, "")
}

fn source_id(id: &str) -> SourceId {
    SourceId::new(id).unwrap()
}

struct Harness {
    tracker: Arc<FakeTracker>,
    store: Arc<MemoryStore>,
    sink: Arc<RecordingSink>,
    migrator: Migrator,
}

fn harness(tracker: FakeTracker, store: MemoryStore, catalog: StaticCatalog, limit: usize) -> Harness {
    let tracker = Arc::new(tracker);
    let store = Arc::new(store);
    let sink = Arc::new(RecordingSink::new());
    let migrator = Migrator::new(
        tracker.clone(),
        store.clone(),
        Arc::new(catalog),
        sink.clone(),
        BoundedRunner::new(limit).unwrap(),
    );
    Harness {
        tracker,
        store,
        sink,
        migrator,
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn import_counts_failures_and_marks_them_in_the_ledger() {
    let ids: Vec<String> = (1..=10).map(|i| format!("{}", 100 + i)).collect();
    let rows = ids.iter().map(|id| converted(id)).collect();
    let tracker = FakeTracker {
        reject_create: ["102", "105", "109"].iter().map(|s| s.to_string()).collect(),
        ..FakeTracker::default()
    };
    let h = harness(
        tracker,
        MemoryStore::with_ledger(Ledger::new(ledger_headers(), rows)),
        StaticCatalog::default(),
        3,
    );

    let report = h.migrator.import().await.unwrap();

    assert_eq!(report.phase, Phase::Import);
    assert_eq!(report.tally.succeeded, 7);
    assert_eq!(report.tally.failed, 3);

    let ledger = h.store.ledger();
    assert_eq!(ledger.headers().last().map(String::as_str), Some(columns::ERROR));
    let failed: Vec<&Record> = ledger
        .rows()
        .iter()
        .filter(|r| r.get(columns::ERROR) == "1")
        .collect();
    assert_eq!(failed.len(), 3);
    assert!(failed.iter().all(|r| r.get(columns::TARGET_KEY) == "ERROR"));
    assert_eq!(
        ledger.rows().iter().filter(|r| r.get(columns::ERROR) == "0").count(),
        7
    );
    assert_eq!(h.store.saves.load(Ordering::SeqCst), 1);

    assert_eq!(
        h.sink.count(|e| matches!(e, MigrationEvent::RecordFailed { .. })),
        3
    );
    assert_eq!(
        h.sink.count(|e| matches!(e, MigrationEvent::IssueCreated { .. })),
        7
    );
    assert!(matches!(
        h.sink.events().last(),
        Some(MigrationEvent::PhaseFinished { phase: Phase::Import, .. })
    ));
}

#[tokio::test]
async fn degraded_steps_do_not_fail_the_record() {
    let record = converted("200")
        .with(columns::STORY_POINTS, "5")
        .with(columns::STATUS, "In Progress")
        .with(columns::COMMENT, "carried over");
    let tracker = FakeTracker {
        fail_story_points: true,
        fail_comments: true,
        ..FakeTracker::default()
    };
    let h = harness(
        tracker,
        MemoryStore::with_ledger(Ledger::new(ledger_headers(), vec![record])),
        StaticCatalog::default(),
        1,
    );

    let report = h.migrator.import().await.unwrap();

    assert_eq!(report.tally.succeeded, 1);
    assert_eq!(report.tally.failed, 0);
    assert_eq!(h.store.ledger().rows()[0].get(columns::TARGET_KEY), "PROJ-1");

    let degraded: Vec<TrackerOperation> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MigrationEvent::StepDegraded { step, .. } => Some(step),
            _ => None,
        })
        .collect();
    assert_eq!(
        degraded,
        vec![TrackerOperation::SetStoryPoints, TrackerOperation::AddComment]
    );
    // Steps run in order after creation.
    let calls = h.tracker.calls();
    assert!(calls[0].starts_with("create_issue"));
    assert_eq!(calls[1], "set_story_points PROJ-1 5");
    assert_eq!(calls[2], "list_transitions PROJ-1");
    assert_eq!(calls[3], "transition PROJ-1 21");
    assert_eq!(calls[4], "post_comment PROJ-1");
}

#[tokio::test]
async fn backlog_and_zero_points_send_nothing_after_create() {
    let record = converted("300")
        .with(columns::STORY_POINTS, "0")
        .with(columns::STATUS, "backlog");
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(Ledger::new(ledger_headers(), vec![record])),
        StaticCatalog::default(),
        2,
    );

    h.migrator.import().await.unwrap();

    assert_eq!(h.tracker.calls().len(), 1);
    assert_eq!(h.tracker.count("transition"), 0);
}

#[tokio::test]
async fn previous_failures_are_retried_and_successes_reprocessed_by_default() {
    let rows = vec![
        converted("1").with(columns::TARGET_KEY, "ERROR").with(columns::ERROR, "1"),
        converted("2").with(columns::TARGET_KEY, "OLD-2").with(columns::ERROR, "0"),
    ];
    let mut headers = ledger_headers();
    headers.push(columns::ERROR.to_owned());
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(Ledger::new(headers, rows)),
        StaticCatalog::default(),
        2,
    );

    let report = h.migrator.import().await.unwrap();

    assert_eq!(report.tally.succeeded, 2);
    assert_eq!(h.tracker.count("create_issue"), 2);
    assert_eq!(
        h.sink.count(|e| matches!(e, MigrationEvent::RecordRetried { source_id, .. } if source_id.as_str() == "1")),
        1
    );
    let ledger = h.store.ledger();
    assert!(ledger.rows().iter().all(|r| r.get(columns::ERROR) == "0"));
    assert_ne!(ledger.rows()[1].get(columns::TARGET_KEY), "OLD-2");
}

#[tokio::test]
async fn skip_created_policy_leaves_existing_keys_alone() {
    let rows = vec![
        converted("id1"),
        converted("id2").with(columns::TARGET_KEY, "KEY-2").with(columns::ERROR, "0"),
    ];
    let mut headers = ledger_headers();
    headers.push(columns::ERROR.to_owned());
    let tracker = Arc::new(FakeTracker::default());
    let store = Arc::new(MemoryStore::with_ledger(Ledger::new(headers, rows)));
    let migrator = Migrator::new(
        tracker.clone(),
        store.clone(),
        Arc::new(StaticCatalog::default()),
        Arc::new(RecordingSink::new()),
        BoundedRunner::new(4).unwrap(),
    )
    .with_policy(ReprocessPolicy::SkipCreated);

    let report = migrator.import().await.unwrap();

    assert_eq!(report.tally.total(), 1);
    let ledger = store.ledger();
    assert_eq!(ledger.rows()[0].get(columns::TARGET_KEY), "PROJ-1");
    assert_eq!(ledger.rows()[0].get(columns::ERROR), "0");
    assert_eq!(ledger.rows()[1].get(columns::TARGET_KEY), "KEY-2");
    assert_eq!(ledger.rows()[1].get(columns::ERROR), "0");
}

#[tokio::test]
async fn ledger_without_key_columns_is_fatal() {
    let ledger = Ledger::new(
        vec![columns::SOURCE_ID.to_owned()],
        vec![Record::new().with(columns::SOURCE_ID, "1")],
    );
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(ledger),
        StaticCatalog::default(),
        1,
    );

    let err = h.migrator.import().await.unwrap_err();

    assert!(matches!(err, MigrationError::MissingColumns { .. }));
    assert!(h.tracker.calls().is_empty());
}

#[tokio::test]
async fn rows_without_source_id_fail_without_a_remote_call() {
    let rows = vec![converted("").with(columns::TITLE, "orphan"), converted("9")];
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(Ledger::new(ledger_headers(), rows)),
        StaticCatalog::default(),
        2,
    );

    let report = h.migrator.import().await.unwrap();

    assert_eq!(report.tally.succeeded, 1);
    assert_eq!(report.tally.failed, 1);
    assert_eq!(h.tracker.count("create_issue"), 1);

    let ledger = h.store.ledger();
    assert_eq!(ledger.rows()[0].get(columns::TARGET_KEY), "ERROR");
    assert_eq!(ledger.rows()[0].get(columns::ERROR), "1");
    assert_eq!(ledger.rows()[1].get(columns::ERROR), "0");
    let flagged = ledger
        .rows()
        .iter()
        .filter(|r| r.get(columns::ERROR) == "1")
        .count();
    assert_eq!(flagged, report.tally.failed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_source_ids_abort_before_any_issue_is_created() {
    let rows = vec![converted("7"), converted("8"), converted("7")];
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(Ledger::new(ledger_headers(), rows)),
        StaticCatalog::default(),
        2,
    );

    let err = h.migrator.import().await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::DuplicateSourceId { ref id } if id.as_str() == "7"
    ));
    assert!(h.tracker.calls().is_empty());
    assert_eq!(h.store.saves.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_skip_unresolvable_groups_and_count_file_failures() {
    let mut headers = ledger_headers();
    headers.push(columns::ERROR.to_owned());
    let rows = vec![
        converted("a").with(columns::TARGET_KEY, "PROJ-1").with(columns::ERROR, "0"),
        converted("b").with(columns::TARGET_KEY, "ERROR").with(columns::ERROR, "1"),
    ];
    let catalog = StaticCatalog(vec![
        AttachmentGroup {
            source_id: source_id("a"),
            files: vec![PathBuf::from("a/design.pdf"), PathBuf::from("a/corrupt.png")],
        },
        AttachmentGroup {
            source_id: source_id("b"),
            files: vec![PathBuf::from("b/log.txt")],
        },
        AttachmentGroup {
            source_id: source_id("zzz"),
            files: vec![PathBuf::from("zzz/x.txt")],
        },
    ]);
    let h = harness(
        FakeTracker::default(),
        MemoryStore::with_ledger(Ledger::new(headers, rows)),
        catalog,
        2,
    );

    let report = h.migrator.upload_attachments().await.unwrap();

    assert_eq!(report.tally.succeeded, 1);
    assert_eq!(report.tally.failed, 1);
    assert_eq!(h.tracker.count("upload_attachment PROJ-1"), 2);
    assert_eq!(h.tracker.count("upload_attachment"), 2);

    let skipped: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MigrationEvent::GroupSkipped { source_id } => Some(source_id.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["b", "zzz"]);
    assert!(matches!(
        h.sink.events().first(),
        Some(MigrationEvent::PhaseStarted {
            phase: Phase::UploadAttachments,
            items: 2,
        })
    ));
    assert_eq!(
        h.sink.count(|e| matches!(e, MigrationEvent::FileFailed { .. })),
        1
    );
}

// ---------------------------------------------------------------------------
// Whole run
// ---------------------------------------------------------------------------

fn pivotal_source() -> Vec<Record> {
    vec![Record::new()
        .with(pivotal::ID, "42")
        .with(pivotal::TITLE, "Import me")
        .with(pivotal::TYPE, "bug")
        .with(pivotal::CURRENT_STATE, "unstarted")
        .with(pivotal::ESTIMATE, "2")]
}

#[tokio::test]
async fn failed_auth_aborts_before_any_phase() {
    let store = MemoryStore {
        source: pivotal_source(),
        ..MemoryStore::default()
    };
    let tracker = FakeTracker {
        reject_auth: true,
        ..FakeTracker::default()
    };
    let h = harness(tracker, store, StaticCatalog::default(), 1);

    let err = h.migrator.run(PhaseSelection::default()).await.unwrap_err();

    assert!(matches!(err, MigrationError::Authentication(_)));
    assert_eq!(h.store.saves.load(Ordering::SeqCst), 0);
    assert_eq!(h.tracker.calls(), vec!["check_auth"]);
}

#[tokio::test]
async fn convert_only_stops_after_conversion() {
    let store = MemoryStore {
        source: pivotal_source(),
        ..MemoryStore::default()
    };
    let h = harness(FakeTracker::default(), store, StaticCatalog::default(), 1);

    let report = h
        .migrator
        .run(PhaseSelection {
            convert_only: true,
            ..PhaseSelection::default()
        })
        .await
        .unwrap();

    assert_eq!(report.phases.len(), 1);
    assert_eq!(report.phases[0].phase, Phase::Convert);
    assert_eq!(h.tracker.calls(), vec!["check_auth"]);
    let ledger = h.store.ledger();
    assert_eq!(ledger.rows()[0].get(columns::SOURCE_ID), "42");
    assert_eq!(ledger.rows()[0].get(columns::STATUS), "Backlog");
}

#[tokio::test]
async fn full_run_executes_every_phase_in_order() {
    let store = MemoryStore {
        source: pivotal_source(),
        ..MemoryStore::default()
    };
    let catalog = StaticCatalog(vec![AttachmentGroup {
        source_id: source_id("42"),
        files: vec![PathBuf::from("42/screenshot.png")],
    }]);
    let h = harness(FakeTracker::default(), store, catalog, 4);

    let report = h.migrator.run(PhaseSelection::default()).await.unwrap();

    let phases: Vec<Phase> = report.phases.iter().map(|p| p.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::Convert, Phase::Import, Phase::UploadAttachments]
    );
    assert_eq!(report.failures(), 0);
    assert_eq!(h.tracker.count("upload_attachment PROJ-1"), 1);
    assert!(matches!(
        h.sink.events().last(),
        Some(MigrationEvent::PhaseFinished { phase: Phase::Migration, .. })
    ));
}

#[test]
fn phase_selection_matches_the_all_in_one_switches() {
    let all = PhaseSelection::default();
    assert!(all.runs_convert() && all.runs_import() && all.runs_attachments());

    let import_only = PhaseSelection {
        import_only: true,
        ..all
    };
    assert!(!import_only.runs_convert());
    assert!(import_only.runs_import());
    assert!(!import_only.runs_attachments());

    let attachments_only = PhaseSelection {
        attachments_only: true,
        ..all
    };
    assert!(!attachments_only.runs_convert());
    assert!(!attachments_only.runs_import());
    assert!(attachments_only.runs_attachments());
}
