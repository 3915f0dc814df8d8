//! Composition root: builds the adapters and runs the selected command.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use engine::{convert_export, Migrator, ReprocessPolicy, RunReport};
use jira::JiraClient;
use migration::{EventSink, IssueTracker, RunId, StatusMap, TracingSink, UserDirectory};
use store::{load_status_map, load_user_directory, CsvRecordStore, DirectoryCatalog};
use tracing::{info, info_span, Instrument};

use crate::args::{Cli, Command};
use crate::config::{jira_config, AppConfig};

/// How a command that did not abort ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every item succeeded.
    Clean,
    /// The command ran to the end but some records or files failed.
    ItemFailures(usize),
}

impl Completion {
    fn from_report(report: &RunReport) -> Self {
        match report.failures() {
            0 => Self::Clean,
            n => Self::ItemFailures(n),
        }
    }
}

/// Runs `cli.command` under a root span carrying a fresh [`RunId`].
pub async fn execute(cli: Cli) -> Result<Completion> {
    let run_id = RunId::new_random();
    let span = info_span!("tracker_migrate", run_id = %run_id);
    async move {
        let started = Instant::now();
        let completion = dispatch(&cli).await;
        info!(elapsed = ?started.elapsed(), "finished");
        completion
    }
    .instrument(span)
    .await
}

async fn dispatch(cli: &Cli) -> Result<Completion> {
    let config = AppConfig::from_cli(cli)?;
    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let store = Arc::new(CsvRecordStore::new(&config.pivotal_csv, &config.jira_csv));

    let report = match &cli.command {
        Command::Convert => RunReport {
            phases: vec![convert_export(
                store.as_ref(),
                &statuses(&config)?,
                events.as_ref(),
            )?],
        },
        Command::AuthCheck => {
            tracker(cli, &config, events)?
                .check_auth()
                .await
                .context("Jira rejected the configured credentials")?;
            info!("authentication succeeded");
            RunReport::default()
        }
        Command::Import(args) => {
            let migrator = migrator(cli, &config, store, events, args.policy())?;
            migrator.check_auth().await?;
            RunReport {
                phases: vec![migrator.import().await?],
            }
        }
        Command::Attachments => {
            let migrator = migrator(cli, &config, store, events, ReprocessPolicy::default())?;
            migrator.check_auth().await?;
            RunReport {
                phases: vec![migrator.upload_attachments().await?],
            }
        }
        Command::Run(args) => {
            migrator(cli, &config, store, events, args.policy.policy())?
                .run(args.selection())
                .await?
        }
    };
    Ok(Completion::from_report(&report))
}

fn migrator(
    cli: &Cli,
    config: &AppConfig,
    store: Arc<CsvRecordStore>,
    events: Arc<dyn EventSink>,
    policy: ReprocessPolicy,
) -> Result<Migrator> {
    let tracker = tracker(cli, config, Arc::clone(&events))?;
    Ok(Migrator::new(
        tracker,
        store,
        Arc::new(DirectoryCatalog::new(&config.attachments_folder)),
        events,
        config.runner,
    )
    .with_statuses(statuses(config)?)
    .with_policy(policy))
}

fn tracker(
    cli: &Cli,
    config: &AppConfig,
    events: Arc<dyn EventSink>,
) -> Result<Arc<dyn IssueTracker>> {
    let jira = jira_config(&cli.jira)?;
    info!(
        site = %jira.base_url,
        project = %jira.project_key,
        concurrency = config.runner.limit(),
        "target configured"
    );
    let users = match &config.user_mapping {
        Some(path) => load_user_directory(path)?,
        None => UserDirectory::default(),
    };
    let client = JiraClient::connect(&jira, events)
        .context("failed to set up the Jira HTTP client")?
        .with_users(users);
    Ok(Arc::new(client))
}

fn statuses(config: &AppConfig) -> Result<StatusMap> {
    Ok(match &config.status_mapping {
        Some(path) => load_status_map(path)?,
        None => StatusMap::default(),
    })
}
