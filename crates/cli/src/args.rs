//! Command-line surface.
//!
//! Every option can also be supplied through the environment variable named
//! in its help text, so an exported shell environment or a CI secret store
//! configures the tool without flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{PhaseSelection, ReprocessPolicy, DEFAULT_CONCURRENCY};
use jira::DEFAULT_STORY_POINT_FIELD;

/// Migrate a Pivotal Tracker CSV export into a Jira project.
#[derive(Debug, Parser)]
#[command(name = "tracker-migrate", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub jira: JiraArgs,

    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub telemetry: TelemetryArgs,

    /// Maximum number of records or files processed at the same time.
    #[arg(long, global = true, env = "MAX_CONCURRENT", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify the Jira credentials and exit.
    AuthCheck,
    /// Convert the Pivotal export into the import file. Needs no credentials.
    Convert,
    /// Create one Jira issue per row of the import file.
    Import(PolicyArgs),
    /// Upload attachment folders to the issues created by `import`.
    Attachments,
    /// Authenticate, then run convert, import and attachments in order.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct JiraArgs {
    /// Jira site URL, e.g. https://acme.atlassian.net.
    #[arg(long, global = true, env = "JIRA_URL")]
    pub jira_url: Option<String>,

    /// Account e-mail used with the API token.
    #[arg(long, global = true, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    #[arg(long, global = true, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_api_token: Option<String>,

    /// Key of the project issues are created in.
    #[arg(long, global = true, env = "JIRA_PROJECT_KEY")]
    pub project_key: Option<String>,

    /// Custom field id holding story points.
    #[arg(long, global = true, env = "JIRA_STORY_POINT_FIELD", default_value = DEFAULT_STORY_POINT_FIELD)]
    pub story_point_field: String,
}

#[derive(Debug, Args)]
pub struct PathArgs {
    /// Pivotal Tracker CSV export.
    #[arg(long, global = true, env = "PIVOTAL_CSV", default_value = "pivotal.csv")]
    pub pivotal_csv: PathBuf,

    /// Import file written by `convert` and updated by `import`.
    #[arg(long, global = true, env = "JIRA_CSV", default_value = "jira_import_ready.csv")]
    pub jira_csv: PathBuf,

    /// Folder holding one sub-folder of attachments per Pivotal story id.
    #[arg(long, global = true, env = "ATTACHMENTS_FOLDER", default_value = "attachments")]
    pub attachments_folder: PathBuf,

    /// JSON object mapping Pivotal user names to Jira account ids.
    #[arg(long, global = true, env = "USER_MAPPING")]
    pub user_mapping: Option<PathBuf>,

    /// JSON object mapping Pivotal states to Jira status names.
    ///
    /// Replaces the built-in table, which targets English workflow names:
    /// unscheduled, unstarted and rejected map to Backlog;
    /// started=In Progress; finished=REVIEWS; delivered=RELEASED;
    /// accepted=Accepted. Sites whose workflow uses localized status names
    /// must supply this file.
    #[arg(long, global = true, env = "STATUS_MAPPING")]
    pub status_mapping: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TelemetryArgs {
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP/gRPC collector endpoint; traces are exported when set.
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Args)]
pub struct PolicyArgs {
    /// Leave rows that already carry an issue key untouched.
    #[arg(long)]
    pub skip_created: bool,
}

impl PolicyArgs {
    pub fn policy(&self) -> ReprocessPolicy {
        if self.skip_created {
            ReprocessPolicy::SkipCreated
        } else {
            ReprocessPolicy::ReprocessAll
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Stop after the conversion.
    #[arg(long)]
    pub convert_only: bool,

    /// Only create issues from an existing import file.
    #[arg(long)]
    pub import_only: bool,

    /// Only upload attachments for an existing import file.
    #[arg(long)]
    pub attachments_only: bool,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

impl RunArgs {
    pub fn selection(&self) -> PhaseSelection {
        PhaseSelection {
            convert_only: self.convert_only,
            import_only: self.import_only,
            attachments_only: self.attachments_only,
        }
    }
}
