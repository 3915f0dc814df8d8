//! Validated runtime configuration built from the parsed command line.

use std::path::PathBuf;

use engine::BoundedRunner;
use jira::JiraConfig;
use migration::MigrationError;

use crate::args::{Cli, JiraArgs};

/// Settings shared by every subcommand.
#[derive(Debug)]
pub struct AppConfig {
    pub pivotal_csv: PathBuf,
    pub jira_csv: PathBuf,
    pub attachments_folder: PathBuf,
    pub user_mapping: Option<PathBuf>,
    pub status_mapping: Option<PathBuf>,
    pub runner: BoundedRunner,
}

impl AppConfig {
    /// Rejects a concurrency of zero.
    pub fn from_cli(cli: &Cli) -> Result<Self, MigrationError> {
        Ok(Self {
            pivotal_csv: cli.paths.pivotal_csv.clone(),
            jira_csv: cli.paths.jira_csv.clone(),
            attachments_folder: cli.paths.attachments_folder.clone(),
            user_mapping: cli.paths.user_mapping.clone(),
            status_mapping: cli.paths.status_mapping.clone(),
            runner: BoundedRunner::new(cli.concurrency)?,
        })
    }
}

/// Builds the Jira settings; fails when a required value is unset or blank.
pub fn jira_config(args: &JiraArgs) -> Result<JiraConfig, MigrationError> {
    let required = |value: &Option<String>, variable: &str| -> Result<String, MigrationError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| MigrationError::Configuration {
                message: format!("{variable} is not set"),
            })
    };

    JiraConfig::new(
        &required(&args.jira_url, "JIRA_URL")?,
        &required(&args.jira_email, "JIRA_EMAIL")?,
        &required(&args.jira_api_token, "JIRA_API_TOKEN")?,
        &required(&args.project_key, "JIRA_PROJECT_KEY")?,
        &args.story_point_field,
    )
}
