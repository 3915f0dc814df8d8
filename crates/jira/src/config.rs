//! Connection settings for a Jira site.

use std::time::Duration;

use migration::{FieldId, MigrationError, ProjectKey};

use crate::{DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_REQUEST_TIMEOUT};

/// Custom field holding story points on Jira Cloud's default schemes.
pub const DEFAULT_STORY_POINT_FIELD: &str = "customfield_10016";

/// Validated Jira connection settings.
#[derive(Clone)]
pub struct JiraConfig {
    /// Site URL without a trailing `/`, e.g. `https://acme.atlassian.net`.
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: ProjectKey,
    pub story_point_field: FieldId,
    pub request_timeout: Duration,
    pub rate_limit_backoff: Duration,
}

impl JiraConfig {
    /// Validates the raw values.
    ///
    /// Every value must be non-blank. A trailing `/` on `base_url` is removed.
    pub fn new(
        base_url: &str,
        email: &str,
        api_token: &str,
        project_key: &str,
        story_point_field: &str,
    ) -> Result<Self, MigrationError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(missing("Jira URL"));
        }
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(MigrationError::Configuration {
                message: format!("Jira URL must start with http:// or https://, got '{base_url}'"),
            });
        }
        let email = email.trim();
        if email.is_empty() {
            return Err(missing("Jira e-mail"));
        }
        if api_token.trim().is_empty() {
            return Err(missing("Jira API token"));
        }
        let project_key = ProjectKey::new(project_key.trim()).ok_or_else(|| missing("Jira project key"))?;
        let story_point_field =
            FieldId::new(story_point_field.trim()).ok_or_else(|| missing("story point field"))?;

        Ok(Self {
            base_url: base_url.to_owned(),
            email: email.to_owned(),
            api_token: api_token.trim().to_owned(),
            project_key,
            story_point_field,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        })
    }
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("project_key", &self.project_key)
            .field("story_point_field", &self.story_point_field)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit_backoff", &self.rate_limit_backoff)
            .finish()
    }
}

fn missing(what: &str) -> MigrationError {
    MigrationError::Configuration {
        message: format!("{what} is required"),
    }
}
