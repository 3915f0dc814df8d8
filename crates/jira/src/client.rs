//! [`IssueTracker`] implementation over the Jira REST API v2.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use migration::{
    normalize_summary, EventSink, FieldId, IssueKey, IssueTracker, NewIssue, ProjectKey,
    TrackerError, TrackerOperation, TransitionId, UserDirectory,
};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::multipart::MultipartForm;
use crate::payloads::{
    AccountRef, CommentRequest, CreateIssueRequest, CreatedIssue, IdRef, IssueFields, KeyRef,
    NameRef, TransitionRequest, TransitionsResponse, UpdateFieldsRequest,
};
use crate::{
    HttpRequest, HttpResponse, HttpTransport, JiraConfig, RateLimitedTransport, ReqwestTransport,
    TransportError,
};

const API_PREFIX: &str = "/rest/api/2";

/// Jira REST client.
///
/// Every request goes through the injected [`HttpTransport`]; the production
/// stack built by [`JiraClient::connect`] is a [`ReqwestTransport`] wrapped in
/// a [`RateLimitedTransport`].
pub struct JiraClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    project_key: ProjectKey,
    story_point_field: FieldId,
    users: UserDirectory,
}

impl JiraClient {
    pub fn new(config: &JiraConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            project_key: config.project_key.clone(),
            story_point_field: config.story_point_field.clone(),
            users: UserDirectory::default(),
        }
    }

    /// Builds the production transport stack for `config`.
    pub fn connect(config: &JiraConfig, events: Arc<dyn EventSink>) -> Result<Self, TransportError> {
        let http = ReqwestTransport::new(&config.email, &config.api_token, config.request_timeout)?;
        let transport =
            RateLimitedTransport::new(http, events).with_backoff(config.rate_limit_backoff);
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Directory used to resolve reporters and assignees on creation.
    #[must_use]
    pub fn with_users(mut self, users: UserDirectory) -> Self {
        self.users = users;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn json_request<T: serde::Serialize>(
        &self,
        operation: TrackerOperation,
        method: Method,
        path: &str,
        payload: &T,
    ) -> Result<HttpRequest, TrackerError> {
        HttpRequest::json(method, self.url(path), payload).map_err(|e| TrackerError::Decode {
            operation,
            message: format!("cannot encode request: {e}"),
        })
    }

    /// Sends `request` and accepts only the listed status codes.
    async fn send(
        &self,
        operation: TrackerOperation,
        request: HttpRequest,
        accepted: &[u16],
    ) -> Result<HttpResponse, TrackerError> {
        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|e| TrackerError::Transport {
                operation,
                message: e.to_string(),
            })?;

        if accepted.contains(&response.status) {
            Ok(response)
        } else {
            Err(TrackerError::Rejected {
                operation,
                status: response.status,
                body: response.text(),
            })
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    operation: TrackerOperation,
    response: &HttpResponse,
) -> Result<T, TrackerError> {
    response.json().map_err(|e| TrackerError::Decode {
        operation,
        message: e.to_string(),
    })
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn check_auth(&self) -> Result<(), TrackerError> {
        let request = HttpRequest::get(self.url("/myself"));
        self.send(TrackerOperation::CheckAuth, request, &[200]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(summary = %issue.summary))]
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueKey, TrackerError> {
        const OP: TrackerOperation = TrackerOperation::CreateIssue;

        let people = self
            .users
            .resolve(&issue.description, &issue.reporter, &issue.assignee);
        let payload = CreateIssueRequest {
            fields: IssueFields {
                project: KeyRef {
                    key: self.project_key.as_str(),
                },
                summary: normalize_summary(&issue.summary),
                description: people.description,
                issue_type: NameRef {
                    name: issue.issue_type.target_name(),
                },
                labels: &issue.labels,
                assignee: people.assignee.as_ref().map(|a| AccountRef { id: a.as_str() }),
                reporter: people.reporter.as_ref().map(|a| AccountRef { id: a.as_str() }),
            },
        };
        let request = self.json_request(OP, Method::POST, "/issue", &payload)?;
        let response = self.send(OP, request, &[201]).await?;

        let created: CreatedIssue = decode(OP, &response)?;
        let key = IssueKey::new(created.key).ok_or_else(|| TrackerError::Decode {
            operation: OP,
            message: "response carries an empty issue key".to_owned(),
        })?;
        debug!(issue_key = %key, "issue created");
        Ok(key)
    }

    async fn set_story_points(&self, key: &IssueKey, points: u32) -> Result<(), TrackerError> {
        const OP: TrackerOperation = TrackerOperation::SetStoryPoints;

        let payload = UpdateFieldsRequest {
            fields: BTreeMap::from([(self.story_point_field.as_str(), points)]),
        };
        let request = self.json_request(OP, Method::PUT, &format!("/issue/{key}"), &payload)?;
        self.send(OP, request, &[204]).await?;
        Ok(())
    }

    async fn list_transitions(
        &self,
        key: &IssueKey,
    ) -> Result<HashMap<String, TransitionId>, TrackerError> {
        const OP: TrackerOperation = TrackerOperation::ListTransitions;

        let request = HttpRequest::get(self.url(&format!("/issue/{key}/transitions")));
        let response = self.send(OP, request, &[200]).await?;
        let listed: TransitionsResponse = decode(OP, &response)?;

        Ok(listed
            .transitions
            .into_iter()
            .filter_map(|entry| {
                let id = TransitionId::new(entry.id?)?;
                let name = entry.to?.name?;
                Some((name.to_lowercase(), id))
            })
            .collect())
    }

    async fn transition(
        &self,
        key: &IssueKey,
        transition: &TransitionId,
    ) -> Result<(), TrackerError> {
        const OP: TrackerOperation = TrackerOperation::ApplyStatus;

        let payload = TransitionRequest {
            transition: IdRef {
                id: transition.as_str(),
            },
        };
        let request = self.json_request(
            OP,
            Method::POST,
            &format!("/issue/{key}/transitions"),
            &payload,
        )?;
        self.send(OP, request, &[204]).await?;
        Ok(())
    }

    async fn post_comment(&self, key: &IssueKey, text: &str) -> Result<(), TrackerError> {
        const OP: TrackerOperation = TrackerOperation::AddComment;

        let payload = CommentRequest { body: text };
        let request =
            self.json_request(OP, Method::POST, &format!("/issue/{key}/comment"), &payload)?;
        self.send(OP, request, &[200, 201]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(issue_key = %key, file = %file.display()))]
    async fn upload_attachment(&self, key: &IssueKey, file: &Path) -> Result<(), TrackerError> {
        let contents = tokio::fs::read(file)
            .await
            .map_err(|source| TrackerError::File {
                path: file.to_path_buf(),
                source,
            })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let form = MultipartForm::new().file("file", &file_name, &contents);
        let request = HttpRequest::new(
            Method::POST,
            self.url(&format!("/issue/{key}/attachments")),
        )
        .with_header("Content-Type", form.content_type())
        .with_header("X-Atlassian-Token", "no-check")
        .with_body(form.finish());

        self.send(TrackerOperation::UploadAttachment, request, &[200])
            .await?;
        Ok(())
    }
}
