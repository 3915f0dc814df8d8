//! Jira REST v2 request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateIssueRequest<'a> {
    pub fields: IssueFields<'a>,
}

#[derive(Debug, Serialize)]
pub struct IssueFields<'a> {
    pub project: KeyRef<'a>,
    pub summary: String,
    pub description: String,
    #[serde(rename = "issuetype")]
    pub issue_type: NameRef<'a>,
    pub labels: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AccountRef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<AccountRef<'a>>,
}

#[derive(Debug, Serialize)]
pub struct KeyRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NameRef<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AccountRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
}

/// `PUT /issue/{key}` body updating arbitrary fields by id.
#[derive(Debug, Serialize)]
pub struct UpdateFieldsRequest<'a, V> {
    pub fields: BTreeMap<&'a str, V>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionsResponse {
    pub transitions: Vec<TransitionEntry>,
}

/// Entries missing an id or target name are ignored by the client.
#[derive(Debug, Deserialize)]
pub struct TransitionEntry {
    pub id: Option<String>,
    pub to: Option<TransitionTarget>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionTarget {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionRequest<'a> {
    pub transition: IdRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct IdRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CommentRequest<'a> {
    pub body: &'a str,
}
