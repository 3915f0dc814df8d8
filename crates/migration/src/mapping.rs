//! Translation tables between the source and target trackers.
//!
//! The issue-type table is fixed. The status table and the user directory are
//! per-deployment data: both deserialize from a flat JSON object and are
//! injected into the components that need them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::AccountId;

// ---------------------------------------------------------------------------
// Issue types
// ---------------------------------------------------------------------------

/// Target issue type for a source story type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueType {
    Bug,
    Feature,
    Chore,
    Epic,
    Release,
    Task,
}

impl IssueType {
    /// Maps a source type name, case-insensitively. Unknown or blank types
    /// become [`IssueType::Task`].
    pub fn from_source(source: &str) -> Self {
        match source.trim().to_lowercase().as_str() {
            "bug" => Self::Bug,
            "feature" | "story" => Self::Feature,
            "chore" => Self::Chore,
            "epic" => Self::Epic,
            "release" => Self::Release,
            _ => Self::Task,
        }
    }

    /// Issue type name as configured in the target project.
    pub fn target_name(self) -> &'static str {
        match self {
            Self::Bug => "Bug",
            Self::Feature => "feature",
            Self::Chore => "chore",
            Self::Epic => "Epic",
            Self::Release => "release",
            Self::Task => "Task",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.target_name())
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Status name the target tracker creates issues in.
pub const BACKLOG_STATUS: &str = "Backlog";

/// Returns `true` if `status` names the default state of a new issue, in
/// which case no transition is needed.
pub fn is_backlog(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case(BACKLOG_STATUS)
}

/// Source workflow state → target status name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusMap(HashMap<String, String>);

impl<'de> Deserialize<'de> for StatusMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        HashMap::<String, String>::deserialize(deserializer).map(Self::from_pairs)
    }
}

impl StatusMap {
    /// Builds a map from `(source state, target status)` pairs. Source states
    /// are matched case-insensitively.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        )
    }

    /// Target status for a source state; empty when the state is unmapped.
    pub fn target_for(&self, source_state: &str) -> &str {
        self.0
            .get(&source_state.trim().to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Default for StatusMap {
    fn default() -> Self {
        Self::from_pairs([
            ("unscheduled", BACKLOG_STATUS),
            ("unstarted", BACKLOG_STATUS),
            ("rejected", BACKLOG_STATUS),
            ("started", "In Progress"),
            ("finished", "REVIEWS"),
            ("delivered", "RELEASED"),
            ("accepted", "Accepted"),
        ])
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Source user name → target account id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserDirectory(HashMap<String, AccountId>);

/// Reporter/assignee resolution for one new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeople {
    pub assignee: Option<AccountId>,
    pub reporter: Option<AccountId>,
    /// Description with a free-text line appended for each unmapped person.
    pub description: String,
}

impl UserDirectory {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, AccountId)>,
        K: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn lookup(&self, user: &str) -> Option<&AccountId> {
        self.0.get(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves reporter and assignee. People missing from the directory are
    /// recorded as text in the description rather than dropped.
    pub fn resolve(&self, description: &str, reporter: &str, assignee: &str) -> ResolvedPeople {
        let mut description = description.to_owned();

        let mut resolve_one = |user: &str, label: &str| -> Option<AccountId> {
            if user.is_empty() {
                return None;
            }
            match self.lookup(user) {
                Some(account) => Some(account.clone()),
                None => {
                    description.push_str(&format!("\n\n{label}: {user}"));
                    None
                }
            }
        };

        let assignee = resolve_one(assignee, "Assignee");
        let reporter = resolve_one(reporter, "Reporter");

        ResolvedPeople {
            assignee,
            reporter,
            description,
        }
    }
}
