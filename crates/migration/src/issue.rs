//! Building the target-side view of one converted record.

use crate::{columns, IssueType, Record};

/// Summary used when a record has no title.
pub const UNTITLED_SUMMARY: &str = "No Title";

/// Everything needed to create one issue in the target tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub labels: Vec<String>,
    pub issue_type: IssueType,
    /// Source user name; resolved against the user directory by the tracker.
    pub reporter: String,
    /// Source user name; resolved against the user directory by the tracker.
    pub assignee: String,
}

impl NewIssue {
    /// Builds the issue for a converted record.
    ///
    /// The summary is prefixed with the source id so created issues can be
    /// traced back to the export.
    pub fn from_record(record: &Record) -> Self {
        let title = match record.get(columns::TITLE) {
            "" => UNTITLED_SUMMARY,
            title => title,
        };

        Self {
            summary: format!("[{}] {}", record.get(columns::SOURCE_ID), title),
            description: record.get(columns::DESCRIPTION).to_owned(),
            labels: split_labels(record.get(columns::LABELS)),
            issue_type: IssueType::from_source(record.get(columns::TYPE)),
            reporter: record.get(columns::REPORTER).to_owned(),
            assignee: record.get(columns::ASSIGNEE).to_owned(),
        }
    }
}

/// Collapses line breaks and whitespace runs into single spaces.
pub fn normalize_summary(summary: &str) -> String {
    summary.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a comma-separated label cell, trimming each label and dropping
/// blanks.
pub fn split_labels(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Story points of a converted record, when positive.
///
/// Fractional estimates are truncated; anything unparseable counts as none.
pub fn story_points(record: &Record) -> Option<u32> {
    let cell = record.get(columns::STORY_POINTS).trim();
    let points = cell
        .parse::<i64>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?;
    u32::try_from(points).ok().filter(|p| *p > 0)
}
