//! Pure conversion of Pivotal export rows into import-ready rows.
//!
//! No network and no file access: the caller loads source records through the
//! [`RecordStore`](crate::RecordStore) and writes the result back through it.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::{columns, pivotal, MigrationError, Record, StatusMap};

/// Timestamp layouts found in Pivotal exports, tried in order.
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%m/%d/%y %I:%M %p", "%d/%b/%y %I:%M %p"];
const DATE_FORMATS: [&str; 1] = ["%b %d, %Y"];

/// Timestamp layout the import file uses.
const TARGET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f+0000";

/// Converts every source record. Fails only when there is nothing to convert.
pub fn convert_records(
    records: &[Record],
    statuses: &StatusMap,
) -> Result<Vec<Record>, MigrationError> {
    if records.is_empty() {
        return Err(MigrationError::NothingToConvert);
    }

    let mut converted = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        converted.push(convert_record(record, statuses));
        if i > 0 && i % 100 == 0 {
            info!(done = i, total = records.len(), "converting records");
        }
    }
    Ok(converted)
}

/// Maps one Pivotal row onto the import schema.
pub fn convert_record(source: &Record, statuses: &StatusMap) -> Record {
    let story_points = source
        .get(pivotal::ESTIMATE)
        .trim()
        .parse::<i64>()
        .unwrap_or(0);

    Record::new()
        .with(columns::SOURCE_ID, source.get(pivotal::ID))
        .with(columns::TITLE, source.get(pivotal::TITLE))
        .with(columns::DESCRIPTION, source.get(pivotal::DESCRIPTION))
        .with(columns::LABELS, source.get(pivotal::LABELS))
        .with(columns::TYPE, source.get(pivotal::TYPE))
        .with(columns::STATUS, statuses.target_for(source.get(pivotal::CURRENT_STATE)))
        .with(columns::STORY_POINTS, story_points.to_string())
        .with(columns::CREATED_DATE, convert_date(source.get(pivotal::CREATED_AT)))
        .with(columns::RESOLVED_DATE, convert_date(source.get(pivotal::ACCEPTED_AT)))
        .with(columns::ASSIGNEE, source.get(pivotal::OWNED_BY))
        .with(columns::REPORTER, source.get(pivotal::REQUESTED_BY))
        .with(columns::COMMENT, source.get(pivotal::COMMENT))
        .with(columns::TARGET_KEY, "")
}

/// Reformats a Pivotal timestamp; unparseable values become empty.
pub fn convert_date(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    let parsed = DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    match parsed {
        Some(ts) => ts.format(TARGET_FORMAT).to_string(),
        None => {
            warn!(value, "unrecognised date format; leaving blank");
            String::new()
        }
    }
}
