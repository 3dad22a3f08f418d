use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Lifecycle status of one planner action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ActionStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_finished(self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Pending => "PENDING",
            ActionStatus::Executing => "EXECUTING",
            ActionStatus::Completed => "COMPLETED",
            ActionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete unit of work performed by the planner.
///
/// `duration_ms` stays `None` until the action finishes. The wire name of the
/// field is `duration` (milliseconds), matching the trace format served by the
/// learning-plan API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub name: String,
    pub status: ActionStatus,
    #[serde(default, rename = "duration")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ActionRecord {
    pub fn new(name: impl Into<String>, status: ActionStatus, duration_ms: Option<u64>) -> Self {
        Self {
            name: name.into(),
            status,
            duration_ms,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn pending(name: impl Into<String>) -> Self {
        Self::new(name, ActionStatus::Pending, None)
    }

    pub fn executing(name: impl Into<String>) -> Self {
        Self::new(name, ActionStatus::Executing, None)
    }

    pub fn completed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, ActionStatus::Completed, Some(duration_ms))
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, ActionStatus::Failed, Some(duration_ms))
    }

    /// Sets the start timestamp.
    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    /// Closes the record with a terminal status at `at`.
    ///
    /// The duration is derived from `started_at` when known; an earlier `at`
    /// than the start clamps to zero.
    pub fn finish(&mut self, status: ActionStatus, at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(at);
        if let Some(started) = self.started_at {
            let elapsed = (at - started).num_milliseconds().max(0);
            self.duration_ms = Some(elapsed as u64);
        }
    }

    /// Duration counted by analytics: only finished, timed `Completed` records.
    pub fn completed_duration(&self) -> Option<u64> {
        match self.status {
            ActionStatus::Completed => self.duration_ms,
            _ => None,
        }
    }
}

/// Checks a trace for structurally invalid records.
///
/// Negative durations cannot be represented (they fail at decode time in
/// [`parse_trace`]); this catches the remaining programmer errors.
pub fn validate_trace(records: &[ActionRecord]) -> Result<(), TelemetryError> {
    for (index, record) in records.iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(TelemetryError::InvalidRecord {
                index,
                reason: "action name must not be empty".into(),
            });
        }
        if let (Some(started), Some(completed)) = (record.started_at, record.completed_at)
            && completed < started
        {
            return Err(TelemetryError::InvalidRecord {
                index,
                reason: format!("completedAt {completed} is earlier than startedAt {started}"),
            });
        }
    }
    Ok(())
}

/// Decodes and validates a JSON array of action records.
pub fn parse_trace(json: &str) -> Result<Vec<ActionRecord>, TelemetryError> {
    let records: Vec<ActionRecord> = serde_json::from_str(json)?;
    if let Err(err) = validate_trace(&records) {
        tracing::warn!(error = %err, "rejecting action trace");
        return Err(err);
    }
    tracing::debug!(records = records.len(), "decoded action trace");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn decodes_wire_shape() {
        let records = parse_trace(
            r#"[
                {"name":"fetch prerequisites","status":"COMPLETED","duration":1200,
                 "startedAt":"2026-01-01T10:00:00Z","completedAt":"2026-01-01T10:00:01.200Z"},
                {"name":"rank paths","status":"EXECUTING","duration":null}
            ]"#,
        )
        .expect("valid trace");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, ActionStatus::Completed);
        assert_eq!(records[0].duration_ms, Some(1200));
        assert_eq!(records[1].duration_ms, None);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = parse_trace(r#"[{"name":"a","status":"COMPLETED","duration":-5}]"#)
            .expect_err("negative duration");
        assert!(matches!(err, TelemetryError::Decode(_)));
    }

    #[test]
    fn completion_before_start_is_rejected() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 5).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let mut record = ActionRecord::completed("a", 0).started_at(start);
        record.completed_at = Some(end);
        let err = validate_trace(&[record]).expect_err("inverted timestamps");
        assert!(matches!(err, TelemetryError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn finish_derives_duration_from_timestamps() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let mut record = ActionRecord::executing("rank paths").started_at(start);
        record.finish(
            ActionStatus::Completed,
            start + chrono::Duration::milliseconds(2500),
        );
        assert_eq!(record.duration_ms, Some(2500));
        assert_eq!(record.completed_duration(), Some(2500));
    }

    #[test]
    fn failed_records_have_no_completed_duration() {
        assert_eq!(ActionRecord::failed("a", 40).completed_duration(), None);
    }
}
