//! Run event protocol: the fixed vocabulary of frames pushed by the planning service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sse::SseFrame;

/// Message carried by the `Error` event synthesized for an undecodable frame.
pub const PARSE_FAILURE_MESSAGE: &str = "failed to parse stream frame";

/// Discriminant of a [`RunEvent`], also its wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    AgentStarted,
    PlanningStarted,
    ActionExecuted,
    Progress,
    AgentCompleted,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::AgentStarted,
        EventKind::PlanningStarted,
        EventKind::ActionExecuted,
        EventKind::Progress,
        EventKind::AgentCompleted,
        EventKind::Error,
    ];

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_wire() == name)
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            EventKind::AgentStarted => "agent_started",
            EventKind::PlanningStarted => "planning_started",
            EventKind::ActionExecuted => "action_executed",
            EventKind::Progress => "progress",
            EventKind::AgentCompleted => "agent_completed",
            EventKind::Error => "error",
        }
    }

    /// `AgentCompleted` and `Error` end the run.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::AgentCompleted | EventKind::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One decoded frame of the push channel.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    AgentStarted,
    PlanningStarted,
    ActionExecuted { action_name: String },
    /// Informational; the payload shape is owned by the producer.
    Progress { payload: serde_json::Value },
    AgentCompleted { result: PlanResult },
    Error { message: String },
}

impl RunEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RunEvent::AgentStarted => EventKind::AgentStarted,
            RunEvent::PlanningStarted => EventKind::PlanningStarted,
            RunEvent::ActionExecuted { .. } => EventKind::ActionExecuted,
            RunEvent::Progress { .. } => EventKind::Progress,
            RunEvent::AgentCompleted { .. } => EventKind::AgentCompleted,
            RunEvent::Error { .. } => EventKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    pub(crate) fn parse_failure() -> Self {
        RunEvent::Error {
            message: PARSE_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// A [`RunEvent`] together with the time it arrived at the client.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedEvent {
    pub received_at: DateTime<Utc>,
    pub event: RunEvent,
}

/// Finished curriculum delivered by the terminal `agent_completed` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub curriculum: Vec<CurriculumStep>,
    pub path: String,
    #[serde(alias = "generation_time_seconds")]
    pub generation_time_seconds: f64,
    #[serde(alias = "estimated_cost")]
    pub estimated_cost: f64,
}

/// One step of a generated curriculum.
///
/// The producer may send either a bare technology name or an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StepWire")]
pub struct CurriculumStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

impl CurriculumStep {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            estimated_hours: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepWire {
    Name(String),
    Detailed(DetailedStep),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailedStep {
    #[serde(alias = "technology", alias = "title")]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "estimated_hours")]
    estimated_hours: Option<f64>,
}

impl From<StepWire> for CurriculumStep {
    fn from(value: StepWire) -> Self {
        match value {
            StepWire::Name(name) => CurriculumStep::named(name),
            StepWire::Detailed(step) => CurriculumStep {
                name: step.name,
                description: step.description,
                estimated_hours: step.estimated_hours,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionExecutedPayload {
    #[serde(alias = "action_name")]
    action_name: String,
}

#[derive(Deserialize)]
struct AgentCompletedPayload {
    result: PlanResult,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Decodes one SSE frame into a [`RunEvent`].
///
/// The kind comes from the SSE `event:` name, or from the payload's `type` field for
/// unnamed (`message`) frames. Returns `None` for frames outside the vocabulary
/// (keep-alives, unknown kinds). A frame of a known kind whose payload does not
/// decode becomes an `Error` event with [`PARSE_FAILURE_MESSAGE`].
pub fn decode_frame(frame: &SseFrame) -> Option<RunEvent> {
    let data = frame.data.trim();
    let parsed: Result<serde_json::Value, serde_json::Error> = if data.is_empty() {
        Ok(serde_json::Value::Null)
    } else {
        serde_json::from_str(data)
    };

    let named = frame
        .event
        .as_deref()
        .filter(|name| !name.is_empty() && *name != "message");
    let kind_name = match (named, &parsed) {
        (Some(name), _) => name.to_string(),
        (None, Ok(value)) => match value.get("type").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None if data.is_empty() => return None,
            None => {
                warn!("stream frame has no event name or type field");
                return Some(RunEvent::parse_failure());
            }
        },
        (None, Err(err)) => {
            warn!(error = %err, "stream frame is not valid JSON");
            return Some(RunEvent::parse_failure());
        }
    };

    let Some(kind) = EventKind::from_wire(&kind_name) else {
        debug!(kind = %kind_name, "ignoring frame outside the run event vocabulary");
        return None;
    };

    let value = match parsed {
        Ok(value) => value,
        Err(err) => {
            warn!(kind = %kind, error = %err, "stream frame payload is not valid JSON");
            return Some(RunEvent::parse_failure());
        }
    };

    let decoded = match kind {
        EventKind::AgentStarted => Ok(RunEvent::AgentStarted),
        EventKind::PlanningStarted => Ok(RunEvent::PlanningStarted),
        EventKind::Progress => Ok(RunEvent::Progress { payload: value }),
        EventKind::ActionExecuted => serde_json::from_value::<ActionExecutedPayload>(value)
            .map(|p| RunEvent::ActionExecuted {
                action_name: p.action_name,
            }),
        EventKind::AgentCompleted => serde_json::from_value::<AgentCompletedPayload>(value)
            .map(|p| RunEvent::AgentCompleted { result: p.result }),
        EventKind::Error => serde_json::from_value::<ErrorPayload>(value)
            .map(|p| RunEvent::Error { message: p.message }),
    };

    match decoded {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(kind = %kind, error = %err, "stream frame payload is missing required fields");
            Some(RunEvent::parse_failure())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_payload() -> String {
        serde_json::json!({
            "result": {
                "curriculum": ["Ownership", {"technology": "Async Rust", "estimatedHours": 6.5}],
                "path": "backend",
                "generationTimeSeconds": 42.5,
                "estimatedCost": 0.03
            }
        })
        .to_string()
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.as_wire()), Some(kind));
        }
        assert_eq!(EventKind::from_wire("ping"), None);
    }

    #[test]
    fn decodes_named_frames() {
        assert_eq!(
            decode_frame(&SseFrame::named("agent_started", "")),
            Some(RunEvent::AgentStarted)
        );
        assert_eq!(
            decode_frame(&SseFrame::named(
                "action_executed",
                r#"{"actionName":"fetch prerequisites"}"#
            )),
            Some(RunEvent::ActionExecuted {
                action_name: "fetch prerequisites".into()
            })
        );
        assert_eq!(
            decode_frame(&SseFrame::named("error", r#"{"message":"planner unavailable"}"#)),
            Some(RunEvent::Error {
                message: "planner unavailable".into()
            })
        );
    }

    #[test]
    fn decodes_completed_result_with_mixed_steps() {
        let event = decode_frame(&SseFrame::named("agent_completed", completed_payload()))
            .expect("event");
        let RunEvent::AgentCompleted { result } = event else {
            panic!("expected completion, got {event:?}");
        };
        assert_eq!(result.path, "backend");
        assert_eq!(result.generation_time_seconds, 42.5);
        assert_eq!(result.curriculum[0], CurriculumStep::named("Ownership"));
        assert_eq!(result.curriculum[1].name, "Async Rust");
        assert_eq!(result.curriculum[1].estimated_hours, Some(6.5));
    }

    #[test]
    fn unnamed_frames_use_type_field() {
        assert_eq!(
            decode_frame(&SseFrame::data(
                r#"{"type":"action_executed","action_name":"rank paths"}"#
            )),
            Some(RunEvent::ActionExecuted {
                action_name: "rank paths".into()
            })
        );
        let progress = decode_frame(&SseFrame::named(
            "message",
            r#"{"type":"progress","step":2}"#,
        ));
        assert!(matches!(progress, Some(RunEvent::Progress { payload }) if payload["step"] == 2));
    }

    #[test]
    fn malformed_payloads_become_parse_failures() {
        let failure = Some(RunEvent::parse_failure());
        assert_eq!(decode_frame(&SseFrame::named("action_executed", "{}")), failure);
        assert_eq!(decode_frame(&SseFrame::named("agent_completed", "{not json")), failure);
        assert_eq!(decode_frame(&SseFrame::named("error", r#"{"code":1}"#)), failure);
        assert_eq!(decode_frame(&SseFrame::data("garbage")), failure);
        assert_eq!(decode_frame(&SseFrame::data(r#"{"no":"type"}"#)), failure);
    }

    #[test]
    fn unknown_kinds_are_ignored() {
        assert_eq!(decode_frame(&SseFrame::named("ping", "")), None);
        assert_eq!(decode_frame(&SseFrame::data(r#"{"type":"heartbeat"}"#)), None);
        assert_eq!(decode_frame(&SseFrame::data("")), None);
    }
}
