//! Run state reducer: folds the ordered event stream into a UI-facing record.
//!
//! ```text
//! Idle --begin--> Streaming --agent_completed--> Completed
//!                     |------error------------> Errored
//!                     `------closed early-----> Interrupted
//! ```
//!
//! Terminal phases accept nothing further. A new run needs a new `RunState`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use planner_telemetry::{ActionRecord, ActionStatus};
use tracing::{debug, info};

use crate::progress::{MilestoneEstimator, ProgressEstimator};
use crate::protocol::{LoggedEvent, PlanResult, RunEvent};

pub const AGENT_STARTED_LABEL: &str = "Agent started";
pub const PLANNING_LABEL: &str = "Path planning";
pub const DONE_LABEL: &str = "Done";
pub const ERROR_LABEL: &str = "Error";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Streaming,
    Completed,
    Errored,
    Interrupted,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Errored | RunPhase::Interrupted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Streaming => "streaming",
            RunPhase::Completed => "completed",
            RunPhase::Errored => "errored",
            RunPhase::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended without a terminal frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptCause {
    /// The caller cancelled the run.
    Cancelled,
    /// The channel closed or failed before a terminal frame arrived.
    Disconnected,
}

/// Outcome of feeding an event or transition to the reducer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    /// The state was not streaming; nothing changed.
    Ignored,
}

/// UI-facing state of one run.
///
/// `result` is set only in `Completed` and `error_message` only in `Errored`.
#[derive(Clone)]
pub struct RunState {
    run_id: uuid::Uuid,
    phase: RunPhase,
    events: Vec<LoggedEvent>,
    current_activity: Option<String>,
    progress: u8,
    result: Option<PlanResult>,
    error_message: Option<String>,
    interruption: Option<InterruptCause>,
    estimator: Arc<dyn ProgressEstimator>,
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("run_id", &self.run_id)
            .field("phase", &self.phase)
            .field("events", &self.events.len())
            .field("current_activity", &self.current_activity)
            .field("progress", &self.progress)
            .field("result", &self.result)
            .field("error_message", &self.error_message)
            .field("interruption", &self.interruption)
            .finish()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    /// Creates an idle state using [`MilestoneEstimator`].
    pub fn new() -> Self {
        Self::with_estimator(Arc::new(MilestoneEstimator))
    }

    pub fn with_estimator(estimator: Arc<dyn ProgressEstimator>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            phase: RunPhase::Idle,
            events: Vec::new(),
            current_activity: None,
            progress: 0,
            result: None,
            error_message: None,
            interruption: None,
            estimator,
        }
    }

    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Every accepted event in arrival order.
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    pub fn current_activity(&self) -> Option<&str> {
        self.current_activity.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&PlanResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Set only in `Interrupted`.
    pub fn interruption(&self) -> Option<InterruptCause> {
        self.interruption
    }

    /// `Idle -> Streaming`.
    pub fn begin(&mut self) -> Applied {
        if self.phase != RunPhase::Idle {
            debug!(
                run_id = %self.run_id,
                phase = %self.phase,
                "begin ignored: run already started"
            );
            return Applied::Ignored;
        }
        self.phase = RunPhase::Streaming;
        self.progress = 0;
        Applied::Accepted
    }

    /// Folds one event into the state. Ignored unless streaming.
    pub fn apply(&mut self, event: RunEvent, received_at: DateTime<Utc>) -> Applied {
        if self.phase != RunPhase::Streaming {
            debug!(
                run_id = %self.run_id,
                phase = %self.phase,
                kind = %event.kind(),
                "dropping event outside streaming phase"
            );
            return Applied::Ignored;
        }

        let kind = event.kind();
        let progress = self
            .estimator
            .estimate(self.progress, kind)
            .clamp(self.progress, 100);

        match &event {
            RunEvent::AgentStarted => {
                self.current_activity = Some(AGENT_STARTED_LABEL.to_string());
                self.progress = progress;
            }
            RunEvent::PlanningStarted => {
                self.current_activity = Some(PLANNING_LABEL.to_string());
                self.progress = progress;
            }
            RunEvent::ActionExecuted { action_name } => {
                self.current_activity = Some(action_name.clone());
                self.progress = progress;
            }
            RunEvent::Progress { .. } => {}
            RunEvent::AgentCompleted { result } => {
                self.phase = RunPhase::Completed;
                self.result = Some(result.clone());
                self.current_activity = Some(DONE_LABEL.to_string());
                self.progress = 100;
                info!(
                    run_id = %self.run_id,
                    events = self.events.len() + 1,
                    "plan generation completed"
                );
            }
            RunEvent::Error { message } => {
                self.phase = RunPhase::Errored;
                self.error_message = Some(message.clone());
                self.current_activity = Some(ERROR_LABEL.to_string());
                info!(run_id = %self.run_id, error = %message, "plan generation failed");
            }
        }

        self.events.push(LoggedEvent { received_at, event });
        Applied::Accepted
    }

    /// `Streaming -> Interrupted`. No-op in every other phase.
    pub fn interrupt(&mut self, cause: InterruptCause) -> Applied {
        if self.phase != RunPhase::Streaming {
            return Applied::Ignored;
        }
        self.phase = RunPhase::Interrupted;
        self.interruption = Some(cause);
        info!(run_id = %self.run_id, cause = ?cause, events = self.events.len(), "run interrupted");
        Applied::Accepted
    }

    /// Short human-readable summary of the phase.
    ///
    /// A cancelled run reads as cancelled, never as a failure.
    pub fn status_line(&self) -> String {
        match self.phase {
            RunPhase::Idle => "Not started".to_string(),
            RunPhase::Streaming => match self.current_activity.as_deref() {
                Some(activity) => format!("{activity} ({}%)", self.progress),
                None => format!("Connecting ({}%)", self.progress),
            },
            RunPhase::Completed => "Plan ready (100%)".to_string(),
            RunPhase::Errored => format!(
                "Failed: {}",
                self.error_message.as_deref().unwrap_or("unknown error")
            ),
            RunPhase::Interrupted => match self.interruption {
                Some(InterruptCause::Cancelled) => "Cancelled".to_string(),
                _ => "Connection lost before the plan finished".to_string(),
            },
        }
    }

    /// Derives the action trace from the event log.
    ///
    /// Each `action_executed` opens an `Executing` record and completes the one
    /// before it, timed by arrival. The open record completes on `agent_completed`,
    /// fails on `error`, and stays executing (no duration) otherwise.
    pub fn action_trace(&self) -> Vec<ActionRecord> {
        let mut records: Vec<ActionRecord> = Vec::new();
        for logged in &self.events {
            let close_with = match &logged.event {
                RunEvent::ActionExecuted { .. } | RunEvent::AgentCompleted { .. } => {
                    Some(ActionStatus::Completed)
                }
                RunEvent::Error { .. } => Some(ActionStatus::Failed),
                _ => None,
            };
            if let Some(status) = close_with
                && let Some(open) = records
                    .last_mut()
                    .filter(|r| r.status == ActionStatus::Executing)
            {
                open.finish(status, logged.received_at);
            }
            if let RunEvent::ActionExecuted { action_name } = &logged.event {
                records.push(ActionRecord::executing(action_name).started_at(logged.received_at));
            }
        }
        records
    }
}
