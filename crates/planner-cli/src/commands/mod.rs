//! Subcommand implementations.

pub mod analyze;
pub mod replay;
pub mod watch;

use std::io::Write;
use std::process::ExitCode;

use chrono::Local;
use planner_stream::{
    InterruptCause, PlanClient, PlanResult, RunHandle, RunObserver, RunParameters, RunPhase,
    RunState,
};
use tracing::info;

use crate::report::{TraceReport, render_plan};

/// Prints one line per dispatched event.
pub(crate) struct ConsoleObserver<W: Write> {
    out: W,
}

impl<W: Write> ConsoleObserver<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out }
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, state: &RunState, text: &str) {
        let _ = writeln!(
            self.out,
            "[{}] {:>3}% {text}",
            Local::now().format("%H:%M:%S"),
            state.progress()
        );
    }
}

impl<W: Write> RunObserver for ConsoleObserver<W> {
    fn on_agent_started(&mut self, state: &RunState) {
        self.line(state, "agent started");
    }

    fn on_planning_started(&mut self, state: &RunState) {
        self.line(state, "planning path");
    }

    fn on_action_executed(&mut self, action_name: &str, state: &RunState) {
        self.line(state, action_name);
    }

    fn on_completed(&mut self, result: &PlanResult, state: &RunState) {
        self.line(state, "plan ready");
        let _ = write!(self.out, "\n{}", render_plan(result));
    }

    fn on_error(&mut self, message: &str, state: &RunState) {
        self.line(state, &format!("error: {message}"));
    }

    fn on_interrupted(&mut self, cause: InterruptCause, state: &RunState) {
        let text = match cause {
            InterruptCause::Cancelled => "cancelled",
            InterruptCause::Disconnected => "connection lost",
        };
        self.line(state, text);
    }
}

/// Starts a run and drives it to its end, cancelling on Ctrl-C.
pub(crate) async fn drive_run<W: Write>(
    client: &PlanClient,
    params: RunParameters,
    observer: &mut ConsoleObserver<W>,
) -> anyhow::Result<RunHandle> {
    let mut run = client.handle();
    let cancel = run.start(params).await?;
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });
    run.drive(observer).await;
    ctrl_c.abort();
    Ok(run)
}

/// Writes the closing status and the action trace report of a finished run.
pub(crate) fn write_outcome<W: Write>(state: &RunState, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nStatus: {}", state.status_line())?;
    let trace = state.action_trace();
    if !trace.is_empty() {
        writeln!(out)?;
        write!(out, "{}", TraceReport::new(&trace).render())?;
    }
    Ok(())
}

/// Completed and cancelled runs succeed; errored and disconnected runs fail.
pub(crate) fn exit_code(state: &RunState) -> ExitCode {
    if run_succeeded(state) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_succeeded(state: &RunState) -> bool {
    match state.phase() {
        RunPhase::Completed => true,
        RunPhase::Interrupted => state.interruption() == Some(InterruptCause::Cancelled),
        RunPhase::Idle | RunPhase::Streaming | RunPhase::Errored => false,
    }
}
