use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context as _;
use planner_telemetry::{StepGraph, parse_trace};
use tracing::debug;

use crate::report::TraceReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Dot,
    Json,
}

/// Loads an action trace and prints its timeline, summary and bottlenecks.
///
/// Invalid input (unreadable file, bad JSON, invalid record) is an error.
pub fn run<W: Write>(trace: &Path, format: Format, out: &mut W) -> anyhow::Result<ExitCode> {
    let json = std::fs::read_to_string(trace)
        .with_context(|| format!("failed to read trace {}", trace.display()))?;
    let records =
        parse_trace(&json).with_context(|| format!("invalid trace {}", trace.display()))?;
    debug!(records = records.len(), ?format, "analyzing action trace");

    match format {
        Format::Dot => write!(out, "{}", StepGraph::build(&records).to_dot())?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, &TraceReport::new(&records))?;
            writeln!(out)?;
        }
        Format::Text => write!(out, "{}", TraceReport::new(&records).render())?,
    }
    Ok(ExitCode::SUCCESS)
}
