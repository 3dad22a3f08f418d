use thiserror::Error;

/// Errors raised for structurally invalid action traces.
///
/// Degenerate but valid input (empty lists, all-pending lists) never produces
/// one of these; the views return well-defined defaults instead.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid action record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("edge {from} -> {to} references a missing node")]
    InvalidEdge { from: usize, to: usize },
    #[error("failed to decode action trace: {0}")]
    Decode(#[from] serde_json::Error),
}
