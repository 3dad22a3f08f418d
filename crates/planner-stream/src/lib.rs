//! Client for the plan-generation push channel.
//!
//! A [`PlanClient`] opens one channel per run through a [`ChannelTransport`],
//! decodes the event frames and folds them into a [`RunState`] that a UI or CLI can
//! render at any moment.
//!
//! # Watching a run
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use planner_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StreamError> {
//! let client = PlanClient::builder()
//!     .transport(Arc::new(SseTransport::from_env()?))
//!     .build()?;
//!
//! let mut run = client.handle();
//! run.start(RunParameters::new("profile-42", "Rust").fast_mode(true))
//!     .await?;
//!
//! while let Some(event) = run.next_event().await {
//!     println!("{} -> {}", event.kind(), run.state().status_line());
//! }
//! # Ok(())
//! # }
//! ```

/// Error types for transports and the client API.
pub mod errors;
/// Run parameters sent when a channel is opened.
pub mod params;
/// Common imports for typical usage.
pub mod prelude;
/// Pluggable progress estimation.
pub mod progress;
/// Event vocabulary and frame decoding.
pub mod protocol;
/// Incremental SSE framing.
pub mod sse;
/// Run state reducer.
pub mod state;
/// Channel transports (live SSE, recorded replay).
pub mod transport;

mod client;

pub use client::{CancelHandle, PlanClient, PlanClientBuilder, RunHandle, RunObserver};
pub use errors::{ChannelError, StreamError};
pub use params::RunParameters;
pub use progress::{MilestoneEstimator, ProgressEstimator};
pub use protocol::{
    CurriculumStep, EventKind, LoggedEvent, PARSE_FAILURE_MESSAGE, PlanResult, RunEvent,
    decode_frame,
};
pub use sse::{SseDecoder, SseFrame};
pub use state::{Applied, InterruptCause, RunPhase, RunState};
pub use transport::{
    ChannelTransport, FrameStream, ReplayTransport, SseTransport, SseTransportConfig,
};
