//! Common imports for watching plan-generation runs.
pub use crate::{
    CancelHandle, ChannelTransport, EventKind, InterruptCause, PlanClient, PlanResult,
    ReplayTransport, RunEvent, RunHandle, RunObserver, RunParameters, RunPhase, RunState,
    SseTransport, SseTransportConfig, StreamError,
};
