//! Channel transports: how a run's push channel is opened.
//!
//! A transport only produces raw SSE frames. Decoding, ordering guarantees and
//! terminal handling live in the client so every transport behaves the same.

mod replay;
mod sse;

pub use replay::ReplayTransport;
pub use sse::{SseTransport, SseTransportConfig};

use std::pin::Pin;

use crate::errors::ChannelError;
use crate::params::RunParameters;
use crate::sse::SseFrame;

/// Ordered frames of one open channel. Dropping the stream closes the channel.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<SseFrame, ChannelError>> + Send + 'static>>;

/// Opens the push channel for a run.
#[async_trait::async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Short name used in logs (for example `sse`).
    fn name(&self) -> &'static str;

    /// Opens one channel scoped to `params`.
    async fn open(&self, params: &RunParameters) -> Result<FrameStream, ChannelError>;
}
