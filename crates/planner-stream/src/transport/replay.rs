use bytes::Bytes;
use futures::stream;
use tracing::debug;

use crate::errors::ChannelError;
use crate::params::RunParameters;
use crate::sse::{ByteStream, frame_stream};

use super::{ChannelTransport, FrameStream};

const DEFAULT_CHUNK_SIZE: usize = 64;

/// Replays a recorded SSE transcript as if it arrived over the network.
///
/// The transcript is cut into fixed-size chunks so frame reassembly is exercised
/// the same way a live connection exercises it. Run parameters are ignored.
#[derive(Clone, Debug)]
pub struct ReplayTransport {
    transcript: Bytes,
    chunk_size: usize,
}

impl ReplayTransport {
    pub fn new(transcript: impl Into<Bytes>) -> Self {
        Self {
            transcript: transcript.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Overrides the chunk size (minimum 1).
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait::async_trait]
impl ChannelTransport for ReplayTransport {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn open(&self, params: &RunParameters) -> Result<FrameStream, ChannelError> {
        debug!(
            subject = %params.subject(),
            bytes = self.transcript.len(),
            chunk_size = self.chunk_size,
            "replaying recorded transcript"
        );
        let chunks: Vec<Result<Bytes, ChannelError>> = self
            .transcript
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        let bytes_stream: ByteStream = Box::pin(stream::iter(chunks));
        Ok(Box::pin(frame_stream(bytes_stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    #[tokio::test]
    async fn replays_frames_regardless_of_chunk_size() {
        let transcript = concat!(
            "event: agent_started\ndata: {}\n\n",
            "event: action_executed\ndata: {\"actionName\":\"rank paths\"}\n\n",
        );
        for size in [1, 7, 4096] {
            let transport = ReplayTransport::new(transcript).chunk_size(size);
            let frames: Vec<_> = transport
                .open(&RunParameters::new("p", "Rust"))
                .await
                .expect("open")
                .collect()
                .await;
            assert_eq!(frames.len(), 2, "chunk size {size}");
            assert!(frames.iter().all(Result::is_ok));
        }
    }
}
