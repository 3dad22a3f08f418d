//! Incremental Server-Sent Events decoder.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;

use crate::errors::ChannelError;

/// One SSE frame: the optional `event:` name and the joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// A named frame carrying `data`.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// An unnamed frame whose kind lives in the payload's `type` field.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }
}

/// Buffers raw bytes and yields complete frames as blank-line delimiters arrive.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// True when bytes of an unterminated frame are buffered.
    pub fn has_partial_frame(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<String> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

pub(crate) type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ChannelError>> + Send + 'static>>;

/// Turns a byte stream into a stream of SSE frames.
///
/// The first read error is yielded and ends the stream. A trailing frame without its
/// blank-line terminator is discarded at end of input.
pub(crate) fn frame_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<SseFrame, ChannelError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        if state.decoder.has_partial_frame() {
                            tracing::debug!("discarding unterminated trailing SSE frame");
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let part1 = b"event: action_executed\ndata: {\"actionName\":\"rank";
        let part2 = b" paths\"}\n\n";
        assert!(decoder.push_chunk(part1).is_empty());
        assert!(decoder.has_partial_frame());
        let frames = decoder.push_chunk(part2);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("action_executed"));
        assert_eq!(frames[0].data, "{\"actionName\":\"rank paths\"}");
        assert!(!decoder.has_partial_frame());
    }

    #[test]
    fn decoder_handles_crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(
            b": keep-alive\r\n\r\nevent: progress\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\ndata: {}\n\n",
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], SseFrame::named("progress", "{\"a\":\n1}"));
        assert_eq!(frames[1], SseFrame::data("{}"));
    }

    #[tokio::test]
    async fn frame_stream_yields_frames_then_error() {
        let chunks: Vec<Result<bytes::Bytes, ChannelError>> = vec![
            Ok(bytes::Bytes::from_static(b"event: agent_started\ndata: {}\n\nevent: plan")),
            Ok(bytes::Bytes::from_static(b"ning_started\ndata: {}\n\n")),
            Err(ChannelError::transport("connection reset")),
        ];
        let frames: Vec<_> = frame_stream(Box::pin(stream::iter(chunks)))
            .collect::<Vec<_>>()
            .await;
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[1].as_ref().map(|f| f.event.clone()),
            Ok(Some("planning_started".to_string()))
        );
        assert!(matches!(frames[2], Err(ChannelError::Transport { .. })));
    }
}
