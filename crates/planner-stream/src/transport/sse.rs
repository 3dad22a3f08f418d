use std::time::Duration;

use futures::StreamExt as _;
use tracing::debug;

use crate::errors::{ChannelError, StreamError};
use crate::params::RunParameters;
use crate::sse::{ByteStream, frame_stream};

use super::{ChannelTransport, FrameStream};

const DEFAULT_STREAM_PATH: &str = "/api/learning-plans/stream";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const BASE_URL_VAR: &str = "PLANNER_STREAM_BASE_URL";
const STREAM_PATH_VAR: &str = "PLANNER_STREAM_PATH";
const CONNECT_TIMEOUT_VAR: &str = "PLANNER_CONNECT_TIMEOUT_SECS";

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Configuration for the SSE channel transport.
#[derive(Clone, Debug)]
pub struct SseTransportConfig {
    /// Base URL of the planning service (scheme, host, optional port).
    pub base_url: String,
    /// Path of the run stream endpoint.
    pub stream_path: String,
    /// Timeout for establishing the connection.
    ///
    /// The stream itself has no deadline: a run streams until it ends, is cancelled,
    /// or its handle is dropped.
    pub connect_timeout: Duration,
}

impl SseTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Builds a config from `PLANNER_STREAM_BASE_URL`, `PLANNER_STREAM_PATH` and
    /// `PLANNER_CONNECT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, StreamError> {
        Self::from_lookup(env_var)
    }

    /// Same as [`from_env`](Self::from_env) with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StreamError> {
        let base_url = lookup(BASE_URL_VAR).unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(StreamError::Config(format!(
                "missing {BASE_URL_VAR} for the plan stream"
            )));
        }
        Self::new(base_url).overrides_from(lookup)
    }

    /// Applies `PLANNER_STREAM_PATH` and `PLANNER_CONNECT_TIMEOUT_SECS` on top of
    /// this config, keeping its base URL.
    pub fn with_env_overrides(self) -> Result<Self, StreamError> {
        self.overrides_from(env_var)
    }

    /// Applies the path and timeout variables resolved by `lookup`. Unset or blank
    /// variables keep the current values; an unparsable timeout is an error.
    pub fn overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StreamError> {
        if let Some(path) = lookup(STREAM_PATH_VAR)
            && !path.trim().is_empty()
        {
            self.stream_path = path;
        }
        if let Some(raw) = lookup(CONNECT_TIMEOUT_VAR)
            && !raw.trim().is_empty()
        {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                StreamError::Config(format!("invalid {CONNECT_TIMEOUT_VAR} {raw:?}: {e}"))
            })?;
            self.connect_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    pub fn stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn stream_url(&self) -> String {
        let path = self.stream_path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Opens the run channel as a Server-Sent Events stream over HTTP.
pub struct SseTransport {
    client: reqwest::Client,
    config: SseTransportConfig,
}

impl SseTransport {
    pub fn new(config: SseTransportConfig) -> Result<Self, StreamError> {
        if config.base_url.trim().is_empty() {
            return Err(StreamError::Config(
                "stream transport base_url must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build stream client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport from environment configuration.
    pub fn from_env() -> Result<Self, StreamError> {
        Self::new(SseTransportConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl ChannelTransport for SseTransport {
    fn name(&self) -> &'static str {
        "sse"
    }

    async fn open(&self, params: &RunParameters) -> Result<FrameStream, ChannelError> {
        let url = self.config.stream_url();
        debug!(
            url = %url,
            profile_id = %params.profile_id(),
            subject = %params.subject(),
            fast = params.is_fast(),
            "opening plan stream"
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(|e| ChannelError::transport(format!("stream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ChannelError::status(status.as_u16(), body));
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ChannelError::transport(format!("stream read failed: {e}")))
        }));
        Ok(Box::pin(frame_stream(bytes_stream)))
    }
}
