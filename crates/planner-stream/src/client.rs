use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{ChannelError, StreamError};
use crate::params::RunParameters;
use crate::progress::{MilestoneEstimator, ProgressEstimator};
use crate::protocol::{PlanResult, RunEvent, decode_frame};
use crate::sse::SseFrame;
use crate::state::{Applied, InterruptCause, RunPhase, RunState};
use crate::transport::{ChannelTransport, FrameStream};

pub(crate) struct ClientInner {
    transport: Arc<dyn ChannelTransport>,
    estimator: Arc<dyn ProgressEstimator>,
}

/// Entry point for observing plan-generation runs.
///
/// Cheap to clone. Every [`RunHandle`] created from it is independent: handles
/// share the transport but never state.
#[derive(Clone)]
pub struct PlanClient {
    inner: Arc<ClientInner>,
}

impl PlanClient {
    /// Starts a builder for configuring the transport and progress strategy.
    pub fn builder() -> PlanClientBuilder {
        PlanClientBuilder::default()
    }

    /// Creates an idle run handle.
    pub fn handle(&self) -> RunHandle {
        RunHandle {
            client: self.inner.clone(),
            state: RunState::with_estimator(self.inner.estimator.clone()),
            params: None,
            channel: None,
        }
    }
}

/// Builder used to configure a [`PlanClient`].
#[derive(Default)]
pub struct PlanClientBuilder {
    transport: Option<Arc<dyn ChannelTransport>>,
    estimator: Option<Arc<dyn ProgressEstimator>>,
}

impl PlanClientBuilder {
    /// Sets the transport used to open run channels. Required.
    pub fn transport(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the default [`MilestoneEstimator`].
    pub fn progress_estimator(mut self, estimator: Arc<dyn ProgressEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn build(self) -> Result<PlanClient, StreamError> {
        let transport = self
            .transport
            .ok_or_else(|| StreamError::Config("a channel transport is required".into()))?;
        Ok(PlanClient {
            inner: Arc::new(ClientInner {
                transport,
                estimator: self
                    .estimator
                    .unwrap_or_else(|| Arc::new(MilestoneEstimator)),
            }),
        })
    }
}

/// Requests cancellation of one run from anywhere (another task, a signal handler).
///
/// Bound to the run it was created for; it has no effect on later runs of the same
/// handle.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Observed by the pending or next `next_event` call.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

struct OpenChannel {
    frames: FrameStream,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

enum Pull {
    Cancelled,
    Recheck,
    Frame(SseFrame),
    Failed(ChannelError),
    Closed,
}

/// Callbacks for [`RunHandle::drive`], one per event kind.
///
/// Exactly one of `on_completed`, `on_error`, `on_interrupted` is called per run.
#[allow(unused_variables)]
pub trait RunObserver {
    fn on_agent_started(&mut self, state: &RunState) {}
    fn on_planning_started(&mut self, state: &RunState) {}
    fn on_action_executed(&mut self, action_name: &str, state: &RunState) {}
    fn on_progress(&mut self, payload: &serde_json::Value, state: &RunState) {}
    fn on_completed(&mut self, result: &PlanResult, state: &RunState) {}
    fn on_error(&mut self, message: &str, state: &RunState) {}
    fn on_interrupted(&mut self, cause: InterruptCause, state: &RunState) {}
}

/// Owner of one run's state and, while streaming, its channel.
///
/// At most one channel is open per handle. The channel is released on a terminal
/// event, on [`cancel`](Self::cancel), on [`close`](Self::close), and on drop; every
/// release path is safe to repeat.
pub struct RunHandle {
    client: Arc<ClientInner>,
    state: RunState,
    params: Option<RunParameters>,
    channel: Option<OpenChannel>,
}

impl RunHandle {
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Parameters of the current (or last) run.
    pub fn params(&self) -> Option<&RunParameters> {
        self.params.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.phase() == RunPhase::Streaming
    }

    /// Starts a run and opens its channel.
    ///
    /// Rejected with [`StreamError::RunActive`] while a run is streaming; the active
    /// run is untouched. Starting after a terminal phase discards the old state and
    /// begins from a fresh one. If the channel cannot be opened the fresh state ends
    /// `Interrupted` and the error is returned.
    pub async fn start(&mut self, params: RunParameters) -> Result<CancelHandle, StreamError> {
        if self.is_streaming() {
            warn!(
                run_id = %self.state.run_id(),
                "start rejected: a run is already streaming on this handle"
            );
            return Err(StreamError::RunActive {
                run_id: self.state.run_id(),
            });
        }
        params.validate()?;

        // Swapped in only once `open` resolves; an abandoned start keeps the old state.
        let mut state = RunState::with_estimator(self.client.estimator.clone());
        state.begin();
        info!(
            run_id = %state.run_id(),
            transport = self.client.transport.name(),
            subject = %params.subject(),
            fast = params.is_fast(),
            "starting plan generation run"
        );

        let opened = self.client.transport.open(&params).await;
        self.state = state;
        self.channel = None;
        self.params = Some(params);
        match opened {
            Ok(frames) => {
                let (cancel_tx, cancel_rx) = watch::channel(false);
                let handle = CancelHandle {
                    tx: cancel_tx.clone(),
                };
                self.channel = Some(OpenChannel {
                    frames,
                    cancel_tx,
                    cancel_rx,
                });
                Ok(handle)
            }
            Err(err) => {
                warn!(run_id = %self.state.run_id(), error = %err, "failed to open plan stream");
                self.state.interrupt(InterruptCause::Disconnected);
                Err(StreamError::Channel(err))
            }
        }
    }

    /// Cancel handle for the current run, while its channel is open.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.channel.as_ref().map(|channel| CancelHandle {
            tx: channel.cancel_tx.clone(),
        })
    }

    /// Waits for the next frame, applies it to the state and returns the dispatched event.
    ///
    /// Returns `None` once the run is over (terminal event, cancellation, channel
    /// closed) or when no run was started. Frames outside the event vocabulary are
    /// skipped.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        loop {
            let pull = {
                let channel = self.channel.as_mut()?;
                if *channel.cancel_rx.borrow_and_update() {
                    Pull::Cancelled
                } else {
                    tokio::select! {
                        biased;
                        // The sender lives in `channel`, so `changed` cannot fail here.
                        _ = channel.cancel_rx.changed() => Pull::Recheck,
                        next = channel.frames.next() => match next {
                            Some(Ok(frame)) => Pull::Frame(frame),
                            Some(Err(err)) => Pull::Failed(err),
                            None => Pull::Closed,
                        },
                    }
                }
            };

            match pull {
                Pull::Recheck => continue,
                Pull::Cancelled => {
                    self.cancel();
                    return None;
                }
                Pull::Failed(err) => {
                    warn!(
                        run_id = %self.state.run_id(),
                        error = %err,
                        "plan stream failed before a terminal event"
                    );
                    self.release(InterruptCause::Disconnected);
                    return None;
                }
                Pull::Closed => {
                    info!(
                        run_id = %self.state.run_id(),
                        "plan stream closed before a terminal event"
                    );
                    self.release(InterruptCause::Disconnected);
                    return None;
                }
                Pull::Frame(frame) => {
                    let Some(event) = decode_frame(&frame) else {
                        continue;
                    };
                    debug!(
                        run_id = %self.state.run_id(),
                        kind = %event.kind(),
                        "dispatching run event"
                    );
                    if self.state.apply(event.clone(), Utc::now()) == Applied::Ignored {
                        continue;
                    }
                    if self.state.is_terminal() {
                        self.channel = None;
                    }
                    return Some(event);
                }
            }
        }
    }

    /// Dispatches every remaining event to `observer` until the run ends.
    ///
    /// Returns the final phase. Calling it on a handle that is not streaming
    /// dispatches nothing.
    pub async fn drive<O: RunObserver + ?Sized>(&mut self, observer: &mut O) -> RunPhase {
        let was_streaming = self.is_streaming();
        while let Some(event) = self.next_event().await {
            let state = &self.state;
            match &event {
                RunEvent::AgentStarted => observer.on_agent_started(state),
                RunEvent::PlanningStarted => observer.on_planning_started(state),
                RunEvent::ActionExecuted { action_name } => {
                    observer.on_action_executed(action_name, state)
                }
                RunEvent::Progress { payload } => observer.on_progress(payload, state),
                RunEvent::AgentCompleted { result } => observer.on_completed(result, state),
                RunEvent::Error { message } => observer.on_error(message, state),
            }
        }
        if was_streaming
            && let Some(cause) = self.state.interruption()
        {
            observer.on_interrupted(cause, &self.state);
        }
        self.state.phase()
    }

    /// Closes the channel and marks a streaming run `Interrupted(Cancelled)`.
    ///
    /// Idempotent. After a terminal phase only the (already released) channel is
    /// touched, so the state keeps its terminal value.
    pub fn cancel(&mut self) {
        if self.channel.take().is_some() {
            debug!(run_id = %self.state.run_id(), "plan stream closed by cancellation");
        }
        self.state.interrupt(InterruptCause::Cancelled);
    }

    /// Teardown: releases the channel. Same semantics as [`cancel`](Self::cancel).
    pub fn close(&mut self) {
        self.cancel();
    }

    fn release(&mut self, cause: InterruptCause) {
        self.channel = None;
        self.state.interrupt(cause);
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.channel.take().is_some() {
            debug!(run_id = %self.state.run_id(), "plan stream closed on teardown");
        }
    }
}
