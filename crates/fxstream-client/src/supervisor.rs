//! Connection lifecycle: connect, read, reconnect, stop.

use crate::backoff::Backoff;
use crate::config::StreamConfig;
use crate::connector::{ByteStream, ConnectError, Connector};
use crate::error::StreamError;
use crate::frame::{Frame, FrameDecoder, FrameError, decode_disconnect};
use crate::gate::CallbackGate;
use crate::stats::StreamStats;
use futures::StreamExt;
use fxstream_types::ApiError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a supervised connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected; the initial state and the state between connections.
    #[default]
    Disconnected,
    /// A connection attempt or backoff sleep is in progress.
    Connecting,
    /// A response body is being read.
    Streaming,
    /// Terminal: stopped by the caller or by a fatal error.
    Stopped,
}

/// How reading one connection ended.
enum ReadOutcome {
    Reconnect,
    Stopped,
    Fatal(ApiError),
}

/// Keeps a stream connected until it is stopped or rejected.
///
/// Transient failures are retried with exponential backoff, a connection that
/// stays silent longer than the stall timeout is dropped and reopened, and a
/// `disconnect` notice triggers an immediate reconnect. Only an error object
/// from the server ends the loop with an error.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    connector: Arc<dyn Connector>,
    stall_timeout: Duration,
    base_delay: Duration,
    max_delay: Duration,
    state: Mutex<ConnectionState>,
    cancel: CancellationToken,
    gate: Arc<CallbackGate>,
    stats: Arc<StreamStats>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, config: &StreamConfig, stats: Arc<StreamStats>) -> Self {
        let gate = Arc::new(CallbackGate::new());
        Self {
            connector,
            stall_timeout: config.stall_timeout,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            state: Mutex::new(ConnectionState::Disconnected),
            cancel: gate.token(),
            gate,
            stats,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Returns true once the supervisor has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state() == ConnectionState::Stopped
    }

    /// Returns the token cancelled by [`stop`](Self::stop).
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Gate that session callbacks run behind.
    pub(crate) fn callback_gate(&self) -> Arc<CallbackGate> {
        Arc::clone(&self.gate)
    }

    /// Stops the supervisor. Safe to call at any time, from any task, any
    /// number of times.
    ///
    /// A read in progress is abandoned and its connection dropped. Returns
    /// once no callback run behind the gate is in flight, unless called from
    /// inside one.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Stopped {
                tracing::info!(from = ?*state, "Stopping stream");
                *state = ConnectionState::Stopped;
            }
        }
        self.gate.close();
    }

    /// Runs the connection loop, passing data and heartbeat frames to
    /// `on_frame` in wire order.
    ///
    /// Returns `Ok(())` once stopped, or immediately if already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Api`] if the server rejects the request and
    /// [`StreamError::AlreadyRunning`] if the loop is already running.
    pub async fn run<F>(&self, mut on_frame: F) -> Result<(), StreamError>
    where
        F: FnMut(Frame) + Send,
    {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Stopped => return Ok(()),
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                ConnectionState::Connecting | ConnectionState::Streaming => {
                    return Err(StreamError::AlreadyRunning);
                }
            }
        }

        let result = self.supervise(&mut on_frame).await;
        *self.state.lock() = ConnectionState::Stopped;
        result
    }

    async fn supervise<F>(&self, on_frame: &mut F) -> Result<(), StreamError>
    where
        F: FnMut(Frame) + Send,
    {
        let mut backoff = Backoff::new(self.base_delay, self.max_delay);

        loop {
            let Some(body) = self.establish(&mut backoff).await? else {
                return Ok(());
            };

            match self.read_body(body, on_frame).await {
                ReadOutcome::Reconnect => {
                    if !self.transition(ConnectionState::Disconnected) {
                        return Ok(());
                    }
                }
                ReadOutcome::Stopped => return Ok(()),
                ReadOutcome::Fatal(err) => {
                    tracing::error!(code = err.code, message = %err.message, "Stream rejected by server");
                    return Err(err.into());
                }
            }
        }
    }

    /// Connects, retrying transient failures. Returns `None` if stopped first.
    async fn establish(&self, backoff: &mut Backoff) -> Result<Option<ByteStream>, StreamError> {
        loop {
            if !self.transition(ConnectionState::Connecting) {
                return Ok(None);
            }

            let attempt = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(None),
                attempt = self.connector.connect() => attempt,
            };

            match attempt {
                Ok(body) => {
                    if !self.transition(ConnectionState::Streaming) {
                        return Ok(None);
                    }
                    backoff.reset();
                    self.stats.record_connect();
                    tracing::info!("Stream connected");
                    return Ok(Some(body));
                }
                Err(ConnectError::Api(err)) => {
                    tracing::error!(code = err.code, message = %err.message, "Connect rejected by server");
                    return Err(err.into());
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = backoff.failures(),
                        ?delay,
                        "Connect failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Ok(None),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Reads one connection until it ends.
    async fn read_body<F>(&self, mut body: ByteStream, on_frame: &mut F) -> ReadOutcome
    where
        F: FnMut(Frame) + Send,
    {
        let mut decoder = FrameDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return ReadOutcome::Stopped,
                next = tokio::time::timeout(self.stall_timeout, body.next()) => next,
            };

            let chunk = match next {
                Err(_) => {
                    self.stats.record_stall();
                    tracing::warn!(timeout = ?self.stall_timeout, "Stream stalled, reconnecting");
                    return ReadOutcome::Reconnect;
                }
                Ok(None) => {
                    match decoder.finish() {
                        Ok(()) => tracing::info!("Stream closed by server, reconnecting"),
                        Err(e) => tracing::warn!(error = %e, "Stream closed mid-frame, reconnecting"),
                    }
                    return ReadOutcome::Reconnect;
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Stream read failed, reconnecting");
                    return ReadOutcome::Reconnect;
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            decoder.extend(&chunk);
            loop {
                let message = match decoder.next_message() {
                    Ok(Some(message)) => message,
                    Ok(None) => break,
                    Err(FrameError::Api(err)) => return ReadOutcome::Fatal(err),
                    Err(e) => {
                        tracing::warn!(error = %e, "Undecodable stream, reconnecting");
                        return ReadOutcome::Reconnect;
                    }
                };

                if self.cancel.is_cancelled() {
                    return ReadOutcome::Stopped;
                }
                self.stats.record_frame();
                tracing::trace!(kind = message.kind(), "Frame");

                match message.classify() {
                    Frame::Disconnect(notice) => {
                        self.stats.record_disconnect();
                        match decode_disconnect(notice.payload()) {
                            Ok(notice) => tracing::info!(
                                code = notice.code,
                                message = %notice.message,
                                more_info = %notice.more_info,
                                "Server disconnect notice, reconnecting"
                            ),
                            Err(_) => tracing::info!(%notice, "Server disconnect notice, reconnecting"),
                        }
                        return ReadOutcome::Reconnect;
                    }
                    frame @ Frame::Heartbeat(_) => {
                        self.stats.record_heartbeat();
                        on_frame(frame);
                    }
                    frame @ Frame::Data(_) => on_frame(frame),
                }
            }
        }
    }

    /// Moves to `to` unless stopped. Returns false if stopped.
    fn transition(&self, to: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Stopped {
            return false;
        }
        if *state != to {
            tracing::trace!(from = ?*state, ?to, "Connection state change");
            *state = to;
        }
        true
    }
}
