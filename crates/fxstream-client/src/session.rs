//! Stream sessions: the public face of the streaming machinery.

use crate::config::StreamConfig;
use crate::connector::Connector;
use crate::dispatch::{Dispatcher, PartitionHandler};
use crate::error::{PayloadError, StreamError};
use crate::frame::{Frame, StreamMessage};
use crate::heartbeat::{HeartbeatHandler, HeartbeatRelay, decode_heartbeat};
use crate::stats::{StatsSnapshot, StreamStats};
use crate::supervisor::{ConnectionState, ConnectionSupervisor};
use fxstream_types::Time;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// What distinguishes one streamed feed from another.
///
/// A feed names the kind of its data frames, extracts the partition key from
/// them and decodes their payload. Everything else is shared.
pub trait Feed: Send + Sync + 'static {
    /// Partition key, e.g. an instrument or an account id.
    type Key: Eq + Hash + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Record delivered to the message callback.
    type Record: Send + 'static;

    /// Kind of the data frames carried by the feed.
    const KIND: &'static str;

    /// Extracts the partition key of a data frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload carries no valid key.
    fn partition_key(message: &StreamMessage) -> Result<Self::Key, PayloadError>;

    /// Decodes the payload of a data frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not decode into a record.
    fn decode(message: &StreamMessage) -> Result<Self::Record, PayloadError>;
}

/// Returns an error unless `message` is a data frame of feed `F`.
pub(crate) fn expect_kind<F: Feed>(message: &StreamMessage) -> Result<(), PayloadError> {
    if message.kind() == F::KIND {
        Ok(())
    } else {
        Err(PayloadError::UnexpectedKind(message.kind().to_string()))
    }
}

/// Decodes a payload as JSON, tagging errors with the frame kind.
pub(crate) fn decode_json<'a, T: serde::Deserialize<'a>>(
    message: &'a StreamMessage,
) -> Result<T, PayloadError> {
    serde_json::from_slice(message.payload()).map_err(|source| PayloadError::Json {
        kind: message.kind().to_string(),
        source,
    })
}

/// A subscription to one feed for a fixed set of partition keys.
///
/// [`connect_and_handle`](Self::connect_and_handle) keeps the stream connected
/// and hands every record to the callback, one worker per key. Records of one
/// key arrive in wire order; a key that falls behind by more than the queue
/// capacity loses its oldest pending records.
///
/// Callbacks run on runtime worker threads and should return quickly.
pub struct StreamSession<F: Feed> {
    supervisor: Arc<ConnectionSupervisor>,
    keys: Vec<F::Key>,
    config: StreamConfig,
    stats: Arc<StreamStats>,
    _feed: PhantomData<fn() -> F>,
}

impl<F: Feed> fmt::Debug for StreamSession<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("kind", &F::KIND)
            .field("keys", &self.keys)
            .field("state", &self.supervisor.state())
            .finish()
    }
}

impl<F: Feed> StreamSession<F> {
    /// Creates a session reading from `connector` for `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidArgument`] if `keys` is empty.
    pub fn new(
        connector: Arc<dyn Connector>,
        keys: impl IntoIterator<Item = F::Key>,
        config: StreamConfig,
    ) -> Result<Self, StreamError> {
        let mut unique: Vec<F::Key> = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        if unique.is_empty() {
            return Err(StreamError::InvalidArgument(format!(
                "{} stream needs at least one key",
                F::KIND
            )));
        }

        let stats = Arc::new(StreamStats::new());
        Ok(Self {
            supervisor: Arc::new(ConnectionSupervisor::new(
                connector,
                &config,
                Arc::clone(&stats),
            )),
            keys: unique,
            config,
            stats,
            _feed: PhantomData,
        })
    }

    /// Subscribed partition keys.
    #[must_use]
    pub fn keys(&self) -> &[F::Key] {
        &self.keys
    }

    /// Session tuning.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns a handle that stops the session from another task or from a
    /// callback.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            supervisor: Arc::clone(&self.supervisor),
        }
    }

    /// Stops the session. Idempotent.
    ///
    /// Waits for callbacks in flight, so no callback runs after this returns
    /// and pending records are dropped. From inside a callback it returns
    /// without waiting.
    pub fn stop(&self) {
        self.supervisor.stop();
    }

    /// Streams until stopped, passing each record with its key to
    /// `on_message`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Api`] if the server rejects the request and
    /// [`StreamError::AlreadyRunning`] if the session is already streaming.
    /// Transport failures are retried and never returned.
    pub async fn connect_and_handle<H>(&self, on_message: H) -> Result<(), StreamError>
    where
        H: Fn(&F::Key, F::Record) + Send + Sync + 'static,
    {
        self.run(on_message, None).await
    }

    /// Like [`connect_and_handle`](Self::connect_and_handle), also passing
    /// heartbeat times to `on_heartbeat`.
    ///
    /// # Errors
    ///
    /// See [`connect_and_handle`](Self::connect_and_handle).
    pub async fn connect_and_handle_with_heartbeat<H, B>(
        &self,
        on_message: H,
        on_heartbeat: B,
    ) -> Result<(), StreamError>
    where
        H: Fn(&F::Key, F::Record) + Send + Sync + 'static,
        B: Fn(Time) + Send + Sync + 'static,
    {
        self.run(on_message, Some(Arc::new(on_heartbeat))).await
    }

    async fn run<H>(
        &self,
        on_message: H,
        on_heartbeat: Option<HeartbeatHandler>,
    ) -> Result<(), StreamError>
    where
        H: Fn(&F::Key, F::Record) + Send + Sync + 'static,
    {
        match self.supervisor.state() {
            ConnectionState::Stopped => return Ok(()),
            ConnectionState::Connecting | ConnectionState::Streaming => {
                return Err(StreamError::AlreadyRunning);
            }
            ConnectionState::Disconnected => {}
        }

        let cancel = self.supervisor.cancellation();

        let mut dispatcher = Dispatcher::new(self.config.queue_capacity, Arc::clone(&self.stats));
        for key in &self.keys {
            dispatcher.register(key.clone());
        }
        let gate = self.supervisor.callback_gate();
        let stats = Arc::clone(&self.stats);
        let handler: PartitionHandler<F::Key> = {
            let gate = Arc::clone(&gate);
            Arc::new(move |key: &F::Key, message: StreamMessage| match F::decode(&message) {
                Ok(record) => {
                    gate.run(|| on_message(key, record));
                }
                Err(e) => {
                    stats.record_decode_failure();
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable message");
                }
            })
        };
        dispatcher.start_workers(handler, &cancel);

        let on_heartbeat = on_heartbeat.map(|callback| -> HeartbeatHandler {
            Arc::new(move |time: Time| {
                gate.run(|| callback(time));
            })
        });
        let mut relay = HeartbeatRelay::new(self.config.heartbeat_capacity);
        relay.start(on_heartbeat, &cancel);

        tracing::info!(kind = F::KIND, keys = self.keys.len(), "Starting stream");
        let router = dispatcher.router();
        let stats = Arc::clone(&self.stats);
        let result = self
            .supervisor
            .run(|frame| match frame {
                Frame::Data(message) => {
                    if let Err(e) = expect_kind::<F>(&message) {
                        stats.record_ignored();
                        tracing::debug!(error = %e, "Ignoring frame");
                        return;
                    }
                    match F::partition_key(&message) {
                        Ok(key) => {
                            router.route(&key, message);
                        }
                        Err(e) => {
                            stats.record_decode_failure();
                            tracing::warn!(error = %e, "Dropping message without partition key");
                        }
                    }
                }
                Frame::Heartbeat(message) => match decode_heartbeat(message.payload()) {
                    Ok(time) => relay.relay(time),
                    Err(e) => {
                        stats.record_decode_failure();
                        tracing::warn!(error = %e, "Dropping undecodable heartbeat");
                    }
                },
                Frame::Disconnect(_) => {}
            })
            .await;

        // Stopped sessions drop what is pending; rejected ones deliver it.
        let discard = cancel.is_cancelled();
        dispatcher.drain_and_close(discard).await;
        relay.close(discard).await;

        match &result {
            Ok(()) => tracing::info!(kind = F::KIND, "Stream stopped"),
            Err(e) => tracing::error!(kind = F::KIND, error = %e, "Stream ended"),
        }
        result
    }
}

/// Cloneable handle stopping a [`StreamSession`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    supervisor: Arc<ConnectionSupervisor>,
}

impl StopHandle {
    /// Stops the session. Idempotent.
    ///
    /// See [`StreamSession::stop`].
    pub fn stop(&self) {
        self.supervisor.stop();
    }

    /// Returns true once the session has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.supervisor.is_stopped()
    }
}
