//! Scripted connections for exercising the supervisor without a network.

use crate::connector::{ByteStream, ConnectError, Connector};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use fxstream_types::ApiError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Behaviour of one connection attempt.
#[derive(Debug)]
pub(crate) enum Step {
    /// The attempt fails with a transport error.
    Fail,
    /// The server rejects the request.
    Reject(ApiError),
    /// The body yields the chunks, then ends.
    Body(Vec<&'static str>),
    /// The body yields the chunks, then goes silent.
    Stall(Vec<&'static str>),
    /// The body yields the chunks, then fails.
    Error(Vec<&'static str>),
    /// The body yields one chunk per interval, then goes silent.
    Paced(Duration, Vec<&'static str>),
    /// The body yields the chunk forever.
    Repeat(&'static str),
}

/// Connector replaying a fixed script. Once the script is exhausted every
/// attempt yields a silent body.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Times at which connect was called.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    /// Time between consecutive attempts.
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        self.attempts()
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .collect()
    }
}

fn chunks(
    chunks: Vec<&'static str>,
) -> impl futures::Stream<Item = Result<Bytes, ConnectError>> + Send {
    stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes()))),
    )
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<ByteStream, ConnectError> {
        self.attempts.lock().push(Instant::now());
        let step = self.steps.lock().pop_front();

        match step {
            None => Ok(stream::pending().boxed()),
            Some(Step::Fail) => Err(ConnectError::Transport("connection refused".to_string())),
            Some(Step::Reject(err)) => Err(ConnectError::Api(err)),
            Some(Step::Body(body)) => Ok(chunks(body).boxed()),
            Some(Step::Stall(body)) => Ok(chunks(body).chain(stream::pending()).boxed()),
            Some(Step::Error(body)) => Ok(chunks(body)
                .chain(stream::once(async {
                    Err(ConnectError::Transport("connection reset".to_string()))
                }))
                .boxed()),
            Some(Step::Paced(interval, body)) => Ok(stream::iter(body)
                .then(move |chunk| async move {
                    tokio::time::sleep(interval).await;
                    Ok(Bytes::from_static(chunk.as_bytes()))
                })
                .chain(stream::pending())
                .boxed()),
            Some(Step::Repeat(chunk)) => Ok(stream::repeat(chunk)
                .then(|chunk| async move {
                    tokio::task::yield_now().await;
                    Ok(Bytes::from_static(chunk.as_bytes()))
                })
                .boxed()),
        }
    }
}
