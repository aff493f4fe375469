//! Heartbeat relay.
//!
//! Heartbeats travel through their own small queue and worker so a backlogged
//! data partition never delays them.

use crate::dispatch::{PartitionQueue, Push};
use fxstream_types::Time;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback receiving heartbeat timestamps.
pub type HeartbeatHandler = Arc<dyn Fn(Time) + Send + Sync>;

#[derive(Deserialize)]
struct HeartbeatBody {
    time: Time,
}

/// Decodes the payload of a `heartbeat` frame into its timestamp.
///
/// # Errors
///
/// Returns an error if the payload has no valid `time` field.
pub fn decode_heartbeat(payload: &[u8]) -> Result<Time, serde_json::Error> {
    serde_json::from_slice::<HeartbeatBody>(payload).map(|body| body.time)
}

/// Forwards heartbeats to an optional callback on a dedicated worker.
#[derive(Debug)]
pub struct HeartbeatRelay {
    queue: Arc<PartitionQueue<Time>>,
    worker: Option<JoinHandle<()>>,
}

impl HeartbeatRelay {
    /// Creates a relay whose queue holds `capacity` heartbeats.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(PartitionQueue::new(capacity)),
            worker: None,
        }
    }

    /// Spawns the worker. Without a handler heartbeats are dropped on arrival.
    pub fn start(&mut self, handler: Option<HeartbeatHandler>, cancel: &CancellationToken) {
        let Some(handler) = handler else {
            self.queue.close();
            return;
        };
        let queue = Arc::clone(&self.queue);
        let cancel = cancel.clone();
        self.worker = Some(tokio::spawn(async move {
            while let Some(time) = queue.pop().await {
                if cancel.is_cancelled() {
                    break;
                }
                handler(time);
            }
        }));
    }

    /// Queues a heartbeat, dropping the oldest pending one if full.
    pub fn relay(&self, time: Time) {
        if let Push::Evicted(stale) = self.queue.push(time) {
            tracing::trace!(time = %stale, "Heartbeat queue full, dropped oldest");
        }
    }

    /// Closes the queue and waits for the worker to exit.
    pub async fn close(&mut self, discard: bool) {
        if discard {
            self.queue.clear();
        }
        self.queue.close();
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            tracing::warn!(error = %e, "Heartbeat worker failed");
        }
    }
}
