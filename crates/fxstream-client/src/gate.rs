//! Callback gate: ties user callbacks to the stop signal.
//!
//! Callbacks run under the read side of a lock after checking cancellation.
//! Closing the gate cancels and then takes the write side, so once
//! [`CallbackGate::close`] returns no callback is running or can start.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(0);

tokio::task_local! {
    /// Gate whose callback the current code runs inside.
    static ENTERED: u64;
}

#[derive(Debug)]
pub(crate) struct CallbackGate {
    id: u64,
    cancel: CancellationToken,
    callbacks: RwLock<()>,
}

impl CallbackGate {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
            cancel: CancellationToken::new(),
            callbacks: RwLock::new(()),
        }
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `callback` unless the gate is closed. Returns false if skipped.
    pub(crate) fn run(&self, callback: impl FnOnce()) -> bool {
        let _entered = self.callbacks.read();
        if self.cancel.is_cancelled() {
            return false;
        }
        ENTERED.sync_scope(self.id, callback);
        true
    }

    /// Closes the gate and waits for callbacks in flight.
    ///
    /// Called from inside one of this gate's callbacks it does not wait, since
    /// the caller itself holds the gate open. Other callbacks may then still
    /// be finishing, but none starts afterwards.
    pub(crate) fn close(&self) {
        self.cancel.cancel();
        let reentrant = ENTERED.try_with(|id| *id == self.id).unwrap_or(false);
        if !reentrant {
            drop(self.callbacks.write());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[test]
    fn test_closed_gate_skips_callbacks() {
        let gate = CallbackGate::new();
        assert!(gate.run(|| {}));
        gate.close();
        assert!(gate.is_closed());

        let mut ran = false;
        assert!(!gate.run(|| ran = true));
        assert!(!ran);
    }

    #[test]
    fn test_close_from_callback_returns() {
        let gate = CallbackGate::new();
        assert!(gate.run(|| gate.close()));
        assert!(gate.is_closed());
    }

    #[test]
    fn test_close_waits_for_running_callback() {
        let gate = Arc::new(CallbackGate::new());
        let finished = Arc::new(AtomicBool::new(false));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();

        let worker = {
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                gate.run(|| {
                    entered_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(50));
                    finished.store(true, Ordering::SeqCst);
                });
            })
        };

        entered_rx.recv().unwrap();
        gate.close();
        assert!(finished.load(Ordering::SeqCst));
        worker.join().unwrap();
    }

    #[test]
    fn test_close_inside_other_gate_callback() {
        let outer = CallbackGate::new();
        let inner = CallbackGate::new();
        assert!(outer.run(|| inner.close()));
        assert!(inner.is_closed());
        assert!(!outer.is_closed());
    }
}
