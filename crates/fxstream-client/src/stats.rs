//! Session counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the supervisor, dispatcher and workers of one session.
#[derive(Debug, Default)]
pub struct StreamStats {
    frames: AtomicU64,
    heartbeats: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
    stalls: AtomicU64,
    evicted: AtomicU64,
    unrouted: AtomicU64,
    ignored: AtomicU64,
    decode_failures: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident, $doc:literal) => {
        #[doc = $doc]
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl StreamStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_frame, frames, "Counts a decoded frame.");
    counter!(record_heartbeat, heartbeats, "Counts a heartbeat.");
    counter!(record_connect, connects, "Counts a successful connect.");
    counter!(record_disconnect, disconnects, "Counts a planned disconnect notice.");
    counter!(record_stall, stalls, "Counts a stalled connection.");
    counter!(record_evicted, evicted, "Counts an item dropped from a full queue.");
    counter!(record_unrouted, unrouted, "Counts a data frame without a registered partition.");
    counter!(record_ignored, ignored, "Counts a data frame of an unexpected kind.");
    counter!(record_decode_failure, decode_failures, "Counts an undecodable payload.");

    /// Returns a copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames: load(&self.frames),
            heartbeats: load(&self.heartbeats),
            connects: load(&self.connects),
            disconnects: load(&self.disconnects),
            stalls: load(&self.stalls),
            evicted: load(&self.evicted),
            unrouted: load(&self.unrouted),
            ignored: load(&self.ignored),
            decode_failures: load(&self.decode_failures),
        }
    }
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames decoded from the wire, heartbeats included.
    pub frames: u64,
    /// Heartbeats received.
    pub heartbeats: u64,
    /// Successful connects.
    pub connects: u64,
    /// Planned disconnect notices.
    pub disconnects: u64,
    /// Connections torn down for inactivity.
    pub stalls: u64,
    /// Items dropped to make room in a full queue.
    pub evicted: u64,
    /// Data frames for keys the session was not opened with.
    pub unrouted: u64,
    /// Data frames of a kind the feed does not carry.
    pub ignored: u64,
    /// Payloads that failed to decode.
    pub decode_failures: u64,
}

impl StatsSnapshot {
    /// Returns the number of reconnects, i.e. connects after the first.
    #[must_use]
    pub const fn reconnects(&self) -> u64 {
        self.connects.saturating_sub(1)
    }
}
