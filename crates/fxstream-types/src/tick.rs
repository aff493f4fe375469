//! Price tick representation.

use serde::{Deserialize, Serialize};

use crate::Time;

/// A single price update for one instrument, as carried by the `tick` frames of
/// the price stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Instrument symbol (e.g., `EUR_USD`).
    pub instrument: String,
    /// Time of the quote.
    pub time: Time,
    /// Bid price.
    pub bid: f64,
    /// Ask (offer) price.
    pub ask: f64,
    /// Trading status, e.g. `halted`. Absent while the instrument trades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PriceTick {
    /// Creates a new tick.
    #[must_use]
    pub fn new(instrument: impl Into<String>, time: Time, bid: f64, ask: f64) -> Self {
        Self {
            instrument: instrument.into(),
            time,
            bid,
            ask,
            status: None,
        }
    }

    /// Returns the mid price (average of ask and bid).
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }

    /// Returns the spread (ask - bid).
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Returns true if the instrument is halted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.status.as_deref() == Some("halted")
    }
}
