//! Price stream.

use crate::error::PayloadError;
use crate::frame::StreamMessage;
use crate::session::{Feed, StreamSession, decode_json, expect_kind};
use fxstream_types::{Instrument, PriceTick};
use serde::Deserialize;

/// Feed of `tick` frames, partitioned by instrument.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceFeed;

#[derive(Deserialize)]
struct InstrumentProbe {
    instrument: Instrument,
}

impl Feed for PriceFeed {
    type Key = Instrument;
    type Record = PriceTick;

    const KIND: &'static str = "tick";

    fn partition_key(message: &StreamMessage) -> Result<Instrument, PayloadError> {
        expect_kind::<Self>(message)?;
        decode_json::<InstrumentProbe>(message).map(|probe| probe.instrument)
    }

    fn decode(message: &StreamMessage) -> Result<PriceTick, PayloadError> {
        expect_kind::<Self>(message)?;
        decode_json(message)
    }
}

/// Session streaming prices for a set of instruments.
pub type PriceStream = StreamSession<PriceFeed>;

#[cfg(test)]
mod tests {
    use super::*;
    use fxstream_types::Time;

    #[test]
    fn test_partition_key_normalizes_case() {
        let message = StreamMessage::new(
            "tick",
            r#"{"instrument":"eur_usd","time":"2014-05-07T02:30:00Z","bid":1.3,"ask":1.31}"#,
        );
        assert_eq!(PriceFeed::partition_key(&message).unwrap().as_str(), "EUR_USD");
    }

    #[test]
    fn test_decode_tick() {
        let message = StreamMessage::new(
            "tick",
            r#"{"instrument":"EUR_USD","time":"1456149472000000","bid":1.10136,"ask":1.10152}"#,
        );
        let tick = PriceFeed::decode(&message).unwrap();
        assert_eq!(tick.instrument, "EUR_USD");
        assert_eq!(tick.time, Time::from_unix_seconds(1_456_149_472).unwrap());
        assert!((tick.spread() - 0.00016).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let message = StreamMessage::new("transaction", r#"{"instrument":"EUR_USD"}"#);
        assert!(matches!(
            PriceFeed::decode(&message),
            Err(PayloadError::UnexpectedKind(kind)) if kind == "transaction"
        ));
    }

    #[test]
    fn test_malformed_tick() {
        let message = StreamMessage::new("tick", r#"{"instrument":"EUR_USD","bid":"x"}"#);
        assert!(matches!(
            PriceFeed::decode(&message),
            Err(PayloadError::Json { .. })
        ));
        let message = StreamMessage::new("tick", r#"{"bid":1}"#);
        assert!(PriceFeed::partition_key(&message).is_err());
    }
}
