//! Benchmark fixtures for fxstream.

use fxstream_client::StreamMessage;

/// Instruments used by the synthetic price body.
pub const INSTRUMENTS: [&str; 4] = ["EUR_USD", "USD_JPY", "GBP_USD", "AUD_USD"];

/// Builds a price stream body of `ticks` tick frames, with a heartbeat after
/// every `heartbeat_every` ticks.
#[must_use]
pub fn price_body(ticks: usize, heartbeat_every: usize) -> Vec<u8> {
    let mut body = String::with_capacity(ticks * 110);
    for i in 0..ticks {
        let instrument = INSTRUMENTS[i % INSTRUMENTS.len()];
        let bid = 1.1 + (i % 1000) as f64 * 0.00001;
        body.push_str(&format!(
            "{{\"tick\":{{\"instrument\":\"{instrument}\",\"time\":\"2016-02-22T13:57:{:02}.{:06}Z\",\"bid\":{bid:.5},\"ask\":{:.5}}}}}\r\n",
            i % 60,
            i % 1_000_000,
            bid + 0.00016
        ));
        if heartbeat_every > 0 && (i + 1) % heartbeat_every == 0 {
            body.push_str("{\"heartbeat\":{\"time\":\"2016-02-22T13:57:53.000000Z\"}}\r\n");
        }
    }
    body.into_bytes()
}

/// Builds one tick message for `instrument`.
#[must_use]
pub fn tick_message(instrument: &str) -> StreamMessage {
    StreamMessage::new(
        "tick",
        format!(
            "{{\"instrument\":\"{instrument}\",\"time\":\"2016-02-22T13:57:52.000000Z\",\"bid\":1.10136,\"ask\":1.10152}}"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_body_shape() {
        let body = price_body(10, 5);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.lines().count(), 12);
        assert_eq!(text.matches("heartbeat").count(), 2);
    }
}
