//! Display utilities and output formatting for the fxstream CLI.

use clap::ValueEnum;
use fxstream_lib::prelude::*;

/// Output format for streamed records.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    /// Aligned columns
    Text,
    /// One JSON object per line
    Ndjson,
}

/// Print one price tick.
pub(crate) fn print_tick(format: Format, tick: &PriceTick) {
    match format {
        Format::Text => {
            let status = if tick.is_halted() { " halted" } else { "" };
            println!(
                "{}  {:<10} {:>12} {:>12}  spread {:.5}{status}",
                tick.time,
                tick.instrument,
                tick.bid,
                tick.ask,
                tick.spread()
            );
        }
        Format::Ndjson => print_json(tick),
    }
}

/// Print one account event.
pub(crate) fn print_event(format: Format, event: &Event) {
    match format {
        Format::Text => {
            let instrument = event.instrument().unwrap_or("-");
            println!(
                "{}  {:>12} {:>10}  {:<22} {instrument}",
                event.time(),
                event.id(),
                event.account_id(),
                event.event_type(),
            );
        }
        Format::Ndjson => print_json(&serde_json::json!({
            "id": event.id(),
            "accountId": event.account_id(),
            "time": event.time(),
            "type": event.event_type(),
            "instrument": event.instrument(),
        })),
    }
}

/// Print one heartbeat.
pub(crate) fn print_heartbeat(format: Format, time: Time) {
    match format {
        Format::Text => println!("{time}  heartbeat"),
        Format::Ndjson => print_json(&serde_json::json!({ "heartbeat": { "time": time } })),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize record"),
    }
}
