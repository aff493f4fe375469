//! Prices command implementation.

use crate::ConnectionArgs;
use crate::display::{print_heartbeat, print_tick};
use anyhow::{Context, Result};
use fxstream_lib::prelude::*;

/// Stream prices until interrupted or rejected.
pub(crate) async fn prices(args: &ConnectionArgs, instruments: Vec<Instrument>) -> Result<()> {
    let client = args.client(args.account.unwrap_or_default())?;
    let stream = client
        .price_stream(instruments)
        .context("Failed to open price stream")?;
    super::stop_on_ctrl_c(stream.stop_handle());

    let format = args.format;
    let on_tick = move |_: &Instrument, tick: PriceTick| print_tick(format, &tick);

    let result = if args.heartbeats {
        stream
            .connect_and_handle_with_heartbeat(on_tick, move |time| print_heartbeat(format, time))
            .await
    } else {
        stream.connect_and_handle(on_tick).await
    };
    result.context("Price stream ended")?;

    let stats = stream.stats();
    tracing::info!(
        frames = stats.frames,
        reconnects = stats.reconnects(),
        dropped = stats.evicted,
        "Price stream stopped"
    );
    Ok(())
}
