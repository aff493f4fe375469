//! CLI command implementations.

pub(crate) mod events;
pub(crate) mod prices;

use fxstream_lib::prelude::*;

/// Stops the session on Ctrl-C.
pub(crate) fn stop_on_ctrl_c(handle: StopHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping");
            handle.stop();
        }
    });
}
