//! Events command implementation.

use crate::ConnectionArgs;
use crate::display::{print_event, print_heartbeat};
use anyhow::{Context, Result, bail};
use fxstream_lib::prelude::*;

/// Stream account events until interrupted or rejected.
pub(crate) async fn events(args: &ConnectionArgs, mut accounts: Vec<AccountId>) -> Result<()> {
    if accounts.is_empty() {
        let Some(account) = args.account else {
            bail!("No account given. Use --id, --account or FXSTREAM_ACCOUNT");
        };
        accounts.push(account);
    }

    let client = args.client(accounts[0])?;
    let stream = client
        .event_stream(accounts)
        .context("Failed to open event stream")?;
    super::stop_on_ctrl_c(stream.stop_handle());

    let format = args.format;
    let on_event = move |_: &AccountId, event: Event| print_event(format, &event);

    let result = if args.heartbeats {
        stream
            .connect_and_handle_with_heartbeat(on_event, move |time| print_heartbeat(format, time))
            .await
    } else {
        stream.connect_and_handle(on_event).await
    };
    result.context("Event stream ended")?;

    tracing::info!(
        frames = stream.stats().frames,
        "Event stream stopped"
    );
    Ok(())
}
