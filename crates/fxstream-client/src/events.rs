//! Account event stream.

use crate::error::PayloadError;
use crate::frame::StreamMessage;
use crate::session::{Feed, StreamSession, decode_json, expect_kind};
use fxstream_types::{AccountId, Event};
use serde::Deserialize;

/// Feed of `transaction` frames, partitioned by account.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFeed;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountProbe {
    account_id: AccountId,
}

impl Feed for EventFeed {
    type Key = AccountId;
    type Record = Event;

    const KIND: &'static str = "transaction";

    fn partition_key(message: &StreamMessage) -> Result<AccountId, PayloadError> {
        expect_kind::<Self>(message)?;
        decode_json::<AccountProbe>(message).map(|probe| probe.account_id)
    }

    fn decode(message: &StreamMessage) -> Result<Event, PayloadError> {
        expect_kind::<Self>(message)?;
        Event::from_json(message.payload()).map_err(|source| PayloadError::Json {
            kind: Self::KIND.to_string(),
            source,
        })
    }
}

/// Session streaming events for a set of accounts.
pub type EventStream = StreamSession<EventFeed>;
