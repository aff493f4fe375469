//! Resilient streaming consumer for forex price and account event feeds.
//!
//! This is a facade crate that re-exports functionality from the fxstream
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```no_run
//! use fxstream_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new(Environment::Practice, 12345).with_token("token");
//!     let client = StreamClient::new(config)?;
//!
//!     let stream = client.price_stream(["EUR_USD".parse()?])?;
//!     stream
//!         .connect_and_handle(|instrument, tick| {
//!             println!("{instrument}: {} / {}", tick.bid, tick.ask);
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fxstream/fxstream/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export record types
pub use fxstream_types::*;

// Re-export the streaming client
#[cfg(feature = "client")]
pub use fxstream_client::{
    Backoff, ClientConfig, ConnectError, ConnectionState, Connector, Environment,
    EnvironmentParseError, EventFeed, EventStream, Feed, Frame, FrameDecoder, FrameError,
    HttpConnector, PayloadError, PriceFeed, PriceStream, StatsSnapshot, StopHandle, StreamClient,
    StreamConfig, StreamError, StreamMessage, StreamRequest, StreamSession, url,
};

/// Prelude module for convenient imports.
///
/// ```
/// use fxstream_lib::prelude::*;
/// ```
pub mod prelude {
    pub use fxstream_types::{AccountId, ApiError, Event, EventKind, Instrument, PriceTick, Time};

    #[cfg(feature = "client")]
    pub use fxstream_client::{
        ClientConfig, ConnectionState, Environment, EventStream, PriceStream, StopHandle,
        StreamClient, StreamConfig, StreamError,
    };
}
