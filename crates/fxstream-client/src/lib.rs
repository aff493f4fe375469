//! Streaming client for fxstream price and event feeds.
//!
//! This crate provides the streaming pipeline:
//!
//! - [`StreamClient`] - Builds authenticated stream requests per environment
//! - [`FrameDecoder`] - Splits a response body into classified frames
//! - [`ConnectionSupervisor`] - Connects, reconnects with backoff, detects stalls
//! - [`Dispatcher`] - Per-key bounded queues with one worker each
//! - [`HeartbeatRelay`] - Delivers heartbeats independently of data
//! - [`StreamSession`] - Start/stop façade shared by [`PriceStream`] and [`EventStream`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fxstream/fxstream/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backoff;
mod client;
mod config;
mod connector;
mod dispatch;
mod error;
mod events;
mod frame;
mod gate;
mod heartbeat;
mod prices;
mod session;
mod stats;
mod supervisor;
#[cfg(test)]
mod testing;
pub mod url;

pub use backoff::Backoff;
pub use client::{DATETIME_FORMAT_HEADER, StreamClient};
pub use config::{ClientConfig, Environment, EnvironmentParseError, StreamConfig};
pub use connector::{ByteStream, ConnectError, Connector, HttpConnector, StreamRequest};
pub use dispatch::{Dispatcher, PartitionHandler, PartitionQueue, Push, RouteOutcome, Router};
pub use error::{PayloadError, StreamError};
pub use events::{EventFeed, EventStream};
pub use frame::{DISCONNECT, Frame, FrameDecoder, FrameError, HEARTBEAT, StreamMessage, decode_disconnect};
pub use heartbeat::{HeartbeatHandler, HeartbeatRelay, decode_heartbeat};
pub use prices::{PriceFeed, PriceStream};
pub use session::{Feed, StopHandle, StreamSession};
pub use stats::{StatsSnapshot, StreamStats};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
