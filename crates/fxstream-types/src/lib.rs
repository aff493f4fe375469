//! Core types for the fxstream forex streaming client.
//!
//! This crate provides the records decoded from the broker's streaming feeds:
//!
//! - [`PriceTick`] - A bid/ask quote for one instrument
//! - [`Event`] - An account event (transaction), classified into [`EventKind`]
//! - [`Time`] - Timestamp accepting every datetime format the API emits
//! - [`Instrument`] - Normalized instrument symbol used as a price partition key
//! - [`ApiError`] - Error object returned by the API

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod event;
mod instrument;
mod tick;
mod time;

pub use error::{ApiError, TimeError};
pub use event::{
    AccountId, Event, EventHeader, EventKind, OrderCreate, OrderUpdate, TradeClose, TradeDetail,
    TradeOpen, TradeUpdate,
};
pub use instrument::{Instrument, InstrumentParseError};
pub use tick::PriceTick;
pub use time::Time;
