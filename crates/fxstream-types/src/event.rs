//! Account events (transactions).
//!
//! Every event shares an [`EventHeader`]; the `type` field of the header
//! selects the [`EventKind`] variant holding the kind-specific fields. Kinds the
//! client does not know about decode as [`EventKind::Unknown`] so that server
//! additions never break a running stream.

use serde::{Deserialize, Serialize};

use crate::Time;

/// Account identifier, the partition key of the event stream.
pub type AccountId = i64;

/// Fields common to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    /// Transaction id.
    pub id: u64,
    /// Account the event belongs to.
    pub account_id: AccountId,
    /// Time the event occurred.
    pub time: Time,
    /// Raw event type, e.g. `ORDER_FILLED`.
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Details of a trade opened or reduced by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    /// Trade id.
    pub id: i64,
    /// Units opened or reduced.
    #[serde(default)]
    pub units: i64,
    /// Realized profit or loss.
    #[serde(default)]
    pub pl: f64,
    /// Interest paid or received.
    #[serde(default)]
    pub interest: f64,
}

/// A trade opened by a market order or by an account migration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeOpen {
    /// Instrument symbol.
    pub instrument: String,
    /// `buy` or `sell`.
    pub side: String,
    /// Number of units.
    pub units: i64,
    /// Execution price.
    pub price: f64,
    /// Realized profit or loss.
    pub pl: f64,
    /// Interest paid or received.
    pub interest: f64,
    /// Lower price bound, zero when unset.
    pub lower_bound: f64,
    /// Upper price bound, zero when unset.
    pub upper_bound: f64,
    /// Account balance after the event.
    pub account_balance: f64,
    /// Take-profit price, zero when unset.
    pub take_profit_price: f64,
    /// Stop-loss price, zero when unset.
    pub stop_loss_price: f64,
    /// Trailing stop distance in pips, zero when unset.
    pub trailing_stop_loss_distance: f64,
    /// Trade opened by this event.
    pub trade_opened: Option<TradeDetail>,
    /// Trade reduced by this event.
    pub trade_reduced: Option<TradeDetail>,
}

/// A limit, stop or market-if-touched order creation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderCreate {
    /// Instrument symbol.
    pub instrument: String,
    /// `buy` or `sell`.
    pub side: String,
    /// Number of units.
    pub units: i64,
    /// Trigger price.
    pub price: f64,
    /// Order expiry.
    pub expiry: Option<Time>,
    /// Reason reported by the server.
    pub reason: String,
    /// Lower price bound, zero when unset.
    pub lower_bound: f64,
    /// Upper price bound, zero when unset.
    pub upper_bound: f64,
    /// Take-profit price, zero when unset.
    pub take_profit_price: f64,
    /// Stop-loss price, zero when unset.
    pub stop_loss_price: f64,
    /// Trailing stop distance in pips, zero when unset.
    pub trailing_stop_loss_distance: f64,
}

/// A change to a pending order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderUpdate {
    /// Instrument symbol.
    pub instrument: String,
    /// `buy` or `sell`.
    pub side: String,
    /// Number of units.
    pub units: i64,
    /// Reason reported by the server.
    pub reason: String,
    /// Lower price bound, zero when unset.
    pub lower_bound: f64,
    /// Upper price bound, zero when unset.
    pub upper_bound: f64,
    /// Take-profit price, zero when unset.
    pub take_profit_price: f64,
    /// Stop-loss price, zero when unset.
    pub stop_loss_price: f64,
    /// Trailing stop distance in pips, zero when unset.
    pub trailing_stop_loss_distance: f64,
}

/// A change to the exit conditions of an open trade.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeUpdate {
    /// Instrument symbol.
    pub instrument: String,
    /// Number of units.
    pub units: i64,
    /// `buy` or `sell`.
    pub side: String,
    /// Trade id.
    pub trade_id: i64,
    /// Take-profit price, zero when unset.
    pub take_profit_price: f64,
    /// Stop-loss price, zero when unset.
    pub stop_loss_price: f64,
    /// Trailing stop distance in pips, zero when unset.
    pub trailing_stop_loss_distance: f64,
}

/// A trade closed by the client, a triggered exit or a margin closeout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeClose {
    /// Instrument symbol.
    pub instrument: String,
    /// Number of units.
    pub units: i64,
    /// `buy` or `sell`.
    pub side: String,
    /// Closing price.
    pub price: f64,
    /// Realized profit or loss.
    pub pl: f64,
    /// Interest paid or received.
    pub interest: f64,
    /// Account balance after the event.
    pub account_balance: f64,
    /// Trade id.
    pub trade_id: i64,
}

/// Kind-specific content of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// `CREATE`: account created.
    AccountCreate {
        /// Home currency of the new account.
        home_currency: String,
        /// Reason reported by the server.
        reason: String,
    },
    /// `MARKET_ORDER_CREATE`.
    MarketOrderCreate(TradeOpen),
    /// `LIMIT_ORDER_CREATE`, `STOP_ORDER_CREATE`, `MARKET_IF_TOUCHED_CREATE`.
    OrderCreate(OrderCreate),
    /// `ORDER_UPDATE`.
    OrderUpdate(OrderUpdate),
    /// `ORDER_CANCEL`.
    OrderCancel {
        /// Cancelled order id.
        order_id: i64,
        /// Reason reported by the server.
        reason: String,
    },
    /// `ORDER_FILLED`.
    OrderFilled {
        /// Filled order id.
        order_id: i64,
    },
    /// `TRADE_UPDATE`.
    TradeUpdate(TradeUpdate),
    /// `TRADE_CLOSE`, `MIGRATE_TRADE_CLOSE`, `TAKE_PROFIT_FILLED`,
    /// `STOP_LOSS_FILLED`, `TRAILING_STOP_FILLED`, `MARGIN_CLOSEOUT`.
    TradeClose(TradeClose),
    /// `MIGRATE_TRADE_OPEN`.
    MigrateTradeOpen(TradeOpen),
    /// `SET_MARGIN_RATE`.
    SetMarginRate {
        /// New margin rate.
        rate: f64,
    },
    /// `TRANSFER_FUNDS`.
    TransferFunds {
        /// Amount transferred (negative for withdrawals).
        amount: f64,
    },
    /// `DAILY_INTEREST`.
    DailyInterest {
        /// Interest paid or received.
        interest: f64,
    },
    /// `FEE`.
    Fee {
        /// Fee amount.
        amount: f64,
        /// Account balance after the fee.
        account_balance: f64,
        /// Reason reported by the server.
        reason: String,
    },
    /// Any type this client does not know; see [`EventHeader::event_type`].
    Unknown,
}

/// An account event with its classified content.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Common fields.
    pub header: EventHeader,
    /// Kind-specific fields.
    pub kind: EventKind,
}

impl Event {
    /// Decodes and classifies an event from the JSON object of a `transaction`
    /// frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing or a field has the wrong type.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        let header: EventHeader = serde_json::from_slice(data)?;
        let body: EventBody = serde_json::from_slice(data)?;
        let kind = classify(&header.event_type, body);
        Ok(Self { header, kind })
    }

    /// Returns the transaction id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.header.id
    }

    /// Returns the account the event belongs to.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.header.account_id
    }

    /// Returns the event time.
    #[must_use]
    pub const fn time(&self) -> Time {
        self.header.time
    }

    /// Returns the raw event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.header.event_type
    }

    /// Returns the instrument the event refers to, if any.
    #[must_use]
    pub fn instrument(&self) -> Option<&str> {
        let instrument = match &self.kind {
            EventKind::MarketOrderCreate(t) | EventKind::MigrateTradeOpen(t) => &t.instrument,
            EventKind::OrderCreate(o) => &o.instrument,
            EventKind::OrderUpdate(o) => &o.instrument,
            EventKind::TradeUpdate(t) => &t.instrument,
            EventKind::TradeClose(t) => &t.instrument,
            _ => return None,
        };
        (!instrument.is_empty()).then_some(instrument.as_str())
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event{{id: {}, account: {}, type: {}}}",
            self.header.id, self.header.account_id, self.header.event_type
        )
    }
}

/// Union of every kind-specific field; absent fields take their zero value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EventBody {
    instrument: String,
    side: String,
    units: i64,
    price: f64,
    expiry: Option<Time>,
    reason: String,
    lower_bound: f64,
    upper_bound: f64,
    take_profit_price: f64,
    stop_loss_price: f64,
    trailing_stop_loss_distance: f64,
    pl: f64,
    interest: f64,
    account_balance: f64,
    rate: f64,
    amount: f64,
    trade_id: i64,
    order_id: i64,
    trade_opened: Option<TradeDetail>,
    trade_reduced: Option<TradeDetail>,
    home_currency: String,
}

impl EventBody {
    fn into_trade_open(self) -> TradeOpen {
        TradeOpen {
            instrument: self.instrument,
            side: self.side,
            units: self.units,
            price: self.price,
            pl: self.pl,
            interest: self.interest,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            account_balance: self.account_balance,
            take_profit_price: self.take_profit_price,
            stop_loss_price: self.stop_loss_price,
            trailing_stop_loss_distance: self.trailing_stop_loss_distance,
            trade_opened: self.trade_opened,
            trade_reduced: self.trade_reduced,
        }
    }
}

fn classify(event_type: &str, body: EventBody) -> EventKind {
    match event_type {
        "CREATE" => EventKind::AccountCreate {
            home_currency: body.home_currency,
            reason: body.reason,
        },
        "MARKET_ORDER_CREATE" => EventKind::MarketOrderCreate(body.into_trade_open()),
        "LIMIT_ORDER_CREATE" | "STOP_ORDER_CREATE" | "MARKET_IF_TOUCHED_CREATE" => {
            EventKind::OrderCreate(OrderCreate {
                instrument: body.instrument,
                side: body.side,
                units: body.units,
                price: body.price,
                expiry: body.expiry,
                reason: body.reason,
                lower_bound: body.lower_bound,
                upper_bound: body.upper_bound,
                take_profit_price: body.take_profit_price,
                stop_loss_price: body.stop_loss_price,
                trailing_stop_loss_distance: body.trailing_stop_loss_distance,
            })
        }
        "ORDER_UPDATE" => EventKind::OrderUpdate(OrderUpdate {
            instrument: body.instrument,
            side: body.side,
            units: body.units,
            reason: body.reason,
            lower_bound: body.lower_bound,
            upper_bound: body.upper_bound,
            take_profit_price: body.take_profit_price,
            stop_loss_price: body.stop_loss_price,
            trailing_stop_loss_distance: body.trailing_stop_loss_distance,
        }),
        "ORDER_CANCEL" => EventKind::OrderCancel {
            order_id: body.order_id,
            reason: body.reason,
        },
        "ORDER_FILLED" => EventKind::OrderFilled {
            order_id: body.order_id,
        },
        "TRADE_UPDATE" => EventKind::TradeUpdate(TradeUpdate {
            instrument: body.instrument,
            units: body.units,
            side: body.side,
            trade_id: body.trade_id,
            take_profit_price: body.take_profit_price,
            stop_loss_price: body.stop_loss_price,
            trailing_stop_loss_distance: body.trailing_stop_loss_distance,
        }),
        "TRADE_CLOSE"
        | "MIGRATE_TRADE_CLOSE"
        | "TAKE_PROFIT_FILLED"
        | "STOP_LOSS_FILLED"
        | "TRAILING_STOP_FILLED"
        | "MARGIN_CLOSEOUT" => EventKind::TradeClose(TradeClose {
            instrument: body.instrument,
            units: body.units,
            side: body.side,
            price: body.price,
            pl: body.pl,
            interest: body.interest,
            account_balance: body.account_balance,
            trade_id: body.trade_id,
        }),
        "MIGRATE_TRADE_OPEN" => EventKind::MigrateTradeOpen(body.into_trade_open()),
        "SET_MARGIN_RATE" => EventKind::SetMarginRate { rate: body.rate },
        "TRANSFER_FUNDS" => EventKind::TransferFunds {
            amount: body.amount,
        },
        "DAILY_INTEREST" => EventKind::DailyInterest {
            interest: body.interest,
        },
        "FEE" => EventKind::Fee {
            amount: body.amount,
            account_balance: body.account_balance,
            reason: body.reason,
        },
        _ => EventKind::Unknown,
    }
}
