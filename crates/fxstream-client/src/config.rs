//! Client and stream configuration.

use fxstream_types::AccountId;
use std::str::FromStr;
use std::time::Duration;

/// Trading environment, which selects the host a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Unauthenticated sandbox, served over plain HTTP.
    Sandbox,
    /// Practice (demo) accounts.
    #[default]
    Practice,
    /// Live trading accounts.
    Live,
}

impl Environment {
    /// Returns the environment name as used in host names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Practice => "fxpractice",
            Self::Live => "fxtrade",
        }
    }

    /// Returns the URL scheme of the environment.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Sandbox => "http",
            Self::Practice | Self::Live => "https",
        }
    }

    /// Returns the base URL of the streaming host, e.g.
    /// `https://stream-fxpractice.oanda.com`.
    #[must_use]
    pub fn stream_base_url(&self) -> String {
        format!("{}://stream-{}.oanda.com", self.scheme(), self.as_str())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "practice" | "fxpractice" | "demo" => Ok(Self::Practice),
            "live" | "trade" | "fxtrade" => Ok(Self::Live),
            _ => Err(EnvironmentParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid environment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentParseError(String);

impl std::fmt::Display for EnvironmentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected one of: sandbox, practice, live",
            self.0
        )
    }
}

impl std::error::Error for EnvironmentParseError {}

/// Configuration for the HTTP side of the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target environment.
    pub environment: Environment,
    /// Personal access token, sent as a bearer token. Not needed for the sandbox.
    pub token: Option<String>,
    /// Account the price stream is requested for.
    pub account_id: AccountId,
    /// Overrides the environment's streaming host (proxies, tests).
    pub stream_url: Option<String>,
    /// Value of the `X-Accept-Datetime-Format` header.
    pub datetime_format: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            token: None,
            account_id: 0,
            stream_url: None,
            datetime_format: "RFC3339".to_string(),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("fxstream/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given environment and account.
    #[must_use]
    pub fn new(environment: Environment, account_id: AccountId) -> Self {
        Self {
            environment,
            account_id,
            ..Self::default()
        }
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the streaming host.
    #[must_use]
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Returns the base URL streaming requests are sent to.
    #[must_use]
    pub fn stream_base_url(&self) -> String {
        self.stream_url.as_ref().map_or_else(
            || self.environment.stream_base_url(),
            |url| url.trim_end_matches('/').to_string(),
        )
    }
}

/// Tuning for a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of each partition queue.
    pub queue_capacity: usize,
    /// Capacity of the heartbeat queue.
    pub heartbeat_capacity: usize,
    /// Maximum idle time on an open connection before it is torn down.
    pub stall_timeout: Duration,
    /// Delay before the first reconnect attempt after a failed connect.
    pub base_delay: Duration,
    /// Upper bound for the reconnect delay.
    pub max_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 5,
            heartbeat_capacity: 4,
            stall_timeout: Duration::from_secs(10),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5 * 60),
        }
    }
}

impl StreamConfig {
    /// Sets the partition queue capacity (at least one).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the stall timeout.
    #[must_use]
    pub const fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Sets the base and maximum reconnect delays.
    #[must_use]
    pub const fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }
}
