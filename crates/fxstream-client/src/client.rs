//! HTTP client for opening price and event streams.

use crate::config::{ClientConfig, StreamConfig};
use crate::connector::{Connector, HttpConnector, StreamRequest};
use crate::error::StreamError;
use crate::events::EventStream;
use crate::prices::PriceStream;
use crate::url::{events_url, prices_url};
use fxstream_types::{AccountId, Instrument};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

/// Header selecting the timestamp format of responses.
pub static DATETIME_FORMAT_HEADER: HeaderName = HeaderName::from_static("x-accept-datetime-format");

/// Entry point for opening streams against one environment.
#[derive(Debug, Clone)]
pub struct StreamClient {
    client: Client,
    config: ClientConfig,
    stream: StreamConfig,
}

impl StreamClient {
    /// Creates a new stream client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        let client = Client::builder()
            // Stream bodies live for hours; a finished one is never reused
            .pool_max_idle_per_host(0)
            // Disable Nagle's algorithm for lower latency
            .tcp_nodelay(true)
            // Keep TCP connections alive
            .tcp_keepalive(Duration::from_secs(60))
            // No request timeout: the stall timer bounds silent connections
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            config,
            stream: StreamConfig::default(),
        })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, StreamError> {
        Self::new(ClientConfig::default())
    }

    /// Sets the tuning applied to streams opened by this client.
    #[must_use]
    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the stream tuning.
    #[must_use]
    pub const fn stream_config(&self) -> &StreamConfig {
        &self.stream
    }

    /// Prepares an authenticated `GET` request for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidArgument`] if the token or datetime
    /// format is not a valid header value.
    pub fn request(&self, url: Url) -> Result<StreamRequest, StreamError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.config.token {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        headers.insert(
            DATETIME_FORMAT_HEADER.clone(),
            header_value(&self.config.datetime_format)?,
        );
        Ok(StreamRequest {
            headers,
            ..StreamRequest::get(url)
        })
    }

    /// Returns a connector sending `request` with this client.
    #[must_use]
    pub fn connector(&self, request: StreamRequest) -> Arc<dyn Connector> {
        Arc::new(HttpConnector::new(self.client.clone(), request))
    }

    /// Opens a price stream for `instruments` of the configured account.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidArgument`] if `instruments` is empty or
    /// the request cannot be built.
    pub fn price_stream(
        &self,
        instruments: impl IntoIterator<Item = Instrument>,
    ) -> Result<PriceStream, StreamError> {
        let instruments: Vec<Instrument> = instruments.into_iter().collect();
        let url = prices_url(
            &self.config.stream_base_url(),
            self.config.account_id,
            &instruments,
        )?;
        tracing::debug!(%url, "Opening price stream");
        let connector = self.connector(self.request(url)?);
        PriceStream::new(connector, instruments, self.stream)
    }

    /// Opens an event stream for `account_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidArgument`] if `account_ids` is empty or
    /// the request cannot be built.
    pub fn event_stream(
        &self,
        account_ids: impl IntoIterator<Item = AccountId>,
    ) -> Result<EventStream, StreamError> {
        let account_ids: Vec<AccountId> = account_ids.into_iter().collect();
        let url = events_url(&self.config.stream_base_url(), &account_ids)?;
        tracing::debug!(%url, "Opening event stream");
        let connector = self.connector(self.request(url)?);
        EventStream::new(connector, account_ids, self.stream)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StreamError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| StreamError::InvalidArgument(format!("invalid header value: {e}")))?;
    header.set_sensitive(value.starts_with("Bearer "));
    Ok(header)
}
