//! Opening streaming connections.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use fxstream_types::ApiError;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode, Url};
use thiserror::Error;

/// Body of an open streaming connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, ConnectError>>;

/// Errors raised while opening or reading a connection.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a status that may succeed on retry.
    #[error("Server error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Server rejected the request with an error object.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Transport failure not raised by the HTTP client.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ConnectError {
    /// Returns true if retrying cannot succeed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

/// Opens a streaming connection and yields its body.
///
/// The supervisor calls [`connect`](Connector::connect) once per attempt, so
/// an implementation must be reusable.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Performs one connection attempt.
    async fn connect(&self) -> Result<ByteStream, ConnectError>;
}

/// A prepared streaming request.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL, including the query.
    pub url: Url,
    /// Headers sent with every attempt.
    pub headers: HeaderMap,
}

impl StreamRequest {
    /// Creates a `GET` request without headers.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }
}

/// [`Connector`] issuing an HTTP request with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    request: StreamRequest,
}

impl HttpConnector {
    /// Creates a connector sending `request` with `client`.
    #[must_use]
    pub const fn new(client: Client, request: StreamRequest) -> Self {
        Self { client, request }
    }

    /// Returns the request sent on every attempt.
    #[must_use]
    pub const fn request(&self) -> &StreamRequest {
        &self.request
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> Result<ByteStream, ConnectError> {
        let response = self
            .client
            .request(self.request.method.clone(), self.request.url.clone())
            .headers(self.request.headers.clone())
            .send()
            .await?;

        let status = response.status();

        // Retry on server errors (5xx) and rate limiting (429)
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ConnectError::Status {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(match serde_json::from_slice::<ApiError>(&body) {
                Ok(err) if err.is_error() && status.is_client_error() => ConnectError::Api(err),
                _ => ConnectError::Status {
                    status: status.as_u16(),
                },
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ConnectError::from))
            .boxed())
    }
}
