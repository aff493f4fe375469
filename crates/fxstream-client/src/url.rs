//! Streaming endpoint URLs.

use crate::error::StreamError;
use fxstream_types::{AccountId, Instrument};
use reqwest::Url;

/// Path of the price stream.
pub const PRICES_PATH: &str = "/v1/prices";

/// Path of the event stream.
pub const EVENTS_PATH: &str = "/v1/events";

/// Builds the price stream URL for `instruments` of `account_id`.
///
/// URL format: `{base}/v1/prices?accountId={ACCOUNT}&instruments={A},{B}`
///
/// # Example
///
/// ```
/// use fxstream_client::url::prices_url;
///
/// let instruments = ["EUR_USD".parse().unwrap(), "usd_jpy".parse().unwrap()];
/// let url = prices_url("https://stream-fxpractice.oanda.com", 12345, &instruments).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://stream-fxpractice.oanda.com/v1/prices?accountId=12345&instruments=EUR_USD%2CUSD_JPY"
/// );
/// ```
///
/// # Errors
///
/// Returns [`StreamError::InvalidArgument`] if `base` is not a valid URL or
/// `instruments` is empty.
pub fn prices_url(
    base: &str,
    account_id: AccountId,
    instruments: &[Instrument],
) -> Result<Url, StreamError> {
    if instruments.is_empty() {
        return Err(StreamError::InvalidArgument(
            "price stream needs at least one instrument".to_string(),
        ));
    }
    let list = join(instruments.iter().map(Instrument::as_str));
    let mut url = endpoint(base, PRICES_PATH)?;
    url.query_pairs_mut()
        .append_pair("accountId", &account_id.to_string())
        .append_pair("instruments", &list);
    Ok(url)
}

/// Builds the event stream URL for `account_ids`.
///
/// URL format: `{base}/v1/events?accountIds={A},{B}`
///
/// # Errors
///
/// Returns [`StreamError::InvalidArgument`] if `base` is not a valid URL or
/// `account_ids` is empty.
pub fn events_url(base: &str, account_ids: &[AccountId]) -> Result<Url, StreamError> {
    if account_ids.is_empty() {
        return Err(StreamError::InvalidArgument(
            "event stream needs at least one account".to_string(),
        ));
    }
    let ids: Vec<String> = account_ids.iter().map(ToString::to_string).collect();
    let list = join(ids.iter().map(String::as_str));
    let mut url = endpoint(base, EVENTS_PATH)?;
    url.query_pairs_mut().append_pair("accountIds", &list);
    Ok(url)
}

fn endpoint(base: &str, path: &str) -> Result<Url, StreamError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| StreamError::InvalidArgument(format!("invalid stream URL '{raw}': {e}")))
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(",")
}
