//! End-to-end tests against a mock streaming server.

use fxstream_client::{ClientConfig, Environment, StreamClient, StreamConfig, StreamError};
use fxstream_types::{Instrument, PriceTick};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRICES: &str = concat!(
    r#"{"tick":{"instrument":"EUR_USD","time":"2016-02-22T13:57:52.000000Z","bid":1.10136,"ask":1.10152}}"#,
    "\r\n",
    r#"{"heartbeat":{"time":"2016-02-22T13:57:53.000000Z"}}"#,
    "\r\n",
    r#"{"tick":{"instrument":"USD_JPY","time":"2016-02-22T13:57:54.000000Z","bid":112.85,"ask":112.87}}"#,
    "\r\n",
);

fn client(server: &MockServer) -> StreamClient {
    let config = ClientConfig::new(Environment::Practice, 12345)
        .with_token("test-token")
        .with_stream_url(server.uri());
    StreamClient::new(config)
        .unwrap()
        .with_stream_config(
            StreamConfig::default().with_backoff(Duration::from_millis(10), Duration::from_millis(100)),
        )
}

fn ndjson(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json")
}

/// Streams until ticks for all `expected` instruments arrived.
async fn collect_ticks(
    client: &StreamClient,
    expected: &[&str],
) -> Result<HashMap<String, PriceTick>, StreamError> {
    let instruments: Vec<Instrument> = expected.iter().map(|s| s.parse().unwrap()).collect();
    let stream = client.price_stream(instruments)?;
    let handle = stream.stop_handle();
    let wanted = expected.len();

    let seen = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&seen);
    let on_tick = move |instrument: &Instrument, tick: PriceTick| {
        let mut seen = sink.lock();
        seen.insert(instrument.to_string(), tick);
        if seen.len() == wanted {
            handle.stop();
        }
    };

    tokio::time::timeout(Duration::from_secs(10), stream.connect_and_handle(on_tick))
        .await
        .expect("stream did not stop")?;

    let seen = seen.lock().clone();
    Ok(seen)
}

#[tokio::test]
async fn test_price_stream_delivers_ticks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .and(query_param("accountId", "12345"))
        .and(query_param("instruments", "EUR_USD,USD_JPY"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-accept-datetime-format", "RFC3339"))
        .respond_with(ndjson(PRICES))
        .mount(&server)
        .await;

    let ticks = collect_ticks(&client(&server), &["EUR_USD", "USD_JPY"])
        .await
        .unwrap();

    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks["EUR_USD"].bid, 1.10136);
    assert_eq!(ticks["USD_JPY"].ask, 112.87);
    assert_eq!(ticks["USD_JPY"].time.to_string(), "2016-02-22T13:57:54Z");
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 1,
            "message": "Invalid or malformed argument: instruments",
            "moreInfo": "http://developer.oanda.com/docs/v1/troubleshooting"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = collect_ticks(&client(&server), &["XXX_YYY"])
        .await
        .unwrap_err();

    let api = err.api_error().expect("expected an API error");
    assert_eq!(api.code, 1);
    assert_eq!(api.message, "Invalid or malformed argument: instruments");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ndjson(PRICES))
        .mount(&server)
        .await;

    let ticks = collect_ticks(&client(&server), &["EUR_USD"]).await.unwrap();

    assert!(ticks.contains_key("EUR_USD"));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 3);
}

#[tokio::test]
async fn test_event_stream_request() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"transaction":{"id":176403879,"accountId":1,"time":"2016-02-22T13:57:52.000000Z","type":"ORDER_FILLED","orderId":5}}"#,
        "\n",
        r#"{"heartbeat":{"time":"2016-02-22T13:57:53.000000Z"}}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/v1/events"))
        .and(query_param("accountIds", "1,2"))
        .respond_with(ndjson(body))
        .mount(&server)
        .await;

    let stream = client(&server).event_stream([1, 2]).unwrap();
    let handle = stream.stop_handle();
    let ids = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ids);

    tokio::time::timeout(
        Duration::from_secs(10),
        stream.connect_and_handle(move |account: &i64, event: fxstream_types::Event| {
            sink.lock().push((*account, event.id()));
            handle.stop();
        }),
    )
    .await
    .expect("stream did not stop")
    .unwrap();

    assert_eq!(ids.lock()[0], (1, 176_403_879));
    assert!(stream.stats().connects >= 1);
}
