//! End-to-end transfers through real pooled connections against a local server

use arber_http::http::{AsyncHttpEngine, EngineError, Headers};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request as ServerRequest, Respond, ResponseTemplate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Order {
    symbol: String,
    side: String,
    quantity: f64,
}

/// Replies with the request body unchanged
struct Echo;

impl Respond for Echo {
    fn respond(&self, request: &ServerRequest) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_raw(request.body.clone(), "application/json")
    }
}

fn started_engine(pool_size: usize) -> AsyncHttpEngine {
    let engine = AsyncHttpEngine::new();
    engine.initialize(pool_size).unwrap();
    engine
}

#[tokio::test]
async fn test_get_returns_status_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"pong":true}"#)
                .insert_header("X-Venue", "local"),
        )
        .mount(&server)
        .await;

    let engine = started_engine(2);
    let response = engine
        .submit_get(format!("{}/api/v3/ping", server.uri()), Headers::new())
        .wait()
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.error.is_none());
    assert_eq!(response.text(), r#"{"pong":true}"#);
    // header names arrive lowercased from the HTTP stack
    assert_eq!(response.header("x-venue"), Some("local"));

    let report = engine.shutdown().await;
    assert_eq!(report.created, 2);
    assert_eq!(report.destroyed, 2);
}

#[tokio::test]
async fn test_caller_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let engine = started_engine(1);
    let mut headers = Headers::new();
    headers.insert("X-Api-Key".to_string(), "secret".to_string());

    let response = engine
        .submit_get(format!("{}/private", server.uri()), headers)
        .wait()
        .await
        .unwrap();
    assert_eq!(response.status_code, 204);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_post_round_trips_typed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("content-type", "application/json"))
        .respond_with(Echo)
        .mount(&server)
        .await;

    let order = Order {
        symbol: "BTCUSDT".to_string(),
        side: "BUY".to_string(),
        quantity: 0.25,
    };
    let payload = serde_json::to_value(&order).unwrap();

    let engine = started_engine(1);
    let echoed = engine
        .submit_post_typed::<Order>(format!("{}/echo", server.uri()), &payload, Headers::new())
        .wait()
        .await
        .unwrap();
    assert_eq!(echoed, order);

    // same body, wrong shape
    let mismatch = engine
        .submit_post_typed::<Vec<String>>(format!("{}/echo", server.uri()), &payload, Headers::new())
        .wait()
        .await
        .unwrap_err();
    assert!(mismatch.is_decode());
    engine.shutdown().await;
}

#[tokio::test]
async fn test_caller_content_type_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_json(json!({"event": "fill"})))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let mut headers = Headers::new();
    headers.insert("content-type".to_string(), "application/x-ndjson".to_string());

    let engine = started_engine(1);
    let response = engine
        .submit_post(
            format!("{}/ingest", server.uri()),
            &json!({"event": "fill"}),
            headers,
        )
        .wait()
        .await
        .unwrap();
    assert_eq!(response.status_code, 202);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_not_found_is_raw_success_but_typed_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such symbol"))
        .mount(&server)
        .await;

    let engine = started_engine(1);
    let url = format!("{}/depth?symbol=NOPE", server.uri());

    let raw = engine.submit_get(url.clone(), Headers::new()).wait().await.unwrap();
    assert_eq!(raw.status_code, 404);
    assert_eq!(raw.text(), "no such symbol");
    assert!(raw.error.is_none());

    let typed = engine
        .submit_get_typed::<serde_json::Value>(url, Headers::new())
        .wait()
        .await;
    assert_eq!(
        typed,
        Err(EngineError::Http {
            status: 404,
            detail: "no such symbol".to_string()
        })
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let engine = started_engine(1);
    let response = engine
        .submit_get(format!("http://127.0.0.1:{}/", port), Headers::new())
        .wait()
        .await
        .unwrap();

    assert_eq!(response.status_code, -1);
    assert!(!response.error.clone().unwrap_or_default().is_empty());
    assert!(response.body.is_empty());

    let typed = engine
        .submit_get_typed::<serde_json::Value>(format!("http://127.0.0.1:{}/", port), Headers::new())
        .wait()
        .await;
    assert!(matches!(typed, Err(EngineError::Transport(_))));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_slow_server_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let engine = started_engine(1);
    let started = Instant::now();
    let response = engine
        .submit_get(format!("{}/slow", server.uri()), Headers::new())
        .wait()
        .await
        .unwrap();

    assert_eq!(response.status_code, -1);
    assert!(response.error.is_some());
    assert!(started.elapsed() < Duration::from_millis(1500));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_connections_are_reused_across_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(5)
        .mount(&server)
        .await;

    let engine = started_engine(2);
    for i in 0..5 {
        let response = engine
            .submit_get(format!("{}/tick/{}", server.uri(), i), Headers::new())
            .wait()
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);
    }

    assert_eq!(engine.stats().completed, 5);
    assert_eq!(engine.stats().available_connections, 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_connection_reusable_after_aborted_transfer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&server)
        .await;

    // a single connection, dropped mid-transfer by the request timeout
    let engine = started_engine(1);
    let stalled = engine
        .submit_get(format!("{}/stalled", server.uri()), Headers::new())
        .wait()
        .await
        .unwrap();
    assert_eq!(stalled.status_code, -1);

    let fresh = engine
        .submit_get(format!("{}/fresh", server.uri()), Headers::new())
        .wait()
        .await
        .unwrap();
    assert_eq!(fresh.status_code, 200);
    assert_eq!(fresh.text(), "fresh");
    engine.shutdown().await;
}
