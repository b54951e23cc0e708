//! End-to-end forwarding through a live relay.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_missing_target_is_rejected_without_outbound_call() {
    let (_backend, hits) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let client = common::http_client();

    for query in ["", "?page=1", "?url="] {
        let res = client
            .post(format!("http://{}/api/forward{}", relay, query))
            .body("payload")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.headers().contains_key("x-request-id"));
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"error": "Missing target URL"}));
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_relay_only_headers_are_stripped() {
    let (backend, _) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;

    let res = common::http_client()
        .get(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/echo", backend))])
        .header("host", "example.com")
        .header("x-trace-id", "123")
        .header("authorization", "Bearer abc")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-backend"], "echo");
    let echoed: Value = res.json().await.unwrap();
    let headers = &echoed["headers"];
    assert!(headers.get("x-trace-id").is_none());
    assert!(headers.get("x-request-id").is_none());
    assert_ne!(headers["host"], "example.com");
    assert_eq!(headers["authorization"], "Bearer abc");

    shutdown.trigger();
}

#[tokio::test]
async fn test_query_params_pass_through_without_url() {
    let (backend, _) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;

    let res = common::http_client()
        .get(format!("http://{}/api/forward", relay))
        .query(&[
            ("url", format!("http://{}/echo", backend)),
            ("page", "2".to_string()),
            ("tag", "a b".to_string()),
        ])
        .send()
        .await
        .unwrap();

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["query"], "page=2&tag=a+b");

    shutdown.trigger();
}

#[tokio::test]
async fn test_json_and_raw_bodies_are_forwarded() {
    let (backend, _) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let client = common::http_client();
    let target = format!("http://{}/echo", backend);

    let res = client
        .post(format!("http://{}/api/forward", relay))
        .query(&[("url", &target)])
        .json(&json!({"name": "relay", "tags": [1, 2]}))
        .send()
        .await
        .unwrap();
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["headers"]["content-type"], "application/json");
    let body: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({"name": "relay", "tags": [1, 2]}));

    let res = client
        .put(format!("http://{}/api/forward", relay))
        .query(&[("url", &target)])
        .header("content-type", "text/plain")
        .body("hello target")
        .send()
        .await
        .unwrap();
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["body"], "hello target");
    assert_eq!(echoed["headers"]["content-length"], "12");

    shutdown.trigger();
}

#[tokio::test]
async fn test_json_body_bytes_are_not_reencoded() {
    let (backend, _) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let payload = r#"{"z":1,"a":2,"id":123456789012345678901234567890,"p":0.1000000000000000055511151231257827}"#;

    let res = common::http_client()
        .post(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/echo", backend))])
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["body"], payload);
    assert_eq!(echoed["headers"]["content-type"], "application/json");

    shutdown.trigger();
}

#[tokio::test]
async fn test_large_body_is_forwarded() {
    let (backend, hits) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let payload = "a".repeat(3 * 1024 * 1024);

    let res = common::http_client()
        .post(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/echo", backend))])
        .header("content-type", "text/plain")
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["body"].as_str().unwrap().len(), payload.len());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_body_gets_json_413() {
    let (backend, hits) = common::start_echo_backend().await;
    let config = http_relay::ServerConfig {
        max_body_size: 1024,
        ..common::relay_config()
    };
    let (relay, shutdown) = common::start_relay(config).await;

    let res = common::http_client()
        .post(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/echo", backend))])
        .body("a".repeat(4096))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status_code"], 413);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_caller_disconnect_does_not_cancel_forward() {
    let (backend, hits) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let impatient = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let res = impatient
        .get(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/slow/500", backend))])
        .send()
        .await;
    assert!(res.unwrap_err().is_timeout());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    for _ in 0..40 {
        if hits.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_target_status_is_relayed_verbatim() {
    let (backend, hits) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let client = common::http_client();

    for code in [201u16, 404, 503] {
        let res = client
            .get(format!("http://{}/api/forward", relay))
            .query(&[("url", format!("http://{}/status/{}", backend, code))])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), code);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"code": code}));
    }

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    shutdown.trigger();
}

#[tokio::test]
async fn test_text_body_is_relayed_verbatim() {
    let (backend, _) = common::start_echo_backend().await;
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;

    let res = common::http_client()
        .get(format!("http://{}/api/forward", relay))
        .query(&[("url", format!("http://{}/text", backend))])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(res.text().await.unwrap(), "plain body");

    shutdown.trigger();
}

#[tokio::test]
async fn test_transport_failure_becomes_500_envelope() {
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;
    let client = common::http_client();

    for target in [
        format!("http://{}/gone", common::closed_addr()),
        "invalid-url-format".to_string(),
    ] {
        let res = client
            .get(format!("http://{}/api/forward", relay))
            .query(&[("url", target)])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status_code"], 500);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (relay, shutdown) = common::start_relay(common::relay_config()).await;

    let res = common::http_client()
        .get(format!("http://{}/", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        body["available_endpoints"],
        json!(["/", "/api/ip-info", "/api/forward"])
    );
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());

    shutdown.trigger();
}
