//! Integration tests for the single-request executor
//!
//! **Coverage:**
//! - Retry of transient failures, no retry of permanent ones
//! - Forced re-authentication after a rejected token (uncounted)
//! - Per-endpoint circuit breaking and recovery
//! - Body decoding by media type
//! - Auth header styles, query and body forwarding

#[path = "support.rs"]
mod support;

use std::time::Duration;

use cwpp_common::auth::AuthError;
use cwpp_common::error::ErrorKind;
use cwpp_common::resilience::CircuitState;
use cwpp_domain::{AuthHeaderStyle, ResponseBody};
use cwpp_infra::{ApiError, ApiRequest, ApiResponse};
use serde_json::json;
use support::{client, client_with, fast_config};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOSTS: &str = "/api/v1/hosts";

#[tokio::test]
async fn transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOSTS))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOSTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"hostname": "web-1"}])))
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let response = client.get(HOSTS).await.unwrap();

    assert_eq!(response.into_records(), vec![json!({"hostname": "web-1"})]);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(client.circuit_state(HOSTS), CircuitState::Closed);
}

#[tokio::test]
async fn exhausted_retries_report_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let error = client.get(HOSTS).await.unwrap_err();

    match error {
        ApiError::Request { kind, status, attempts, ref endpoint, .. } => {
            assert_eq!(kind, ErrorKind::ServerError);
            assert_eq!(status, Some(502));
            assert_eq!(attempts, 3);
            assert_eq!(endpoint, HOSTS);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such host"))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let error = client.get(HOSTS).await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::NotFound));
    assert_eq!(error.status(), Some(404));
    assert!(error.to_string().contains("no such host"));
}

#[tokio::test]
async fn listed_status_codes_are_retried_regardless_of_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(409))
        .expect(3)
        .mount(&server)
        .await;
    let mut config = fast_config(&server.uri());
    config.retry.retry_status_codes.push(409);
    let (client, _) = client_with(config);

    let error = client.get(HOSTS).await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::ClientError));
}

#[tokio::test]
async fn rejected_token_is_refreshed_without_consuming_a_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let mut config = fast_config(&server.uri());
    config.retry.max_retries = 0;
    let (client, auth) = client_with(config);

    let response = client.get(HOSTS).await.unwrap();

    assert_eq!(response, ApiResponse::Body(ResponseBody::Json(json!({"ok": true}))));
    assert_eq!(auth.calls(), 2);
    assert_eq!(client.token_manager().login_count(), 2);
}

#[tokio::test]
async fn second_rejection_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    let (client, auth) = client(&server.uri());

    let error = client.get(HOSTS).await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::AuthenticationError));
    assert_eq!(error.status(), Some(401));
    assert_eq!(auth.calls(), 2);
}

#[tokio::test]
async fn failed_refresh_is_a_reauthentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let (client, auth) = client(&server.uri());
    client.token_manager().ensure_valid().await.unwrap();
    auth.fail_next(AuthError::Rejected { status: 401, message: "bad password".into() });

    let error = client.get(HOSTS).await.unwrap_err();

    assert!(matches!(error, ApiError::Reauthentication { .. }), "got {error:?}");
    assert_eq!(error.endpoint(), Some(HOSTS));
}

#[tokio::test]
async fn login_failure_stops_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (client, auth) = client(&server.uri());
    auth.fail_next(AuthError::Transport("connection refused".into()));

    let error = client.get(HOSTS).await.unwrap_err();

    assert!(matches!(error, ApiError::Authentication { .. }), "got {error:?}");
}

#[tokio::test]
async fn breaker_opens_per_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOSTS))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let mut config = fast_config(&server.uri());
    config.retry.max_retries = 0;
    let (client, _) = client_with(config);

    for _ in 0..3 {
        let error = client.get(HOSTS).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::ServerError));
    }
    assert_eq!(client.circuit_state(HOSTS), CircuitState::Open);

    let rejected = client.get(HOSTS).await.unwrap_err();
    assert!(rejected.is_circuit_open());
    assert!(rejected.url().is_some_and(|url| url.ends_with(HOSTS)));

    assert!(client.get("/api/v1/images").await.is_ok());
    assert_eq!(client.circuit_state("/api/v1/images"), CircuitState::Closed);
}

#[tokio::test]
async fn breaker_recovers_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let mut config = fast_config(&server.uri());
    config.retry.max_retries = 0;
    config.circuit_breaker.failure_threshold = 1;
    config.circuit_breaker.timeout_secs = 1;
    let (client, _) = client_with(config);

    assert!(client.get(HOSTS).await.is_err());
    assert!(client.get(HOSTS).await.unwrap_err().is_circuit_open());

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    assert!(client.get(HOSTS).await.is_ok());
    assert_eq!(client.circuit_state(HOSTS), CircuitState::Closed);
}

#[tokio::test]
async fn decodes_bodies_by_media_type() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/logs/defender/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x1f, 0x8b, 0x08], "application/x-gzip"))
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/images/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("id,repo\n1,nginx\n", "text/csv; charset=utf-8"))
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/policies/runtime"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let binary = client.get("api/v1/logs/defender/download").await.unwrap();
    assert_eq!(binary, ApiResponse::Body(ResponseBody::Binary(vec![0x1f, 0x8b, 0x08])));

    let text = client.get("api/v1/images/download").await.unwrap();
    assert_eq!(text, ApiResponse::Body(ResponseBody::Text("id,repo\n1,nginx\n".into())));

    let empty = client.execute(ApiRequest::put("api/v1/policies/runtime")).await.unwrap();
    assert_eq!(empty, ApiResponse::Body(ResponseBody::Empty));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"hosts\": [", "application/json"))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let error = client.get(HOSTS).await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::ParseError));
    assert_eq!(error.status(), Some(200));
}

#[tokio::test]
async fn custom_auth_header_carries_raw_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-redlock-auth", "token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let mut config = fast_config(&server.uri());
    config.auth_header = AuthHeaderStyle::Custom { name: "x-redlock-auth".into() };
    let (client, _) = client_with(config);

    assert!(client.get(HOSTS).await.is_ok());
}

#[tokio::test]
async fn forwards_query_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/collections"))
        .and(query_param("project", "Central Console"))
        .and(header("x-request-source", "inventory"))
        .and(body_json(json!({"name": "prod", "images": ["nginx:*"]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server.uri());

    let request = ApiRequest::post("api/v1/collections")
        .query("project", "Central Console")
        .header("x-request-source", "inventory")
        .json(json!({"name": "prod", "images": ["nginx:*"]}));

    assert_eq!(client.execute(request).await.unwrap(), ApiResponse::Body(ResponseBody::Empty));
    assert_eq!(client.executor().limiter().recent_requests("/api/v1/collections"), 1);
}

#[tokio::test]
async fn unreachable_console_is_a_connection_failure() {
    let mut config = fast_config("http://127.0.0.1:9");
    config.retry.max_retries = 1;
    config.connect_timeout_secs = 1;
    let (client, _) = client_with(config);

    let error = client.get(HOSTS).await.unwrap_err();

    assert!(
        matches!(error.kind(), Some(ErrorKind::ConnectionError | ErrorKind::ConnectionTimeout)),
        "got {error:?}"
    );
    match error {
        ApiError::Request { attempts, status, .. } => {
            assert_eq!(attempts, 2);
            assert_eq!(status, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
