// HTTP client integration tests against a local mock server

use std::time::Duration;

use logwatch_core::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> RemoteLogClient {
    RemoteLogClient::new(server.uri(), API_KEY, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_services_sends_bearer_and_reads_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "srv-1", "name": "api", "type": "web_service", "status": "available"},
                {"id": "srv-2", "name": "worker", "type": "background_worker"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let services = client_for(&server).list_services().await.unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].id, "srv-1");
    assert!(services[0].status.is_available());
    assert_eq!(services[1].name, "worker");
    assert_eq!(services[1].status.to_string(), "unknown");
}

#[tokio::test]
async fn test_list_services_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"service": {"id": "srv-9", "name": "cron", "type": "cron_job", "status": "suspended"}, "cursor": "abc"}
        ])))
        .mount(&server)
        .await;

    let services = client_for(&server).list_services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, "srv-9");
    assert_eq!(services[0].service_type, "cron_job");
}

#[tokio::test]
async fn test_fetch_logs_skips_malformed_records_and_sorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv-1/logs"))
        .and(query_param("limit", "20"))
        .and(query_param("startTime", "2024-01-20T10:00:00.000Z"))
        .and(query_param("endTime", "2024-01-20T11:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"timestamp": "2024-01-20T10:05:00Z", "message": "GET /health 200"},
                {"timestamp": "2024-01-20T10:30:00Z", "message": "ERROR: db timeout", "source": "web"},
                {"message": "no timestamp here"},
                {"timestamp": "yesterday-ish", "message": "bad clock"},
                {"timestamp": "2024-01-20T10:10:00Z", "message": "warn: retrying"}
            ]
        })))
        .mount(&server)
        .await;

    let start = parse_timestamp_for_test("2024-01-20T10:00:00Z");
    let end = parse_timestamp_for_test("2024-01-20T11:00:00Z");
    let entries = client_for(&server)
        .fetch_logs("srv-1", LogWindow::new(start, end), 20)
        .await
        .unwrap();

    let messages: Vec<&str> = entries.iter().map(|e| e.message()).collect();
    assert_eq!(
        messages,
        vec!["ERROR: db timeout", "warn: retrying", "GET /health 200"]
    );
    assert_eq!(entries[0].level(), LogLevel::Error);
    assert_eq!(entries[0].source(), "web");
    assert_eq!(entries[1].level(), LogLevel::Warning);
    assert_eq!(entries[2].level(), LogLevel::Info);
    assert!(entries.iter().all(|e| e.service_id() == "srv-1"));
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv-1/logs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_logs("srv-1", LogWindow::default(), 10)
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server).list_services().await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_services().await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = RemoteLogClient::new(server.uri(), API_KEY, Duration::from_millis(200)).unwrap();
    let err = client.list_services().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
}

#[test]
fn test_missing_api_key_is_configuration_error() {
    let err = RemoteLogClient::new("https://api.example.com/v1", "", Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
    assert!(!err.is_transport());

    let config = Config::default();
    assert!(matches!(
        RemoteLogClient::from_config(&config.remote),
        Err(ClientError::Configuration(_))
    ));
}

fn parse_timestamp_for_test(value: &str) -> chrono::DateTime<chrono::Utc> {
    logwatch_core::client::parse_timestamp(value).unwrap()
}
