mod common;

use common::{app, make_schema, unused_address, Recorder, TestServer};
use schemafuzz::domain::USER_AGENT;
use schemafuzz::{Case, Data, Endpoint, InProcessTransport, NetworkTransport, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn payload_case() -> Case {
    Case::new("/api/payload", "POST")
        .with_query(json!({"id": [1, 2], "q": "a b"}))
        .with_body(json!({"name": "John", "age": 42}))
}

#[tokio::test]
async fn test_network_and_in_process_requests_match() {
    let server = TestServer::start(make_schema(&["payload"])).await;
    let network = NetworkTransport::new().with_base_url(server.base_url.clone());
    let in_process = InProcessTransport::new(app(make_schema(&["payload"]), server.recorder.clone()));

    let endpoint = Endpoint::new("/api/payload", "POST").with_base_url(server.base_url.clone());
    let mut case = payload_case();
    case.endpoint = Some(Arc::new(endpoint));
    let over_network = network.send(&case).await.unwrap();
    let over_router = in_process.send(&case).await.unwrap();

    assert_eq!(over_network.status, 200);
    assert_eq!(over_router.status, 200);
    assert_eq!(over_network.json::<Value>().unwrap(), json!({"name": "John", "age": 42}));
    assert_eq!(over_network.body, over_router.body);

    let requests = server.recorder.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(requests[0].path, "/api/payload");
    assert_eq!(requests[0].query.as_deref(), Some("id=1&id=2&q=a+b"));
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(requests[0].host, Some(server.addr.to_string()));
    assert_eq!(requests[0].accept.as_deref(), Some("*/*"));
}

#[tokio::test]
async fn test_in_process_sends_host_and_accept() {
    let recorder = Recorder::default();
    let transport = InProcessTransport::new(app(make_schema(&[]), recorder.clone()));

    transport.send(&Case::new("/api/success", "GET")).await.unwrap();
    let request = recorder.last();
    assert_eq!(request.host.as_deref(), Some("localhost"));
    assert_eq!(request.accept.as_deref(), Some("*/*"));

    // Headers set on the case are kept
    let case = Case::new("/api/success", "GET")
        .with_headers(json!({"Accept": "application/json", "Host": "api.test"}));
    transport.send(&case).await.unwrap();
    let request = recorder.last();
    assert_eq!(request.host.as_deref(), Some("api.test"));
    assert_eq!(request.accept.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_user_agent() {
    let recorder = Recorder::default();
    let transport = InProcessTransport::new(app(make_schema(&[]), recorder.clone()));

    transport.send(&Case::new("/api/success", "GET")).await.unwrap();
    assert_eq!(recorder.last().user_agent.as_deref(), Some(USER_AGENT));

    let custom = transport.clone().with_user_agent("custom-agent/1.0");
    custom.send(&Case::new("/api/success", "GET")).await.unwrap();
    assert_eq!(recorder.last().user_agent.as_deref(), Some("custom-agent/1.0"));

    // A case-level header wins over the transport default
    let case = Case::new("/api/success", "GET").with_headers(json!({"User-Agent": "from-case"}));
    transport.send(&case).await.unwrap();
    assert_eq!(recorder.last().user_agent.as_deref(), Some("from-case"));
}

#[tokio::test]
async fn test_path_parameters_are_encoded() {
    let server = TestServer::start(make_schema(&["path_variable"])).await;
    let transport = NetworkTransport::new().with_base_url(server.base_url.clone());

    let case = Case::new("/api/path_variable/{key}", "GET").with_path_parameter("key", "a b/c");
    let response = transport.send(&case).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json::<Value>().unwrap(), json!({"key": "a b/c"}));
    assert_eq!(server.recorder.last().path, "/api/path_variable/a%20b%2Fc");
}

#[tokio::test]
async fn test_non_success_statuses_are_responses() {
    let transport = InProcessTransport::new(app(make_schema(&[]), Recorder::default()));

    let failure = transport.send(&Case::new("/api/failure", "GET")).await.unwrap();
    assert_eq!(failure.status, 500);
    assert!(failure.is_server_error());

    let teapot = transport.send(&Case::new("/api/teapot", "GET")).await.unwrap();
    assert_eq!(teapot.status, 418);
    assert!(!teapot.is_server_error());

    let text = transport.send(&Case::new("/api/text", "GET")).await.unwrap();
    assert_eq!(text.text(), "Text response");
    assert!(text.json::<Value>().is_err());
}

#[tokio::test]
async fn test_multipart_form_data() {
    let server = TestServer::start(make_schema(&["multipart"])).await;
    let transport = NetworkTransport::new().with_base_url(server.base_url.clone());

    let mut form = BTreeMap::new();
    form.insert("key".to_string(), Data::from("value"));
    form.insert("upload".to_string(), Data::from(vec![1u8, 2, 3, 4]));
    let case = Case::new("/api/multipart", "POST").with_form_data(Data::Object(form));

    let response = transport.send(&case).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        response.json::<Value>().unwrap(),
        json!({"key": "value", "upload": {"file_name": "upload", "size": 4}})
    );
    let content_type = server.recorder.last().content_type.unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_urlencoded_form_data() {
    let recorder = Recorder::default();
    let transport = InProcessTransport::new(app(make_schema(&[]), recorder.clone()));

    let case = Case::new("/api/text", "GET").with_form_data(json!({"a": 1, "b": "two"}));
    transport.send(&case).await.unwrap();
    assert_eq!(
        recorder.last().content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn test_connection_refused() {
    let addr = unused_address().await;
    let transport = NetworkTransport::new().with_base_url(format!("http://{}", addr));

    let err = transport.send(&Case::new("/api/success", "GET")).await.unwrap_err();
    assert!(matches!(err, TransportError::Connection(_)), "{:?}", err);
}

#[tokio::test]
async fn test_missing_base_url() {
    let err = NetworkTransport::new()
        .send(&Case::new("/api/success", "GET"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_network_timeout() {
    let server = TestServer::start(make_schema(&["slow"])).await;
    let transport = NetworkTransport::new()
        .with_base_url(server.base_url.clone())
        .with_timeout(Duration::from_millis(100));

    let err = transport.send(&Case::new("/api/slow", "GET")).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout), "{:?}", err);
}

#[tokio::test]
async fn test_in_process_timeout() {
    let transport = InProcessTransport::new(app(make_schema(&[]), Recorder::default()))
        .with_timeout(Duration::from_millis(100));

    let err = transport.send(&Case::new("/api/slow", "GET")).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout));

    let response = transport.send(&Case::new("/api/success", "GET")).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_invalid_header_is_rejected() {
    let transport = InProcessTransport::new(app(make_schema(&[]), Recorder::default()));
    let case = Case::new("/api/success", "GET").with_headers(json!({"X-Bad": "line\nbreak"}));

    let err = transport.send(&case).await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidRequest(_)));
}
