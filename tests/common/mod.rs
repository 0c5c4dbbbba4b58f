#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the application saw for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub host: Option<String>,
    pub accept: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl Recorder {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap().push(request);
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn record(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
    recorder.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        user_agent: header(request.headers(), "user-agent"),
        content_type: header(request.headers(), "content-type"),
        host: header(request.headers(), "host"),
        accept: header(request.headers(), "accept"),
    });
    next.run(request).await
}

async fn success() -> Json<Value> {
    Json(json!({"success": true}))
}

async fn failure() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({"slow": true}))
}

async fn path_variable(Path(key): Path<String>) -> Json<Value> {
    Json(json!({"key": key}))
}

async fn payload(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn headers(headers: HeaderMap) -> Json<Value> {
    Json(json!({"x-token": header(&headers, "x-token")}))
}

/// Text fields echo their value, file fields their file name and size
async fn multipart(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut fields = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let value = match file_name {
            Some(file_name) => json!({"file_name": file_name, "size": bytes.len()}),
            None => json!(String::from_utf8_lossy(&bytes)),
        };
        fields.insert(name, value);
    }
    Ok(Json(Value::Object(fields)))
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, Json(json!({"teapot": true})))
}

async fn text() -> &'static str {
    "Text response"
}

/// Application under test. It serves `schema` at `/schema.json`.
pub fn app(schema: Value, recorder: Recorder) -> Router {
    let document = schema.to_string();
    Router::new()
        .route("/api/success", get(success))
        .route("/api/failure", get(failure))
        .route("/api/slow", get(slow))
        .route("/api/path_variable/:key", get(path_variable))
        .route("/api/payload", post(payload))
        .route("/api/headers", get(headers))
        .route("/api/multipart", post(multipart))
        .route("/api/teapot", get(teapot))
        .route("/api/text", get(text))
        .route(
            "/schema.json",
            get(move || {
                let document = document.clone();
                async move { ([("content-type", "application/json")], document) }
            }),
        )
        .layer(middleware::from_fn_with_state(recorder, record))
}

fn operation(name: &str) -> (String, Value) {
    let ok = json!({"200": {"description": "OK"}});
    let (path, item) = match name {
        "path_variable" => (
            "/path_variable/{key}",
            json!({"get": {
                "parameters": [{"name": "key", "in": "path", "required": true, "type": "string", "minLength": 1}],
                "responses": ok
            }}),
        ),
        "payload" => (
            "/payload",
            json!({"post": {
                "parameters": [{
                    "name": "body",
                    "in": "body",
                    "required": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "age": {"type": "integer", "minimum": 0}
                        },
                        "required": ["name"]
                    }
                }],
                "responses": ok
            }}),
        ),
        "headers" => (
            "/headers",
            json!({"get": {
                "parameters": [{"name": "X-Token", "in": "header", "required": true, "type": "string"}],
                "responses": ok
            }}),
        ),
        "multipart" => (
            "/multipart",
            json!({"post": {
                "consumes": ["multipart/form-data"],
                "parameters": [
                    {"name": "key", "in": "formData", "required": true, "type": "string"},
                    {"name": "upload", "in": "formData", "required": true, "type": "file"}
                ],
                "responses": ok
            }}),
        ),
        other => {
            return (
                format!("/{}", other),
                json!({"get": {"responses": ok}}),
            )
        }
    };
    (path.to_string(), item)
}

/// Swagger 2.0 document exposing the named operations under `/api`
pub fn make_schema(endpoints: &[&str]) -> Value {
    let paths: Map<String, Value> = endpoints.iter().map(|name| operation(name)).collect();
    json!({
        "swagger": "2.0",
        "info": {"title": "Test API", "version": "0.1"},
        "host": "127.0.0.1:8888",
        "basePath": "/api",
        "schemes": ["http"],
        "paths": paths
    })
}

/// The test application bound to an ephemeral local port
pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    pub recorder: Recorder,
}

impl TestServer {
    pub async fn start(schema: Value) -> Self {
        let recorder = Recorder::default();
        let app = app(schema, recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{}", addr),
            recorder,
        }
    }
}

/// Address nothing listens on
pub async fn unused_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
