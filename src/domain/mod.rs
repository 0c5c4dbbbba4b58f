use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod data;
pub mod schema;

pub use data::Data;

/// Default `User-Agent` sent with every request unless the case sets its own
pub const USER_AGENT: &str = concat!("schemafuzz/", env!("CARGO_PKG_VERSION"));

/// Where a parameter lives in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Query,
    Path,
    Header,
    FormData,
    Body,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::Query,
        Location::Path,
        Location::Header,
        Location::FormData,
        Location::Body,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Query => "query",
            Location::Path => "path",
            Location::Header => "header",
            Location::FormData => "form_data",
            Location::Body => "body",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Methods that carry no conventional request body
const BODYLESS_METHODS: [&str; 5] = ["GET", "HEAD", "DELETE", "OPTIONS", "TRACE"];

/// One API operation as described by a schema document.
///
/// Each location holds an optional JSON-Schema fragment. Query, path, header and
/// form-data fragments are object schemas whose properties are the parameters;
/// the body fragment is the request body schema itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    pub base_url: Option<String>,
    pub query: Option<Value>,
    pub path_parameters: Option<Value>,
    pub headers: Option<Value>,
    pub form_data: Option<Value>,
    pub body: Option<Value>,
    /// Raw operation object, kept for diagnostics
    pub definition: Value,
    /// Whole source document, used to resolve `#/...` references
    pub schema_root: Option<Arc<Value>>,
    pub tags: Vec<String>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: impl AsRef<str>) -> Self {
        Self {
            path: path.into(),
            method: method.as_ref().to_uppercase(),
            base_url: None,
            query: None,
            path_parameters: None,
            headers: None,
            form_data: None,
            body: None,
            definition: Value::Object(Default::default()),
            schema_root: None,
            tags: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_definition(mut self, definition: Value) -> Self {
        self.definition = definition;
        self
    }

    pub fn with_schema_root(mut self, root: Arc<Value>) -> Self {
        self.schema_root = Some(root);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the schema fragment for a location
    pub fn with_schema(mut self, location: Location, schema: Value) -> Self {
        *self.schema_slot(location) = Some(schema);
        self
    }

    pub fn with_query(self, schema: Value) -> Self {
        self.with_schema(Location::Query, schema)
    }

    pub fn with_path_parameters(self, schema: Value) -> Self {
        self.with_schema(Location::Path, schema)
    }

    pub fn with_headers(self, schema: Value) -> Self {
        self.with_schema(Location::Header, schema)
    }

    pub fn with_form_data(self, schema: Value) -> Self {
        self.with_schema(Location::FormData, schema)
    }

    pub fn with_body(self, schema: Value) -> Self {
        self.with_schema(Location::Body, schema)
    }

    pub fn schema(&self, location: Location) -> Option<&Value> {
        match location {
            Location::Query => self.query.as_ref(),
            Location::Path => self.path_parameters.as_ref(),
            Location::Header => self.headers.as_ref(),
            Location::FormData => self.form_data.as_ref(),
            Location::Body => self.body.as_ref(),
        }
    }

    fn schema_slot(&mut self, location: Location) -> &mut Option<Value> {
        match location {
            Location::Query => &mut self.query,
            Location::Path => &mut self.path_parameters,
            Location::Header => &mut self.headers,
            Location::FormData => &mut self.form_data,
            Location::Body => &mut self.body,
        }
    }

    /// Whether the method conventionally carries a request body
    pub fn allows_body(&self) -> bool {
        !BODYLESS_METHODS.contains(&self.method.as_str())
    }
}

/// One concrete request, ready to send.
#[derive(Debug, Clone, Default)]
pub struct Case {
    /// Path template; `{name}` segments are filled from `path_parameters` at dispatch
    pub path: String,
    pub method: String,
    pub path_parameters: BTreeMap<String, String>,
    pub query: Option<Data>,
    pub headers: Option<Data>,
    pub form_data: Option<Data>,
    pub body: Option<Data>,
    /// Originating endpoint. Not part of the case's value.
    pub endpoint: Option<Arc<Endpoint>>,
}

impl PartialEq for Case {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.method == other.method
            && self.path_parameters == other.path_parameters
            && self.query == other.query
            && self.headers == other.headers
            && self.form_data == other.form_data
            && self.body == other.body
    }
}

impl Case {
    pub fn new(path: impl Into<String>, method: impl AsRef<str>) -> Self {
        Self {
            path: path.into(),
            method: method.as_ref().to_uppercase(),
            ..Default::default()
        }
    }

    /// Empty case bound to an endpoint
    pub fn for_endpoint(endpoint: Arc<Endpoint>) -> Self {
        Self {
            path: endpoint.path.clone(),
            method: endpoint.method.clone(),
            endpoint: Some(endpoint),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<Data>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_headers(mut self, headers: impl Into<Data>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn with_form_data(mut self, form_data: impl Into<Data>) -> Self {
        self.form_data = Some(form_data.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Data>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    /// Stores a generated value under its location
    pub fn set(&mut self, location: Location, value: Data) {
        match location {
            Location::Query => self.query = Some(value),
            Location::Header => self.headers = Some(value),
            Location::FormData => self.form_data = Some(value),
            Location::Body => self.body = Some(value),
            Location::Path => {
                if let Data::Object(map) = value {
                    self.path_parameters = map
                        .into_iter()
                        .map(|(k, v)| (k, v.to_param_string()))
                        .collect();
                }
            }
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.endpoint.as_ref().and_then(|e| e.base_url.as_deref())
    }

    /// Path with every `{name}` placeholder replaced by its percent-encoded value.
    /// Placeholders without a value are left untouched.
    pub fn formatted_path(&self) -> String {
        let mut path = self.path.clone();
        for (name, value) in &self.path_parameters {
            let placeholder = format!("{{{}}}", name);
            path = path.replace(&placeholder, &urlencoding::encode(value));
        }
        path
    }

    /// Query parameters as name/value pairs; array values repeat the name
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(Data::Object(map)) = &self.query {
            for (name, value) in map {
                match value {
                    Data::Array(items) => {
                        for item in items {
                            pairs.push((name.clone(), item.to_param_string()));
                        }
                    }
                    other => pairs.push((name.clone(), other.to_param_string())),
                }
            }
        }
        pairs
    }

    /// Headers as name/value pairs; array values are comma-joined
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(Data::Object(map)) = &self.headers {
            for (name, value) in map {
                let rendered = match value {
                    Data::Array(items) => items
                        .iter()
                        .map(Data::to_param_string)
                        .collect::<Vec<_>>()
                        .join(","),
                    other => other.to_param_string(),
                };
                pairs.push((name.clone(), rendered));
            }
        }
        pairs
    }

    /// Resolved URL path plus serialized query and header pairs
    pub fn as_request_parts(&self) -> RequestParts {
        RequestParts {
            path: self.formatted_path(),
            query: self.query_pairs(),
            headers: self.header_pairs(),
        }
    }
}

/// Serialized request pieces shared by both transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

/// Response from either transport
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Delivers a case to the system under test
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, case: &Case) -> Result<Response, TransportError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
