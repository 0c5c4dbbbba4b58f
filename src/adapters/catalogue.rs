//! Endpoint catalogue built from Swagger 2.0 and OpenAPI 3.0 documents

use crate::adapters::executor::CaseExecutor;
use crate::adapters::loader::LoaderOptions;
use crate::adapters::transport::NetworkTransport;
use crate::domain::{Endpoint, Location, Transport};
use crate::error::LoaderError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Parameter keywords that describe the parameter rather than its value
const PARAMETER_KEYWORDS: [&str; 6] = [
    "name",
    "in",
    "required",
    "description",
    "collectionFormat",
    "allowEmptyValue",
];

/// Longest `$ref` chain followed when resolving parameters and request bodies
const MAX_REF_CHAIN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger20,
    OpenApi30,
}

/// The `(path, method) -> Endpoint` mapping of one schema document
#[derive(Clone)]
pub struct ApiSchema {
    raw: Arc<Value>,
    version: SpecVersion,
    location: Option<String>,
    base_url: Option<String>,
    endpoints: BTreeMap<String, BTreeMap<String, Arc<Endpoint>>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSchema")
            .field("version", &self.version)
            .field("location", &self.location)
            .field("base_url", &self.base_url)
            .field("endpoints", &self.len())
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl ApiSchema {
    /// Dispatches on the document dialect and builds every endpoint that
    /// passes the filters in `options`
    pub fn from_document(raw: Value, options: &LoaderOptions) -> Result<Self, LoaderError> {
        let version = if raw.get("swagger").is_some() {
            SpecVersion::Swagger20
        } else if raw.get("openapi").is_some() {
            SpecVersion::OpenApi30
        } else {
            return Err(LoaderError::UnsupportedSchema);
        };
        let filters = options.filters()?;
        let raw = Arc::new(raw);
        let base_url = options.base_url.clone().or_else(|| match version {
            SpecVersion::Swagger20 => swagger_base_url(&raw),
            SpecVersion::OpenApi30 => server_url(&raw).and_then(|url| origin(&url)),
        });
        let prefix = match version {
            SpecVersion::Swagger20 => raw
                .get("basePath")
                .and_then(Value::as_str)
                .unwrap_or("/")
                .to_string(),
            SpecVersion::OpenApi30 => server_url(&raw)
                .map(|url| server_path(&url))
                .unwrap_or_else(|| "/".to_string()),
        };

        let paths = match raw.get("paths") {
            Some(Value::Object(paths)) => paths,
            Some(_) => return Err(LoaderError::InvalidDocument("`paths` must be an object".to_string())),
            None => return Err(LoaderError::InvalidDocument("missing `paths`".to_string())),
        };

        let mut endpoints: BTreeMap<String, BTreeMap<String, Arc<Endpoint>>> = BTreeMap::new();
        for (path, item) in paths {
            let item = resolve(&raw, item)?;
            let Some(item) = item.as_object() else {
                continue;
            };
            let full_path = join_path(&prefix, path);
            let shared = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for (method, operation) in item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let tags = operation_tags(operation);
                if !filters.accepts(method, &full_path, &tags) {
                    debug!(method = %method, path = %full_path, "Endpoint filtered out");
                    continue;
                }
                let parameters = merge_parameters(&raw, &shared, operation.get("parameters"))?;
                let mut endpoint = match version {
                    SpecVersion::Swagger20 => swagger_endpoint(&full_path, method, &parameters),
                    SpecVersion::OpenApi30 => openapi_endpoint(&raw, &full_path, method, operation, &parameters)?,
                };
                endpoint = endpoint
                    .with_definition(operation.clone())
                    .with_schema_root(raw.clone())
                    .with_tags(tags);
                if let Some(base_url) = &base_url {
                    endpoint = endpoint.with_base_url(base_url.clone());
                }
                endpoints
                    .entry(full_path.clone())
                    .or_default()
                    .insert(endpoint.method.clone(), Arc::new(endpoint));
            }
        }

        let mut transport = NetworkTransport::new();
        if let Some(base_url) = &base_url {
            transport = transport.with_base_url(base_url.clone());
        }
        let schema = Self {
            raw,
            version,
            location: options.location.clone(),
            base_url,
            endpoints,
            transport: Arc::new(transport),
        };
        debug!(version = ?schema.version, endpoints = schema.len(), "Loaded API schema");
        Ok(schema)
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Where the document was loaded from, when known
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn get(&self, path: &str, method: &str) -> Option<&Arc<Endpoint>> {
        self.endpoints
            .get(path)
            .and_then(|methods| methods.get(&method.to_uppercase()))
    }

    /// Endpoints ordered by path, then method
    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.endpoints.values().flat_map(|methods| methods.values())
    }

    pub fn len(&self) -> usize {
        self.endpoints.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn executor(&self) -> CaseExecutor {
        CaseExecutor::new(self.transport.clone())
    }
}

/// Follows `$ref` chains inside the document
fn resolve<'a>(root: &'a Value, value: &'a Value) -> Result<&'a Value, LoaderError> {
    let mut current = value;
    for _ in 0..MAX_REF_CHAIN {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(current);
        };
        current = reference
            .strip_prefix('#')
            .and_then(|pointer| root.pointer(pointer))
            .ok_or_else(|| LoaderError::InvalidDocument(format!("unresolvable reference `{}`", reference)))?;
    }
    Err(LoaderError::InvalidDocument("reference chain too long".to_string()))
}

fn operation_tags(operation: &Value) -> Vec<String> {
    operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Path-item parameters overridden by operation parameters on `(name, in)`
fn merge_parameters(
    root: &Value,
    shared: &[Value],
    own: Option<&Value>,
) -> Result<Vec<Map<String, Value>>, LoaderError> {
    let own = own.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    let mut merged: Vec<Map<String, Value>> = Vec::new();
    for parameter in shared.iter().chain(own) {
        let Some(parameter) = resolve(root, parameter)?.as_object() else {
            continue;
        };
        let key = |p: &Map<String, Value>| (p.get("name").cloned(), p.get("in").cloned());
        let this = key(parameter);
        match merged.iter_mut().find(|existing| key(&**existing) == this) {
            Some(existing) => *existing = parameter.clone(),
            None => merged.push(parameter.clone()),
        }
    }
    Ok(merged)
}

/// Object schema collecting the parameters of one location
#[derive(Default)]
struct ParameterSet {
    properties: Map<String, Value>,
    required: Vec<Value>,
}

impl ParameterSet {
    fn add(&mut self, name: &str, schema: Value, required: bool) {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(Value::String(name.to_string()));
        }
    }

    fn into_schema(self) -> Option<Value> {
        if self.properties.is_empty() {
            return None;
        }
        let mut schema = json!({
            "type": "object",
            "properties": self.properties,
            "additionalProperties": false,
        });
        // draft 4 forbids an empty `required`
        if !self.required.is_empty() {
            schema["required"] = Value::Array(self.required);
        }
        Some(schema)
    }
}

#[derive(Default)]
struct Locations {
    query: ParameterSet,
    path: ParameterSet,
    header: ParameterSet,
    form_data: ParameterSet,
}

impl Locations {
    fn get_mut(&mut self, location: Location) -> Option<&mut ParameterSet> {
        match location {
            Location::Query => Some(&mut self.query),
            Location::Path => Some(&mut self.path),
            Location::Header => Some(&mut self.header),
            Location::FormData => Some(&mut self.form_data),
            Location::Body => None,
        }
    }

    fn apply(self, mut endpoint: Endpoint) -> Endpoint {
        let sets = [
            (Location::Query, self.query),
            (Location::Path, self.path),
            (Location::Header, self.header),
            (Location::FormData, self.form_data),
        ];
        for (location, set) in sets {
            if let Some(schema) = set.into_schema() {
                endpoint = endpoint.with_schema(location, schema);
            }
        }
        endpoint
    }
}

fn parameter_location(value: Option<&Value>) -> Option<Location> {
    match value.and_then(Value::as_str)? {
        "query" => Some(Location::Query),
        "path" => Some(Location::Path),
        "header" => Some(Location::Header),
        "formData" => Some(Location::FormData),
        "body" => Some(Location::Body),
        _ => None,
    }
}

fn is_required(parameter: &Map<String, Value>) -> bool {
    parameter.get("required").and_then(Value::as_bool).unwrap_or(false)
}

fn swagger_endpoint(path: &str, method: &str, parameters: &[Map<String, Value>]) -> Endpoint {
    let mut endpoint = Endpoint::new(path, method);
    let mut locations = Locations::default();
    for parameter in parameters {
        let name = parameter.get("name").and_then(Value::as_str).unwrap_or_default();
        match parameter_location(parameter.get("in")) {
            Some(Location::Body) => {
                if let Some(schema) = parameter.get("schema") {
                    endpoint = endpoint.with_body(schema.clone());
                }
            }
            Some(location) => {
                if let Some(set) = locations.get_mut(location) {
                    set.add(name, swagger_property(parameter), is_required(parameter));
                }
            }
            None => debug!(parameter = %name, "Skipping parameter with unsupported location"),
        }
    }
    locations.apply(endpoint)
}

/// Swagger parameters carry their schema keywords inline
fn swagger_property(parameter: &Map<String, Value>) -> Value {
    let mut property: Map<String, Value> = parameter
        .iter()
        .filter(|(key, _)| !PARAMETER_KEYWORDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if property.get("type").and_then(Value::as_str) == Some("file") {
        property.insert("type".to_string(), json!("string"));
        property.insert("format".to_string(), json!("binary"));
    }
    Value::Object(property)
}

fn openapi_endpoint(
    root: &Value,
    path: &str,
    method: &str,
    operation: &Value,
    parameters: &[Map<String, Value>],
) -> Result<Endpoint, LoaderError> {
    let mut endpoint = Endpoint::new(path, method);
    let mut locations = Locations::default();
    for parameter in parameters {
        let name = parameter.get("name").and_then(Value::as_str).unwrap_or_default();
        let location = match parameter.get("in").and_then(Value::as_str) {
            Some("query") => Location::Query,
            Some("path") => Location::Path,
            Some("header") => Location::Header,
            other => {
                debug!(parameter = %name, location = ?other, "Skipping parameter");
                continue;
            }
        };
        let schema = parameter.get("schema").cloned().unwrap_or_else(|| json!({}));
        if let Some(set) = locations.get_mut(location) {
            set.add(name, schema, is_required(parameter));
        }
    }

    if let Some(request_body) = operation.get("requestBody") {
        let request_body = resolve(root, request_body)?;
        if let Some(Value::Object(content)) = request_body.get("content") {
            match pick_media_type(content) {
                Some((Location::FormData, schema)) => endpoint = endpoint.with_form_data(schema),
                Some((_, schema)) => endpoint = endpoint.with_body(schema),
                None => {}
            }
        }
    }
    Ok(locations.apply(endpoint))
}

/// JSON media types win over form encodings, which win over anything else
fn pick_media_type(content: &Map<String, Value>) -> Option<(Location, Value)> {
    let schema_of = |media: &Value| media.get("schema").cloned().unwrap_or_else(|| json!({}));
    let is_json = |name: &str| name == "application/json" || name.ends_with("+json");
    let is_form = |name: &str| name == "multipart/form-data" || name == "application/x-www-form-urlencoded";

    if let Some((_, media)) = content.iter().find(|(name, _)| is_json(name)) {
        return Some((Location::Body, schema_of(media)));
    }
    if let Some((_, media)) = content.iter().find(|(name, _)| is_form(name)) {
        return Some((Location::FormData, schema_of(media)));
    }
    content
        .values()
        .next()
        .map(|media| (Location::Body, schema_of(media)))
}

fn swagger_base_url(raw: &Value) -> Option<String> {
    let host = raw.get("host").and_then(Value::as_str)?;
    let scheme = raw
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| schemes.first())
        .and_then(Value::as_str)
        .unwrap_or("http");
    Some(format!("{}://{}", scheme, host))
}

fn server_url(raw: &Value) -> Option<String> {
    raw.get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `scheme://authority` of an absolute URL
pub(crate) fn origin(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

fn server_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}
