//! Request dispatch over the network or straight into an in-process router.
//!
//! Both transports serialize a [`Case`] with the same [`build_request`], so the
//! application sees identical requests either way.

use crate::domain::{Case, Data, Response, Transport, USER_AGENT};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use axum::Router;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http_body_util::BodyExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tower::ServiceExt;
use tracing::debug;

/// Base URL used for in-process calls when the case has none
const IN_PROCESS_BASE_URL: &str = "http://localhost";

/// Turns a case into an HTTP request rooted at `base_url`.
///
/// Query arrays repeat the parameter name, header arrays are comma-joined,
/// the body is JSON (raw bytes for binary bodies) and form data is
/// `multipart/form-data` when any field holds bytes, urlencoded otherwise.
pub fn build_request(
    client: &Client,
    base_url: &str,
    case: &Case,
    user_agent: &str,
    timeout: Option<Duration>,
) -> TransportResult<reqwest::Request> {
    let method = Method::from_bytes(case.method.as_bytes())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    let parts = case.as_request_parts();
    let url = format!("{}{}", base_url.trim_end_matches('/'), parts.path);

    let mut builder = client.request(method, url.as_str());
    if !parts.query.is_empty() {
        builder = builder.query(&parts.query);
    }

    let mut headers = HeaderMap::new();
    for (name, value) in &parts.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name `{}`: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header `{}`: {}", name, e)))?;
        headers.append(name, value);
    }
    if !headers.contains_key(http::header::USER_AGENT) {
        let value = HeaderValue::from_str(user_agent)
            .map_err(|e| TransportError::InvalidRequest(format!("user agent: {}", e)))?;
        headers.insert(http::header::USER_AGENT, value);
    }
    builder = builder.headers(headers);

    if let Some(body) = &case.body {
        builder = match body {
            Data::Bytes(bytes) => builder.body(bytes.clone()),
            other => builder.json(other),
        };
    }
    if let Some(form_data) = &case.form_data {
        builder = encode_form(builder, form_data)?;
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(TransportError::from)
}

fn form_fields(form_data: &Data) -> TransportResult<Vec<(&str, &Data)>> {
    let map = form_data.as_object().ok_or_else(|| {
        TransportError::InvalidRequest("form data must be an object".to_string())
    })?;
    let mut fields = Vec::new();
    for (name, value) in map {
        match value {
            Data::Array(items) => fields.extend(items.iter().map(|item| (name.as_str(), item))),
            other => fields.push((name.as_str(), other)),
        }
    }
    Ok(fields)
}

fn encode_form(builder: RequestBuilder, form_data: &Data) -> TransportResult<RequestBuilder> {
    let fields = form_fields(form_data)?;
    if !form_data.contains_bytes() {
        let pairs: Vec<(&str, String)> = fields
            .into_iter()
            .map(|(name, value)| (name, value.to_param_string()))
            .collect();
        return Ok(builder.form(&pairs));
    }

    let mut form = Form::new();
    for (name, value) in fields {
        form = match value {
            Data::Bytes(bytes) => form.part(
                name.to_string(),
                Part::bytes(bytes.clone()).file_name(name.to_string()),
            ),
            other => form.text(name.to_string(), other.to_param_string()),
        };
    }
    Ok(builder.multipart(form))
}

/// Sends cases to a running service with `reqwest`
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    client: Client,
    base_url: Option<String>,
    user_agent: String,
    timeout: Option<Duration>,
}

impl Default for NetworkTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTransport {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build().unwrap_or_default(),
            base_url: None,
            user_agent: USER_AGENT.to_string(),
            timeout: None,
        }
    }

    /// Fallback base URL for cases whose endpoint has none
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn base_url_for<'a>(&'a self, case: &'a Case) -> TransportResult<&'a str> {
        case.base_url()
            .or(self.base_url.as_deref())
            .ok_or_else(|| TransportError::InvalidRequest("no base URL for request".to_string()))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn send(&self, case: &Case) -> TransportResult<Response> {
        let base_url = self.base_url_for(case)?;
        let request = build_request(&self.client, base_url, case, &self.user_agent, self.timeout)?;
        debug!(method = %request.method(), url = %request.url(), "Sending request");

        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "network"
    }
}

/// Drives an `axum::Router` directly, without opening a socket
#[derive(Clone)]
pub struct InProcessTransport {
    router: Router,
    client: Client,
    user_agent: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for InProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessTransport")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InProcessTransport {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            client: Client::builder().build().unwrap_or_default(),
            user_agent: USER_AGENT.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    async fn dispatch(&self, request: reqwest::Request) -> TransportResult<Response> {
        let request = http::Request::<reqwest::Body>::try_from(request)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let (mut parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?
            .to_bytes();
        // Headers a network client adds on the wire, so both transports look alike
        if !parts.headers.contains_key(http::header::HOST) {
            if let Some(authority) = parts.uri.authority() {
                let host = HeaderValue::from_str(authority.as_str())
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                parts.headers.insert(http::header::HOST, host);
            }
        }
        if !parts.headers.contains_key(http::header::ACCEPT) {
            parts
                .headers
                .insert(http::header::ACCEPT, HeaderValue::from_static("*/*"));
        }
        if let Some(path_and_query) = parts.uri.path_and_query().cloned() {
            parts.uri = http::Uri::from(path_and_query);
        }
        let request = http::Request::from_parts(parts, axum::body::Body::from(body));

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(Response {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, case: &Case) -> TransportResult<Response> {
        let base_url = case.base_url().unwrap_or(IN_PROCESS_BASE_URL);
        let request = build_request(&self.client, base_url, case, &self.user_agent, None)?;
        debug!(method = %request.method(), path = %request.url().path(), "Calling application in-process");

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.dispatch(request))
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => self.dispatch(request).await,
        }
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}
