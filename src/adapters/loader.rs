//! Schema loading from text, files, URLs and in-process applications

use crate::adapters::catalogue::{origin, ApiSchema};
use crate::adapters::transport::InProcessTransport;
use crate::domain::{Case, Transport, USER_AGENT};
use crate::error::LoaderError;
use axum::Router;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// One or more accepted values for a loader filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(Vec<String>);

impl Filter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for Filter {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for Filter {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values)
    }
}

/// Where a document came from and which of its endpoints to keep
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    pub location: Option<String>,
    pub base_url: Option<String>,
    /// HTTP methods, compared case-insensitively
    pub method: Option<Filter>,
    /// Regular expressions searched for in the endpoint path
    pub endpoint: Option<Filter>,
    /// Operation tags; an endpoint matches if it has any of them
    pub tag: Option<Filter>,
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<Filter>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<Filter>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<Filter>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Compiles the endpoint patterns
    pub fn filters(&self) -> Result<EndpointFilters, LoaderError> {
        let endpoint = match &self.endpoint {
            Some(filter) => Some(
                filter
                    .values()
                    .iter()
                    .map(|pattern| {
                        Regex::new(pattern).map_err(|source| LoaderError::InvalidFilter {
                            pattern: pattern.clone(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        Ok(EndpointFilters {
            method: self
                .method
                .as_ref()
                .map(|f| f.values().iter().map(|m| m.to_uppercase()).collect()),
            endpoint,
            tag: self.tag.as_ref().map(|f| f.values().to_vec()),
        })
    }
}

/// Compiled form of the filters in [`LoaderOptions`]
#[derive(Debug, Clone, Default)]
pub struct EndpointFilters {
    method: Option<Vec<String>>,
    endpoint: Option<Vec<Regex>>,
    tag: Option<Vec<String>>,
}

impl EndpointFilters {
    pub fn accepts(&self, method: &str, path: &str, tags: &[String]) -> bool {
        let method = method.to_uppercase();
        let method_ok = self.method.as_ref().map_or(true, |ms| ms.contains(&method));
        let endpoint_ok = self
            .endpoint
            .as_ref()
            .map_or(true, |patterns| patterns.iter().any(|re| re.is_match(path)));
        let tag_ok = self
            .tag
            .as_ref()
            .map_or(true, |wanted| tags.iter().any(|t| wanted.contains(t)));
        method_ok && endpoint_ok && tag_ok
    }
}

/// Builds a catalogue from an already parsed document
pub fn from_dict(raw: Value, options: LoaderOptions) -> Result<ApiSchema, LoaderError> {
    ApiSchema::from_document(raw, &options)
}

/// Parses YAML or JSON text
pub fn from_file(text: &str, options: LoaderOptions) -> Result<ApiSchema, LoaderError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    let raw = serde_json::to_value(yaml).map_err(|e| LoaderError::InvalidDocument(e.to_string()))?;
    from_dict(raw, options)
}

pub fn from_path(path: impl AsRef<Path>, mut options: LoaderOptions) -> Result<ApiSchema, LoaderError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if options.location.is_none() {
        let location = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        options.location = Some(location.display().to_string());
    }
    debug!(path = %path.display(), "Loading schema from file");
    from_file(&text, options)
}

/// Downloads the document. Without an explicit base URL, requests go to the
/// scheme and authority the document was served from.
pub async fn from_uri(uri: &str, mut options: LoaderOptions) -> Result<ApiSchema, LoaderError> {
    let fetch_error = |source| LoaderError::Fetch {
        uri: uri.to_string(),
        source,
    };
    info!(uri = %uri, "Fetching schema");
    let response = Client::new()
        .get(uri)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(fetch_error)?
        .error_for_status()
        .map_err(fetch_error)?;
    let text = response.text().await.map_err(fetch_error)?;

    options.location.get_or_insert_with(|| uri.to_string());
    if options.base_url.is_none() {
        options.base_url = origin(uri);
    }
    from_file(&text, options)
}

/// Fetches the document from an application in-process and binds the
/// catalogue to the same in-process transport
pub async fn from_router(
    router: Router,
    schema_path: &str,
    mut options: LoaderOptions,
) -> Result<ApiSchema, LoaderError> {
    let transport = InProcessTransport::new(router);
    let response = transport.send(&Case::new(schema_path, "GET")).await?;
    if !(200..300).contains(&response.status) {
        return Err(LoaderError::Status {
            path: schema_path.to_string(),
            status: response.status,
        });
    }
    options.location.get_or_insert_with(|| schema_path.to_string());
    let schema = from_file(&response.text(), options)?;
    Ok(schema.with_transport(Arc::new(transport)))
}
