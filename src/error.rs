//! Error types for generation, format registration, transports and loading

use crate::domain::Location;
use thiserror::Error;

/// Errors raised while turning an endpoint into a case generator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The endpoint's schema contradicts itself for generation purposes
    #[error("{message}")]
    InvalidSchema {
        location: Option<Location>,
        message: String,
    },

    /// No valid value was drawn within the retry budget
    #[error("Unable to generate {location} parameters satisfying the schema after {attempts} attempts")]
    Exhausted { location: Location, attempts: u32 },
}

impl GenerationError {
    pub fn invalid_schema(location: Location, detail: impl std::fmt::Display) -> Self {
        GenerationError::InvalidSchema {
            location: Some(location),
            message: format!("Invalid schema for {} parameters: {}", location, detail),
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Self::InvalidSchema { location, .. } => *location,
            Self::Exhausted { location, .. } => Some(*location),
        }
    }
}

/// Misuse of the format registry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    /// An argument had the wrong type
    #[error("{argument} must be of type {expected}, not {found}")]
    InvalidArgument {
        argument: &'static str,
        expected: &'static str,
        found: String,
    },

    /// Format names must not be empty
    #[error("Format name must not be empty")]
    EmptyName,

    /// A pattern-backed format could not be compiled
    #[error("Invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors raised while delivering a case to the system under test
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset or otherwise failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The call did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The peer answered with something that is not valid HTTP
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The case could not be turned into an HTTP request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Protocol(err.to_string())
        }
    }
}

/// Errors raised while loading a schema document into an endpoint catalogue
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to fetch schema from {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Schema request to {path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("Unsupported schema type")]
    UnsupportedSchema,

    #[error("Invalid endpoint filter `{pattern}`: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for generation
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for transports
pub type TransportResult<T> = Result<T, TransportError>;
