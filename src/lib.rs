//! # Schemafuzz - property-based API testing
//!
//! Schemafuzz reads a Swagger 2.0 or OpenAPI 3.0 document, derives a random
//! generator of valid requests for every operation, and sends them to the
//! service under test, either over the network or straight into an in-process
//! `axum::Router`.
//!
//! ## Features
//!
//! - **Schema-driven generation**: `type`, bounds, `pattern`, `format`,
//!   `allOf`/`anyOf`/`oneOf`/`not`, `$ref` (including recursive definitions)
//! - **Location semantics**: required path parameters, header-safe values,
//!   query arrays, JSON bodies, urlencoded and multipart form data
//! - **Literal examples**: `example` values become a deterministic case
//! - **Custom formats**: a process-wide registry with snapshots
//! - **Two transports**: `reqwest` over the network or `tower` in-process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schemafuzz::adapters::case_strategy::generator_for;
//! use schemafuzz::adapters::loader::{from_path, LoaderOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let schema = from_path("swagger.yaml", LoaderOptions::new())?;
//!     let executor = schema.executor();
//!     for endpoint in schema.endpoints() {
//!         for case in generator_for(endpoint.clone())?.take(10) {
//!             let response = executor.execute(&case).await?;
//!             assert!(!response.is_server_error());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: endpoints, cases, request data, parsed schema nodes
//! - **Adapters**: strategies, format registry, loaders, transports
//! - **Config**: settings file and CLI

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod runner;

pub use adapters::case_strategy::{generator_for, CaseGenerator, StrategyBuilder};
pub use adapters::catalogue::{ApiSchema, SpecVersion};
pub use adapters::examples::examples_for;
pub use adapters::executor::CaseExecutor;
pub use adapters::format_registry::{register_string_format, FormatGenerator, FormatRegistry};
pub use adapters::loader::{from_dict, from_file, from_path, from_router, from_uri, Filter, LoaderOptions};
pub use adapters::transport::{InProcessTransport, NetworkTransport};
pub use domain::{Case, Data, Endpoint, Location, Response, Transport};
pub use error::{ConfigurationError, GenerationError, LoaderError, TransportError};
