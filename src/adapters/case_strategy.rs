use crate::adapters::format_registry::FormatRegistry;
use crate::adapters::value_strategy::ValueStrategy;
use crate::config::GenerationSettings;
use crate::domain::{Case, Data, Endpoint, Location};
use crate::error::GenerationError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Builds case generators for endpoints.
///
/// Holds its own registry snapshot; formats registered after the builder is
/// created are not seen by it.
#[derive(Debug, Clone)]
pub struct StrategyBuilder {
    registry: FormatRegistry,
    max_attempts: u32,
    max_depth: usize,
    seed: Option<u64>,
}

impl Default for StrategyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyBuilder {
    /// Builder over a snapshot of the process-wide format registry
    pub fn new() -> Self {
        Self {
            registry: FormatRegistry::snapshot(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }

    pub fn from_settings(settings: &GenerationSettings, registry: FormatRegistry) -> Self {
        Self {
            registry,
            max_attempts: settings.max_attempts,
            max_depth: settings.max_depth,
            seed: settings.seed,
        }
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Compiles every location schema of `endpoint` into one case generator.
    ///
    /// Fails eagerly when the endpoint carries a body on a bodyless method or a
    /// location schema cannot be compiled.
    pub fn build(&self, endpoint: impl Into<Arc<Endpoint>>) -> Result<CaseGenerator, GenerationError> {
        let endpoint = endpoint.into();
        if endpoint.body.is_some() && !endpoint.allows_body() {
            return Err(GenerationError::InvalidSchema {
                location: Some(Location::Body),
                message: format!("Body parameters are defined for {} request.", endpoint.method),
            });
        }

        let root = endpoint.schema_root.as_deref();
        let mut strategies = Vec::new();
        for location in Location::ALL {
            let Some(schema) = endpoint.schema(location) else {
                continue;
            };
            if is_empty_schema(schema) {
                continue;
            }
            let strategy = if location == Location::Path {
                let schema = required_path_schema(schema);
                ValueStrategy::from_schema(location, &schema, root, &self.registry, self.max_depth)?
            } else {
                ValueStrategy::from_schema(location, schema, root, &self.registry, self.max_depth)?
            };
            strategies.push(strategy);
        }
        debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            locations = strategies.len(),
            "Built case generator"
        );

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(CaseGenerator {
            endpoint,
            strategies,
            max_attempts: self.max_attempts,
            rng,
            error: None,
        })
    }
}

/// Case generator for `endpoint` using the process-wide format registry
pub fn generator_for(endpoint: impl Into<Arc<Endpoint>>) -> Result<CaseGenerator, GenerationError> {
    StrategyBuilder::new().build(endpoint)
}

impl Endpoint {
    pub fn as_strategy(&self) -> Result<CaseGenerator, GenerationError> {
        generator_for(self.clone())
    }
}

/// Infinite source of cases for one endpoint.
///
/// As an iterator it ends at the first exhausted draw; the cause is kept in
/// [`CaseGenerator::last_error`] and returned again by every later
/// [`CaseGenerator::try_next`].
pub struct CaseGenerator {
    endpoint: Arc<Endpoint>,
    strategies: Vec<ValueStrategy>,
    max_attempts: u32,
    rng: StdRng,
    error: Option<GenerationError>,
}

impl std::fmt::Debug for CaseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseGenerator")
            .field("method", &self.endpoint.method)
            .field("path", &self.endpoint.path)
            .field("strategies", &self.strategies)
            .field("max_attempts", &self.max_attempts)
            .field("error", &self.error)
            .finish()
    }
}

impl CaseGenerator {
    /// Reseeds the generator so the following cases are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub fn last_error(&self) -> Option<&GenerationError> {
        self.error.as_ref()
    }

    pub fn try_next(&mut self) -> Result<Case, GenerationError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut case = Case::for_endpoint(self.endpoint.clone());
        for strategy in &self.strategies {
            let location = strategy.location();
            let value = (0..self.max_attempts)
                .filter_map(|_| strategy.draw(&mut self.rng))
                .find(|value| location != Location::Path || is_routable(value));
            match value {
                Some(value) => case.set(location, value),
                None => {
                    let error = GenerationError::Exhausted {
                        location,
                        attempts: self.max_attempts,
                    };
                    debug!(error = %error, path = %self.endpoint.path, "Case generation exhausted");
                    self.error = Some(error.clone());
                    return Err(error);
                }
            }
        }
        Ok(case)
    }

    /// A single case, for exploration and tests
    pub fn example(&mut self) -> Result<Case, GenerationError> {
        self.try_next()
    }
}

impl Iterator for CaseGenerator {
    type Item = Case;

    fn next(&mut self) -> Option<Case> {
        self.try_next().ok()
    }
}

fn is_empty_schema(schema: &Value) -> bool {
    matches!(schema, Value::Object(map) if map.is_empty())
}

/// Empty segments change the route, and `.` and `..` would be collapsed by
/// URL normalization
fn is_routable(path_parameters: &Data) -> bool {
    match path_parameters {
        Data::Object(map) => map.values().all(|value| {
            let rendered = value.to_param_string();
            !rendered.is_empty() && rendered != "." && rendered != ".."
        }),
        _ => true,
    }
}

/// Every path parameter is required, and string ones are non-empty
fn required_path_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    if let Some(object) = schema.as_object_mut() {
        let mut names = Vec::new();
        if let Some(Value::Object(properties)) = object.get_mut("properties") {
            for (name, property) in properties.iter_mut() {
                names.push(Value::String(name.clone()));
                let Some(property) = property.as_object_mut() else {
                    continue;
                };
                if property.get("type").and_then(Value::as_str) == Some("string") {
                    let min = property
                        .get("minLength")
                        .and_then(Value::as_u64)
                        .unwrap_or(0)
                        .max(1);
                    property.insert("minLength".to_string(), min.into());
                }
            }
        }
        if !names.is_empty() {
            object.insert("required".to_string(), Value::Array(names));
        }
    }
    schema
}
