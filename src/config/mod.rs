use config::{Config, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod validator;

use crate::adapters::case_strategy::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DEPTH};
use crate::adapters::format_registry::FormatRegistry;
use crate::cli::Cli;
use crate::domain::USER_AGENT;
use crate::error::ConfigurationError;

pub const DEFAULT_MAX_EXAMPLES: usize = 100;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub generation: GenerationSettings,
    pub runner: RunnerSettings,
    /// Custom string formats registered before generation starts
    #[serde(default)]
    pub formats: Vec<FormatConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GenerationSettings {
    /// Draws per location before a case counts as exhausted
    pub max_attempts: u32,
    /// Nesting depth past which optional members are no longer generated
    pub max_depth: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RunnerSettings {
    /// Generated cases per endpoint, on top of literal examples
    pub max_examples: usize,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Overrides the base URL taken from the schema document
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A format described in the config file.
///
/// Both fields stay untyped so that a wrong type is reported by the format
/// registry with the argument name rather than as a parse error.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FormatConfig {
    pub name: Value,
    pub generator: Value,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_examples: DEFAULT_MAX_EXAMPLES,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: USER_AGENT.to_string(),
            base_url: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generation: GenerationSettings::default(),
            runner: RunnerSettings::default(),
            formats: Vec::new(),
        }
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("generation.max_attempts", DEFAULT_MAX_ATTEMPTS as i64)?
        .set_default("generation.max_depth", DEFAULT_MAX_DEPTH as i64)?
        .set_default("runner.max_examples", DEFAULT_MAX_EXAMPLES as i64)?
        .set_default("runner.timeout_seconds", DEFAULT_TIMEOUT_SECONDS as i64)?
        .set_default("runner.user_agent", USER_AGENT)
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Settings from the config file named on the command line, with CLI overrides
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let s = with_defaults(Config::builder())?
            .add_source(File::from(cli.config.clone()).required(false))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Settings from `<root>/schemafuzz.{toml,yaml,json}` when present
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = std::path::Path::new(root).join("schemafuzz");
        let s = with_defaults(Config::builder())?
            .add_source(File::from(config_path).required(false))
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.runner.base_url = Some(base_url.clone());
        }
        if let Some(max_examples) = cli.max_examples {
            self.runner.max_examples = max_examples;
        }
        if let Some(timeout) = cli.timeout {
            self.runner.timeout_seconds = timeout;
        }
        if let Some(seed) = cli.seed {
            self.generation.seed = Some(seed);
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Snapshot of the process-wide registry plus the configured formats
    pub fn format_registry(&self) -> Result<FormatRegistry, ConfigurationError> {
        let mut registry = FormatRegistry::snapshot();
        for format in &self.formats {
            registry.register_value(&format.name, &format.generator)?;
        }
        Ok(registry)
    }
}
