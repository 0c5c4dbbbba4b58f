use crate::adapters::loader::{Filter, LoaderOptions};
use clap::Parser;
use std::path::PathBuf;

/// Schemafuzz - property-based testing for Swagger and OpenAPI services
#[derive(Parser, Debug, Clone)]
#[command(name = "schemafuzz", version, about, long_about = None)]
pub struct Cli {
    /// Schema document: a file path or an http(s) URL
    pub schema: String,

    /// Path to the configuration file
    #[arg(short, long, env = "SCHEMAFUZZ_CONFIG", default_value = "schemafuzz.toml")]
    pub config: PathBuf,

    /// Base URL of the service under test
    #[arg(long, env = "SCHEMAFUZZ_BASE_URL")]
    pub base_url: Option<String>,

    /// Generated cases per endpoint
    #[arg(short = 'n', long, env = "SCHEMAFUZZ_MAX_EXAMPLES")]
    pub max_examples: Option<usize>,

    /// Only test these HTTP methods
    #[arg(short, long)]
    pub method: Vec<String>,

    /// Only test endpoints whose path matches one of these patterns
    #[arg(short, long)]
    pub endpoint: Vec<String>,

    /// Only test operations carrying one of these tags
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Seed for reproducible generation
    #[arg(long, env = "SCHEMAFUZZ_SEED")]
    pub seed: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, env = "SCHEMAFUZZ_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn is_remote_schema(&self) -> bool {
        self.schema.starts_with("http://") || self.schema.starts_with("https://")
    }

    /// Loader options from the filter flags and the effective base URL
    pub fn loader_options(&self, base_url: Option<String>) -> LoaderOptions {
        let filter = |values: &[String]| (!values.is_empty()).then(|| Filter::from(values.to_vec()));
        LoaderOptions {
            location: None,
            base_url,
            method: filter(&self.method),
            endpoint: filter(&self.endpoint),
            tag: filter(&self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["schemafuzz", "api.yaml"]);
        assert_eq!(cli.schema, "api.yaml");
        assert_eq!(cli.config, PathBuf::from("schemafuzz.toml"));
        assert!(cli.base_url.is_none());
        assert!(cli.max_examples.is_none());
        assert!(cli.method.is_empty());
        assert!(!cli.is_remote_schema());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "schemafuzz",
            "https://example.com/swagger.json",
            "--config",
            "custom.toml",
            "--base-url",
            "http://127.0.0.1:8080",
            "-n",
            "25",
            "-m",
            "GET",
            "-m",
            "post",
            "-e",
            "^/api/users",
            "-t",
            "users",
            "--seed",
            "42",
            "--timeout",
            "3",
        ]);
        assert!(cli.is_remote_schema());
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(cli.max_examples, Some(25));
        assert_eq!(cli.method, vec!["GET", "post"]);
        assert_eq!(cli.seed, Some(42));
        assert_eq!(cli.timeout, Some(3));

        let options = cli.loader_options(cli.base_url.clone());
        assert_eq!(options.method, Some(Filter::from(vec!["GET", "post"])));
        assert_eq!(options.endpoint, Some(Filter::from("^/api/users")));
        assert_eq!(options.tag, Some(Filter::from("users")));
    }

    #[test]
    fn test_empty_filters_are_unset() {
        let cli = Cli::parse_from(["schemafuzz", "api.yaml"]);
        let options = cli.loader_options(None);
        assert!(options.method.is_none());
        assert!(options.endpoint.is_none());
        assert!(options.tag.is_none());
    }
}
