use clap::Parser;
use schemafuzz::adapters::case_strategy::StrategyBuilder;
use schemafuzz::adapters::loader::{from_path, from_uri};
use schemafuzz::adapters::transport::NetworkTransport;
use schemafuzz::cli::Cli;
use schemafuzz::config::Settings;
use schemafuzz::runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;
    let registry = settings.format_registry()?;

    let options = cli.loader_options(settings.runner.base_url.clone());
    let schema = if cli.is_remote_schema() {
        from_uri(&cli.schema, options).await?
    } else {
        from_path(&cli.schema, options)?
    };
    info!(
        schema = %cli.schema,
        endpoints = schema.len(),
        "Loaded schema"
    );

    let mut transport = NetworkTransport::new()
        .with_timeout(Duration::from_secs(settings.runner.timeout_seconds))
        .with_user_agent(settings.runner.user_agent.clone());
    if let Some(base_url) = schema.base_url() {
        transport = transport.with_base_url(base_url);
    }
    let schema = schema.with_transport(Arc::new(transport));

    let builder = StrategyBuilder::from_settings(&settings.generation, registry);
    let summary = runner::run(&schema, &builder, settings.runner.max_examples).await;

    if !summary.is_success() {
        error!(
            server_errors = summary.server_errors,
            transport_errors = summary.transport_errors,
            generation_errors = summary.generation_errors,
            "Run failed"
        );
        std::process::exit(1);
    }

    Ok(())
}
