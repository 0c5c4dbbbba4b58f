//! Sequential test run over every endpoint of a catalogue

use crate::adapters::case_strategy::StrategyBuilder;
use crate::adapters::catalogue::ApiSchema;
use crate::adapters::examples::examples_for;
use crate::adapters::executor::CaseExecutor;
use crate::domain::Case;
use tracing::{info, warn};

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub endpoints: usize,
    pub cases: usize,
    pub server_errors: usize,
    pub transport_errors: usize,
    pub generation_errors: usize,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.server_errors + self.transport_errors + self.generation_errors
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Sends each endpoint's literal examples and then up to `max_examples`
/// generated cases, one at a time
pub async fn run(schema: &ApiSchema, builder: &StrategyBuilder, max_examples: usize) -> RunSummary {
    let executor = schema.executor();
    let mut summary = RunSummary::default();

    for endpoint in schema.endpoints() {
        summary.endpoints += 1;
        info!(method = %endpoint.method, path = %endpoint.path, "Testing endpoint");

        for case in examples_for(endpoint.clone()) {
            execute(&executor, &case, &mut summary).await;
        }

        let mut generator = match builder.build(endpoint.clone()) {
            Ok(generator) => generator,
            Err(e) => {
                warn!(method = %endpoint.method, path = %endpoint.path, error = %e, "Cannot generate cases");
                summary.generation_errors += 1;
                continue;
            }
        };
        for _ in 0..max_examples {
            match generator.try_next() {
                Ok(case) => execute(&executor, &case, &mut summary).await,
                Err(e) => {
                    warn!(method = %endpoint.method, path = %endpoint.path, error = %e, "Generation stopped");
                    summary.generation_errors += 1;
                    break;
                }
            }
        }
    }

    info!(
        endpoints = summary.endpoints,
        cases = summary.cases,
        failures = summary.failures(),
        "Run finished"
    );
    summary
}

async fn execute(executor: &CaseExecutor, case: &Case, summary: &mut RunSummary) {
    summary.cases += 1;
    match executor.execute(case).await {
        Ok(response) if response.is_server_error() => {
            warn!(
                method = %case.method,
                path = %case.formatted_path(),
                status = response.status,
                "Server error"
            );
            summary.server_errors += 1;
        }
        Ok(response) => {
            info!(method = %case.method, path = %case.formatted_path(), status = response.status);
        }
        Err(_) => summary.transport_errors += 1,
    }
}
