use crate::domain::{Case, Response, Transport};
use crate::error::TransportResult;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends cases through whichever transport the schema was loaded with
#[derive(Clone)]
pub struct CaseExecutor {
    transport: Arc<dyn Transport>,
}

impl CaseExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// One attempt, never retried
    pub async fn execute(&self, case: &Case) -> TransportResult<Response> {
        match self.transport.send(case).await {
            Ok(response) => {
                debug!(
                    transport = self.transport.name(),
                    method = %case.method,
                    path = %case.path,
                    status = response.status,
                    "Case executed"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(
                    transport = self.transport.name(),
                    method = %case.method,
                    path = %case.path,
                    error = %e,
                    "Case failed"
                );
                Err(e)
            }
        }
    }
}

impl Case {
    pub async fn call(&self, transport: &dyn Transport) -> TransportResult<Response> {
        transport.send(self).await
    }
}
