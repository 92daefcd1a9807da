use std::future::Future;
use std::time::{Duration, Instant};

use mixload_http::{HttpClient, HttpRequest, HttpTransportErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineResponse {
    pub status: u16,
    pub latency: Duration,
}

/// A request that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct NetworkError {
    pub kind: HttpTransportErrorKind,
    pub message: String,
    pub latency: Duration,
}

/// Executes one request and reports status and latency.
///
/// Implementations enforce `HttpRequest::timeout`.
pub trait ExecutionEngine: Send + Sync + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<EngineResponse, NetworkError>> + Send;
}

/// The default engine: a shared pooled HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HttpEngine {
    client: HttpClient,
}

impl HttpEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl ExecutionEngine for HttpEngine {
    async fn execute(&self, request: HttpRequest) -> Result<EngineResponse, NetworkError> {
        let started = Instant::now();
        match self.client.request(request).await {
            Ok(res) => Ok(EngineResponse {
                status: res.status,
                latency: started.elapsed(),
            }),
            Err(err) => Err(NetworkError {
                kind: err.transport_error_kind(),
                message: err.to_string(),
                latency: started.elapsed(),
            }),
        }
    }
}
