use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Serialize, Serializer};

use crate::check::Check;
use crate::engine::{EngineResponse, NetworkError};

/// The outcome of one completed request; one NDJSON line in the results stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationResult {
    pub profile: Arc<str>,
    pub check: &'static str,
    pub vu: u64,
    #[serde(serialize_with = "rfc3339_millis")]
    pub timestamp: SystemTime,
    pub latency_ms: f64,
    /// Absent when the request never produced a response.
    pub status: Option<u16>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationResult {
    pub(crate) fn from_outcome(
        profile: Arc<str>,
        check: &Check,
        vu: u64,
        timestamp: SystemTime,
        outcome: &Result<EngineResponse, NetworkError>,
        passed: bool,
    ) -> Self {
        let (latency, status, error) = match outcome {
            Ok(res) => (res.latency, Some(res.status), None),
            Err(err) => (err.latency, None, Some(err.to_string())),
        };

        Self {
            profile,
            check: check.name,
            vu,
            timestamp,
            latency_ms: duration_ms(latency),
            status,
            passed,
            error,
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.status.is_none()
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn rfc3339_millis<S: Serializer>(ts: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&humantime::format_rfc3339_millis(*ts))
}
