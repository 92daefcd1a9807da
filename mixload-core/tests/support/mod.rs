#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mixload_core::{
    EngineResponse, ExecutionEngine, HttpRequest, HttpTransportErrorKind, IterationResult,
    NetworkError, ReportSink, ScheduleConfig, StageConfig, WorkloadConfig,
};

type Respond = Box<dyn Fn(&HttpRequest) -> Option<u16> + Send + Sync>;

/// Engine answering from a closure; `None` simulates a network failure.
pub struct MockEngine {
    respond: Respond,
    delay: Duration,
    panic_on: Option<u64>,
    started: AtomicU64,
    completed: AtomicU64,
}

impl MockEngine {
    pub fn new(respond: impl Fn(&HttpRequest) -> Option<u16> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            panic_on: None,
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::new(move |_| Some(status))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panics inside the VU task on the `n`th request (1-based).
    pub fn panicking_on(mut self, n: u64) -> Self {
        self.panic_on = Some(n);
        self
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for MockEngine {
    async fn execute(&self, request: HttpRequest) -> Result<EngineResponse, NetworkError> {
        let n = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on == Some(n) {
            panic!("mock engine crashed on request {n}");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let outcome = (self.respond)(&request);
        self.completed.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Some(status) => Ok(EngineResponse {
                status,
                latency: self.delay,
            }),
            None => Err(NetworkError {
                kind: HttpTransportErrorKind::Connect,
                message: format!("connection refused: {}", request.url),
                latency: self.delay,
            }),
        }
    }
}

/// A sink whose writes always fail.
pub struct BrokenSink;

impl ReportSink for BrokenSink {
    fn emit(&self, _result: &IterationResult) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}

/// Fails writes from one VU only; every other VU's results are accepted.
pub struct FailingVuSink {
    pub vu: u64,
}

impl ReportSink for FailingVuSink {
    fn emit(&self, result: &IterationResult) -> io::Result<()> {
        if result.vu == self.vu {
            Err(io::Error::other("disk full"))
        } else {
            Ok(())
        }
    }
}

pub fn iterations_config(vus: i64, iterations: i64) -> WorkloadConfig {
    WorkloadConfig {
        schedule: ScheduleConfig::Iterations { vus, iterations },
        base_url: "http://mock.invalid/api".to_string(),
        think_time_secs: 0.0,
        request_timeout: Some(Duration::from_secs(1)),
        seed: Some(1),
        ..WorkloadConfig::default()
    }
}

pub fn ramp_config(stages: &[(Duration, u64)], think_time_secs: f64) -> WorkloadConfig {
    WorkloadConfig {
        schedule: ScheduleConfig::Ramp {
            stages: stages
                .iter()
                .map(|(d, target)| StageConfig::new(*d, *target))
                .collect(),
            policy: Default::default(),
        },
        base_url: "http://mock.invalid/api".to_string(),
        think_time_secs,
        request_timeout: Some(Duration::from_secs(1)),
        seed: Some(7),
        ..WorkloadConfig::default()
    }
}
