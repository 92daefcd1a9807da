use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgress {
    /// 1-based stage index.
    pub stage: usize,
    pub stages: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadProgress {
    Ramp {
        total_duration: Duration,
        current_target: u64,
        stage: StageProgress,
    },
    Iterations {
        vus: u64,
        claimed: u64,
        total: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    pub progress: WorkloadProgress,
    pub iterations_total: u64,
    pub passed_total: u64,
    pub failed_total: u64,
    pub network_errors_total: u64,
    /// Iterations/sec over the last progress interval.
    pub iterations_per_sec_now: f64,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
