#![forbid(unsafe_code)]

mod check;
mod compose;
mod config;
mod engine;
mod error;
mod profile;
pub mod profiles;
mod result;
pub mod runner;
mod schedule;
mod selector;
mod sink;
mod weights;

pub use check::{Check, CheckEvaluator};
pub use compose::{CombinedWorkloadDefinition, Workload, WorkloadComposer, compose_workload};
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_DURATION, DEFAULT_REQUEST_TIMEOUT, DEFAULT_THINK_TIME_SECS,
    DEFAULT_VUS, RampPolicy, ScheduleConfig, StageConfig, WeightConfig, WorkloadConfig,
};
pub use engine::{EngineResponse, ExecutionEngine, HttpEngine, NetworkError};
pub use error::{Error, Result};
pub use profile::{ProfileRegistry, ProfileRequest, RequestBuilder, TrafficProfile};
pub use profiles::{HealthOptions, builtin_registry};
pub use result::IterationResult;
pub use runner::{RunOptions, RunSummary, StopSignal, run_workload};
pub use schedule::{RampSchedule, RampStage, StageSnapshot};
pub use selector::WeightedSelector;
pub use sink::{MemorySink, NdjsonSink, ReportSink};
pub use weights::{WeightEntry, WeightTable};

pub use mixload_http::{HttpClient, HttpRequest, HttpTransportErrorKind};
