mod gate;
mod progress;
mod run;
mod stats;
mod stop;
mod vu;

pub use gate::IterationGate;
pub use progress::{ProgressFn, ProgressUpdate, StageProgress, WorkloadProgress};
pub use run::{RunOptions, run_workload};
pub use stats::{ProfileSummary, RunStats, RunSummary};
pub use stop::StopSignal;
