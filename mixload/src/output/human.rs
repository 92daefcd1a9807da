use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

mod format;
mod progress;
mod summary;

use format::{format_duration, format_rate};
use mixload_core::runner::{ProgressFn, ProgressUpdate, WorkloadProgress};
use mixload_core::{CombinedWorkloadDefinition, RunSummary, Workload};
use progress::{HumanProgress, Position};
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, definition: &CombinedWorkloadDefinition, results_path: &Path) {
        println!("target: {}", definition.base_url());

        let weights = definition
            .weights()
            .entries()
            .iter()
            .map(|e| format!("{}={}", e.profile, e.weight))
            .collect::<Vec<_>>()
            .join(" ");
        println!("weights: {weights}");

        match definition.workload() {
            Workload::Ramp(schedule) => {
                let stages = schedule
                    .stages()
                    .iter()
                    .map(|s| format!("{}->{}", format_duration(s.duration), s.target))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "workload: ramping-vus policy={} stages=[{stages}]",
                    schedule.policy()
                );
            }
            Workload::Iterations { vus, iterations } => {
                println!("workload: shared-iterations vus={vus} iterations={iterations}");
            }
        }

        println!("results: {}", results_path.display());
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        let prev_failed = Arc::new(AtomicU64::new(0));

        Some(Arc::new(move |u: ProgressUpdate| {
            let failed_delta = u
                .failed_total
                .saturating_sub(prev_failed.swap(u.failed_total, Ordering::Relaxed));

            let rates = format!(
                " iters/s={} failed={failed_delta}/{} net_errors={}",
                format_rate(u.iterations_per_sec_now),
                u.failed_total,
                u.network_errors_total
            );

            let (position, message) = match &u.progress {
                WorkloadProgress::Ramp {
                    total_duration,
                    current_target,
                    stage,
                } => (
                    Position::Elapsed {
                        elapsed: u.elapsed,
                        total: *total_duration,
                    },
                    format!(
                        "stage={}/{} vus={current_target} elapsed={} stage_remaining={}{rates}",
                        stage.stage,
                        stage.stages,
                        format_duration(u.elapsed),
                        format_duration(stage.stage_remaining)
                    ),
                ),
                WorkloadProgress::Iterations {
                    vus,
                    claimed,
                    total,
                } => (
                    if *total > 0 {
                        Position::Count {
                            done: u.iterations_total,
                            total: *total,
                        }
                    } else {
                        Position::Unknown
                    },
                    format!(
                        "vus={vus} started={claimed}/{total} elapsed={}{rates}",
                        format_duration(u.elapsed)
                    ),
                ),
            };

            progress.update(position, message);
        }))
    }

    fn print_summary(&self, summary: &RunSummary, results_path: &Path) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(summary, results_path));
        Ok(())
    }
}
