use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::gate::IterationGate;
use super::progress::{ProgressFn, ProgressUpdate, StageProgress, WorkloadProgress};
use super::stats::{RunStats, RunSummary};
use super::stop::StopSignal;
use super::vu::{VuContext, VuWork, run_vu};
use crate::compose::{CombinedWorkloadDefinition, Workload};
use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};
use crate::sink::ReportSink;

#[derive(Clone)]
pub struct RunOptions {
    pub progress: Option<ProgressFn>,
    pub progress_interval: Duration,
    /// Shared with the caller so it can abort the run (e.g. on Ctrl-C).
    pub stop: Arc<StopSignal>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            progress: None,
            progress_interval: Duration::from_secs(1),
            stop: Arc::new(StopSignal::new()),
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .field("stop", &self.stop)
            .finish()
    }
}

/// Runs `definition` to completion and returns its summary.
///
/// Time-based workloads end when the schedule does; iteration workloads when
/// the last iteration finishes. Either way in-flight requests complete and
/// every VU is joined before the summary is built. A VU failure (sink error or
/// abnormal task exit) stops the run and is returned after the others drain.
pub async fn run_workload<E: ExecutionEngine>(
    definition: Arc<CombinedWorkloadDefinition>,
    engine: Arc<E>,
    sink: Arc<dyn ReportSink>,
    options: RunOptions,
) -> Result<RunSummary> {
    let stats = Arc::new(RunStats::new(definition.registry()));
    let stop = options.stop.clone();

    let work = match definition.workload() {
        Workload::Ramp(schedule) => VuWork::Ramping {
            schedule: Arc::new(schedule.clone()),
        },
        Workload::Iterations { iterations, .. } => VuWork::Counted {
            gate: Arc::new(IterationGate::new(*iterations)),
        },
    };
    let max_vus = definition.workload().max_vus();

    tracing::info!(
        max_vus,
        seed = ?definition.seed(),
        base_url = definition.base_url(),
        duration = ?definition.workload().total_duration(),
        "starting run"
    );

    let started = Instant::now();

    let mut vus: JoinSet<Result<()>> = JoinSet::new();
    for vu_id in 1..=max_vus {
        let ctx = VuContext {
            vu_id,
            definition: definition.clone(),
            engine: engine.clone(),
            sink: sink.clone(),
            stats: stats.clone(),
            stop: stop.clone(),
            work: work.clone(),
            started,
        };
        vus.spawn(run_vu(ctx));
    }

    let deadline_handle = definition.workload().total_duration().map(|total| {
        let stop = stop.clone();
        tokio::spawn(async move {
            if stop.sleep(total.saturating_sub(started.elapsed())).await {
                tracing::info!("schedule finished, stopping");
                stop.stop();
            }
        })
    });

    let progress_handle = options.progress.as_ref().map(|progress| {
        spawn_progress(
            progress.clone(),
            options.progress_interval,
            definition.clone(),
            work.clone(),
            stats.clone(),
            started,
        )
    });

    // Joined in completion order; the first failure stops the rest.
    let mut first_error: Option<Error> = None;
    while let Some(joined) = vus.join_next().await {
        let err = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(join) => Error::EngineLaunch(format!("virtual user task failed: {join}")),
        };
        if first_error.is_none() {
            tracing::error!(error = %err, "virtual user failed, stopping run");
            stop.stop();
            first_error = Some(err);
        }
    }

    stop.stop();
    if let Some(h) = deadline_handle {
        let _ = h.await;
    }
    if let Some(h) = progress_handle {
        h.abort();
        let _ = h.await;
    }

    if let Err(err) = sink.flush() {
        tracing::warn!(error = %err, "failed to flush results");
        first_error.get_or_insert(Error::Io(err));
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let summary = stats.summarize(started.elapsed());
    tracing::info!(
        iterations = summary.iterations_total,
        passed = summary.passed_total,
        failed = summary.failed_total,
        network_errors = summary.network_errors_total,
        "run finished"
    );
    Ok(summary)
}

fn spawn_progress(
    progress: ProgressFn,
    every: Duration,
    definition: Arc<CombinedWorkloadDefinition>,
    work: VuWork,
    stats: Arc<RunStats>,
    started: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut tick: u64 = 0;
        let mut last_at = Instant::now();
        let mut last_iterations = stats.iterations_total();

        loop {
            interval.tick().await;

            tick = tick.saturating_add(1);
            let now = Instant::now();
            let dt = now.duration_since(last_at).as_secs_f64().max(1e-9);
            last_at = now;

            let iterations_total = stats.iterations_total();
            let delta = iterations_total.saturating_sub(last_iterations);
            last_iterations = iterations_total;

            let elapsed = started.elapsed();
            let progress_val = match &work {
                VuWork::Ramping { schedule } => {
                    let snap = schedule.stage_snapshot_at(elapsed);
                    WorkloadProgress::Ramp {
                        total_duration: schedule.total_duration(),
                        current_target: snap.current_target,
                        stage: StageProgress {
                            stage: snap.index + 1,
                            stages: snap.count,
                            stage_elapsed: snap.stage_elapsed,
                            stage_remaining: snap.stage_remaining,
                            start_target: snap.start_target,
                            end_target: snap.end_target,
                        },
                    }
                }
                VuWork::Counted { gate } => WorkloadProgress::Iterations {
                    vus: definition.workload().max_vus(),
                    claimed: gate.claimed(),
                    total: gate.total(),
                },
            };

            (progress)(ProgressUpdate {
                tick,
                elapsed,
                progress: progress_val,
                iterations_total,
                passed_total: stats.passed_total(),
                failed_total: stats.failed_total(),
                network_errors_total: stats.network_errors_total(),
                iterations_per_sec_now: delta as f64 / dt,
            });
        }
    })
}
