use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use rand::SeedableRng as _;
use rand::rngs::SmallRng;

use super::gate::IterationGate;
use super::stats::RunStats;
use super::stop::StopSignal;
use crate::check::CheckEvaluator;
use crate::compose::CombinedWorkloadDefinition;
use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::result::IterationResult;
use crate::schedule::RampSchedule;
use crate::sink::ReportSink;

const MIN_PARK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub(crate) enum VuWork {
    Ramping { schedule: Arc<RampSchedule> },
    Counted { gate: Arc<IterationGate> },
}

pub(crate) struct VuContext<E> {
    /// 1-based; VU `n` is active while `n <= concurrency_at(elapsed)`.
    pub vu_id: u64,
    pub definition: Arc<CombinedWorkloadDefinition>,
    pub engine: Arc<E>,
    pub sink: Arc<dyn ReportSink>,
    pub stats: Arc<RunStats>,
    pub stop: Arc<StopSignal>,
    pub work: VuWork,
    pub started: Instant,
}

/// Per-VU random source: reproducible from `(seed, vu_id)` when seeded.
pub(crate) fn vu_rng(seed: Option<u64>, vu_id: u64) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed ^ vu_id.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => SmallRng::from_entropy(),
    }
}

pub(crate) async fn run_vu<E: ExecutionEngine>(ctx: VuContext<E>) -> Result<()> {
    let mut rng = vu_rng(ctx.definition.seed(), ctx.vu_id);
    let mut active = false;

    match &ctx.work {
        VuWork::Counted { gate } => {
            while !ctx.stop.is_stopped() && gate.next() {
                run_iteration(&ctx, &mut rng).await?;
                if !think(&ctx).await {
                    break;
                }
            }
        }
        VuWork::Ramping { schedule } => loop {
            if ctx.stop.is_stopped() {
                break;
            }
            let elapsed = ctx.started.elapsed();
            if schedule.is_done(elapsed) {
                break;
            }

            if ctx.vu_id > schedule.concurrency_at(elapsed) {
                if active {
                    tracing::debug!(vu = ctx.vu_id, ?elapsed, "vu parked");
                    active = false;
                }
                let wait = schedule.next_recheck_in(elapsed, ctx.vu_id);
                ctx.stop.sleep(wait.max(MIN_PARK)).await;
                continue;
            }

            if !active {
                tracing::debug!(vu = ctx.vu_id, ?elapsed, "vu active");
                active = true;
            }

            run_iteration(&ctx, &mut rng).await?;
            if !think(&ctx).await {
                break;
            }
        },
    }

    Ok(())
}

/// One select-build-execute-evaluate-emit cycle. The request always runs to completion.
async fn run_iteration<E: ExecutionEngine>(ctx: &VuContext<E>, rng: &mut SmallRng) -> Result<()> {
    let def = &ctx.definition;
    let profile = def.select_profile(rng);
    let (request, check) = def.build_request(profile, rng);

    let timestamp = SystemTime::now();
    let outcome = ctx.engine.execute(request).await;
    let passed = CheckEvaluator.evaluate(&check, &outcome);

    if let Err(err) = &outcome {
        tracing::debug!(vu = ctx.vu_id, profile = profile.name(), error = %err, "request failed");
    }

    let result = IterationResult::from_outcome(
        profile.shared_name(),
        &check,
        ctx.vu_id,
        timestamp,
        &outcome,
        passed,
    );
    ctx.sink.emit(&result)?;
    ctx.stats.record(&result);
    Ok(())
}

/// Think-time pause, cut short by the stop signal. Returns `false` if stopped.
async fn think<E>(ctx: &VuContext<E>) -> bool {
    let think_time = ctx.definition.think_time();
    if think_time.is_zero() {
        // Instant engines would otherwise never yield.
        tokio::task::yield_now().await;
        return !ctx.stop.is_stopped();
    }
    ctx.stop.sleep(think_time).await
}
