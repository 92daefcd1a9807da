use std::time::Duration;

use crate::config::{RampPolicy, StageConfig};
use crate::error::{Error, Result};

const MAX_RECHECK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampStage {
    pub duration: Duration,
    pub target: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    pub index: usize,
    pub count: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

/// Target concurrency over time.
///
/// Stage `i` covers `[end_{i-1}, end_i)`: at an exact boundary the later stage
/// applies. Past the last stage the last target holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampSchedule {
    stages: Vec<RampStage>,
    cumulative_ends: Vec<Duration>,
    policy: RampPolicy,
}

impl RampSchedule {
    pub fn new(stages: Vec<RampStage>, policy: RampPolicy) -> Result<Self> {
        if stages.is_empty() {
            return Err(Error::invalid("stages", "must contain at least one stage"));
        }

        let mut cumulative_ends = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for (i, s) in stages.iter().enumerate() {
            if s.duration.is_zero() {
                return Err(Error::invalid(
                    format!("stages[{i}].duration"),
                    "must be greater than zero",
                ));
            }
            acc = acc.checked_add(s.duration).ok_or_else(|| {
                Error::invalid(format!("stages[{i}].duration"), "total schedule overflows")
            })?;
            cumulative_ends.push(acc);
        }

        Ok(Self {
            stages,
            cumulative_ends,
            policy,
        })
    }

    /// Validates raw stage input: finite positive durations, non-negative targets.
    pub fn from_config(stages: &[StageConfig], policy: RampPolicy) -> Result<Self> {
        let stages = stages
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if !s.duration_secs.is_finite() || s.duration_secs <= 0.0 {
                    return Err(Error::invalid(
                        format!("stages[{i}].duration"),
                        format!("must be a positive, finite number of seconds (got {})", s.duration_secs),
                    ));
                }
                let duration = Duration::try_from_secs_f64(s.duration_secs).map_err(|e| {
                    Error::invalid(format!("stages[{i}].duration"), e.to_string())
                })?;
                let target = u64::try_from(s.target).map_err(|_| {
                    Error::invalid(
                        format!("stages[{i}].target"),
                        format!("must be >= 0 (got {})", s.target),
                    )
                })?;
                Ok(RampStage { duration, target })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(stages, policy)
    }

    pub fn stages(&self) -> &[RampStage] {
        &self.stages
    }

    pub fn policy(&self) -> RampPolicy {
        self.policy
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Highest concurrency the schedule ever asks for.
    pub fn max_target(&self) -> u64 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Index of the stage containing `elapsed`, or `None` past the end.
    fn stage_index(&self, elapsed: Duration) -> Option<usize> {
        let idx = self.cumulative_ends.partition_point(|end| *end <= elapsed);
        (idx < self.stages.len()).then_some(idx)
    }

    fn stage_start(&self, idx: usize) -> Duration {
        if idx == 0 {
            Duration::ZERO
        } else {
            self.cumulative_ends[idx - 1]
        }
    }

    fn start_target(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.stages[idx - 1].target
        }
    }

    fn last_target(&self) -> u64 {
        self.stages.last().map(|s| s.target).unwrap_or(0)
    }

    pub fn concurrency_at(&self, elapsed: Duration) -> u64 {
        let Some(idx) = self.stage_index(elapsed) else {
            return self.last_target();
        };

        let end_target = self.stages[idx].target;
        match self.policy {
            RampPolicy::Step => end_target,
            RampPolicy::Linear => {
                let stage_start = self.stage_start(idx);
                let stage_duration = self.cumulative_ends[idx].saturating_sub(stage_start);
                let stage_elapsed = elapsed.saturating_sub(stage_start);

                let start_i = self.start_target(idx) as i128;
                let delta = end_target as i128 - start_i;
                let num = stage_elapsed.as_nanos() as i128;
                let den = (stage_duration.as_nanos() as i128).max(1);

                let cur = start_i + delta.saturating_mul(num) / den;
                cur.clamp(0, u64::MAX as i128) as u64
            }
        }
    }

    /// Like [`Self::concurrency_at`] for signed seconds: negative or NaN is before the start.
    pub fn concurrency_at_secs(&self, elapsed_secs: f64) -> u64 {
        if elapsed_secs.is_nan() || elapsed_secs < 0.0 {
            return 0;
        }
        match Duration::try_from_secs_f64(elapsed_secs) {
            Ok(elapsed) => self.concurrency_at(elapsed),
            Err(_) => self.last_target(),
        }
    }

    pub fn stage_snapshot_at(&self, elapsed: Duration) -> StageSnapshot {
        let total = self.total_duration();
        let idx = self
            .stage_index(elapsed)
            .unwrap_or(self.stages.len().saturating_sub(1));
        let clamped = elapsed.min(total);

        let stage_start = self.stage_start(idx);
        let stage_duration = self.cumulative_ends[idx].saturating_sub(stage_start);
        let stage_elapsed = clamped.saturating_sub(stage_start);

        StageSnapshot {
            index: idx,
            count: self.stages.len(),
            stage_elapsed,
            stage_remaining: stage_duration.saturating_sub(stage_elapsed),
            start_target: self.start_target(idx),
            end_target: self.stages[idx].target,
            current_target: self.concurrency_at(elapsed),
        }
    }

    /// How long a parked VU (`vu_index` is 1-based) may sleep before it could become active.
    pub fn next_recheck_in(&self, elapsed: Duration, vu_index: u64) -> Duration {
        if vu_index <= self.concurrency_at(elapsed) {
            return Duration::ZERO;
        }
        let Some(idx) = self.stage_index(elapsed) else {
            return Duration::ZERO;
        };

        let stage_end = self.cumulative_ends[idx];
        let until_stage_end = stage_end.saturating_sub(elapsed).min(MAX_RECHECK);

        let start_target = self.start_target(idx);
        let end_target = self.stages[idx].target;
        if self.policy == RampPolicy::Step || end_target <= start_target || vu_index > end_target {
            return until_stage_end;
        }

        // Solve start + (end - start) * t / dur >= vu_index for t.
        let stage_start = self.stage_start(idx);
        let stage_ns = stage_end.saturating_sub(stage_start).as_nanos() as i128;
        let elapsed_ns = elapsed.saturating_sub(stage_start).as_nanos() as i128;
        let delta = (end_target - start_target) as i128;
        let want = (vu_index - start_target) as i128;

        let needed_ns = want.saturating_mul(stage_ns) / delta;
        let wait_ns = needed_ns.saturating_sub(elapsed_ns).max(0);
        Duration::from_nanos(wait_ns.min(u64::MAX as i128) as u64).min(MAX_RECHECK)
    }
}
