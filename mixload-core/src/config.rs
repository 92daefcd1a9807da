use std::time::Duration;

use crate::profiles::HealthOptions;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9000/api";
pub const DEFAULT_VUS: u64 = 50;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);
pub const DEFAULT_THINK_TIME_SECS: f64 = 1.0;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Length of the warm-up and cool-down stages around the main stage.
pub const RAMP_EDGE: Duration = Duration::from_secs(10);
/// Warm-up target cap (`min(10, vus)`).
pub const WARMUP_VUS_CAP: u64 = 10;

/// How concurrency moves inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RampPolicy {
    /// Each stage's target holds for the whole stage.
    #[default]
    Step,
    /// Interpolate from the previous stage's target to this stage's target.
    Linear,
}

/// One unvalidated stage. Fields are signed so bad input can be reported instead of wrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub duration_secs: f64,
    pub target: i64,
}

impl StageConfig {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self {
            duration_secs: duration.as_secs_f64(),
            target: i64::try_from(target).unwrap_or(i64::MAX),
        }
    }
}

/// Per-profile weight overrides, applied on top of each profile's default weight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightConfig {
    pub overrides: Vec<(String, i64)>,
}

impl WeightConfig {
    #[must_use]
    pub fn with(mut self, profile: impl Into<String>, weight: i64) -> Self {
        self.set(profile, weight);
        self
    }

    /// Later values for the same profile replace earlier ones.
    pub fn set(&mut self, profile: impl Into<String>, weight: i64) {
        let profile = profile.into();
        match self.overrides.iter_mut().find(|(name, _)| *name == profile) {
            Some(entry) => entry.1 = weight,
            None => self.overrides.push((profile, weight)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleConfig {
    Ramp {
        stages: Vec<StageConfig>,
        policy: RampPolicy,
    },
    /// A fixed number of iterations shared by `vus` constant virtual users.
    Iterations { vus: i64, iterations: i64 },
}

impl ScheduleConfig {
    /// Warm-up to `min(10, vus)`, hold `vus` for `duration`, then cool down to zero.
    pub fn default_ramp(vus: u64, duration: Duration, policy: RampPolicy) -> Self {
        Self::Ramp {
            stages: vec![
                StageConfig::new(RAMP_EDGE, vus.min(WARMUP_VUS_CAP)),
                StageConfig::new(duration, vus),
                StageConfig::new(RAMP_EDGE, 0),
            ],
            policy,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::default_ramp(DEFAULT_VUS, DEFAULT_DURATION, RampPolicy::Step)
    }
}

/// Everything needed to compose a run, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub weights: WeightConfig,
    pub schedule: ScheduleConfig,
    pub base_url: String,
    pub think_time_secs: f64,
    pub request_timeout: Option<Duration>,
    pub seed: Option<u64>,
    pub health: HealthOptions,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            weights: WeightConfig::default(),
            schedule: ScheduleConfig::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            think_time_secs: DEFAULT_THINK_TIME_SECS,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            seed: None,
            health: HealthOptions::default(),
        }
    }
}
