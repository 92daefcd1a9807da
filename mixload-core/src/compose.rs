use std::sync::Arc;
use std::time::Duration;

use mixload_http::HttpRequest;
use rand::RngCore;

use crate::check::Check;
use crate::config::{ScheduleConfig, WeightConfig, WorkloadConfig};
use crate::error::{Error, Result};
use crate::profile::{ProfileRegistry, TrafficProfile};
use crate::profiles::builtin_registry;
use crate::schedule::RampSchedule;
use crate::selector::WeightedSelector;
use crate::weights::WeightTable;

/// How VUs are driven for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workload {
    /// Time-based: VU count follows the schedule until it ends.
    Ramp(RampSchedule),
    /// Exactly `iterations` iterations shared by `vus` constant VUs.
    Iterations { vus: u64, iterations: u64 },
}

impl Workload {
    pub fn max_vus(&self) -> u64 {
        match self {
            Self::Ramp(schedule) => schedule.max_target(),
            Self::Iterations { vus, .. } => *vus,
        }
    }

    /// `None` when the run ends by iteration count.
    pub fn total_duration(&self) -> Option<Duration> {
        match self {
            Self::Ramp(schedule) => Some(schedule.total_duration()),
            Self::Iterations { .. } => None,
        }
    }
}

/// Everything a run needs, validated and frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedWorkloadDefinition {
    registry: Arc<ProfileRegistry>,
    weights: WeightTable,
    selector: WeightedSelector,
    workload: Workload,
    base_url: String,
    think_time: Duration,
    request_timeout: Option<Duration>,
    seed: Option<u64>,
}

impl CombinedWorkloadDefinition {
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn selector(&self) -> &WeightedSelector {
        &self.selector
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    /// Without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn think_time(&self) -> Duration {
        self.think_time
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn select_profile(&self, rng: &mut dyn RngCore) -> &TrafficProfile {
        // The selector is built from this registry, so the index is in range.
        &self.registry.all()[self.selector.select(rng)]
    }

    pub fn build_request(
        &self,
        profile: &TrafficProfile,
        rng: &mut dyn RngCore,
    ) -> (HttpRequest, Check) {
        profile
            .builder()
            .build(rng)
            .into_http(&self.base_url, self.request_timeout)
    }
}

/// Builds [`CombinedWorkloadDefinition`]s over one registry.
///
/// Composition is pure: no clock, no randomness, no environment.
#[derive(Debug, Clone)]
pub struct WorkloadComposer {
    registry: Arc<ProfileRegistry>,
}

impl WorkloadComposer {
    pub fn new(registry: Arc<ProfileRegistry>) -> Self {
        Self { registry }
    }

    pub fn compose(
        &self,
        weights: &WeightConfig,
        schedule: &ScheduleConfig,
        base_url: &str,
        think_time_secs: f64,
    ) -> Result<CombinedWorkloadDefinition> {
        let weights = WeightTable::resolve(&self.registry, weights)?;
        let selector = WeightedSelector::new(&weights).map_err(|e| match e {
            Error::InvalidWeights(reason) => Error::invalid("weights", reason),
            other => other,
        })?;

        Ok(CombinedWorkloadDefinition {
            registry: self.registry.clone(),
            weights,
            selector,
            workload: validate_schedule(schedule)?,
            base_url: validate_base_url(base_url)?,
            think_time: validate_think_time(think_time_secs)?,
            request_timeout: Some(crate::config::DEFAULT_REQUEST_TIMEOUT),
            seed: None,
        })
    }

    pub fn compose_config(&self, cfg: &WorkloadConfig) -> Result<CombinedWorkloadDefinition> {
        let mut def = self.compose(
            &cfg.weights,
            &cfg.schedule,
            &cfg.base_url,
            cfg.think_time_secs,
        )?;

        if cfg.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::invalid("request_timeout", "must be greater than zero"));
        }
        def.request_timeout = cfg.request_timeout;
        def.seed = cfg.seed;
        Ok(def)
    }
}

/// Composes `cfg` over the built-in products/search/health registry.
pub fn compose_workload(cfg: &WorkloadConfig) -> Result<CombinedWorkloadDefinition> {
    let registry = builtin_registry(cfg.health)?;
    WorkloadComposer::new(Arc::new(registry)).compose_config(cfg)
}

fn validate_schedule(schedule: &ScheduleConfig) -> Result<Workload> {
    match schedule {
        ScheduleConfig::Ramp { stages, policy } => {
            let schedule = RampSchedule::from_config(stages, *policy)?;
            if schedule.max_target() == 0 {
                return Err(Error::invalid(
                    "stages",
                    "at least one stage must target more than zero VUs",
                ));
            }
            Ok(Workload::Ramp(schedule))
        }
        ScheduleConfig::Iterations { vus, iterations } => {
            let vus = u64::try_from(*vus)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| Error::invalid("vus", format!("must be >= 1 (got {vus})")))?;
            let iterations = u64::try_from(*iterations)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::invalid("iterations", format!("must be >= 1 (got {iterations})"))
                })?;
            Ok(Workload::Iterations { vus, iterations })
        }
    }
}

fn validate_base_url(base_url: &str) -> Result<String> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| Error::invalid("base_url", format!("`{base_url}` is not a valid URL: {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::invalid(
            "base_url",
            format!("scheme must be http or https (got `{}`)", parsed.scheme()),
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid("base_url", "must include a host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(Error::invalid(
            "base_url",
            "must not carry a query string or fragment",
        ));
    }

    Ok(base_url.trim_end_matches('/').to_string())
}

fn validate_think_time(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::invalid(
            "think_time",
            format!("must be a finite number of seconds >= 0 (got {secs})"),
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| Error::invalid("think_time", e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng as _;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::{RampPolicy, StageConfig};
    use crate::profiles::HealthOptions;

    fn composer() -> WorkloadComposer {
        WorkloadComposer::new(Arc::new(builtin_registry(HealthOptions::default()).unwrap()))
    }

    fn field_of(err: Error) -> String {
        match err {
            Error::InvalidConfiguration { field, .. } => field,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let def = composer()
            .compose(
                &WeightConfig::default(),
                &ScheduleConfig::default(),
                "http://127.0.0.1:9000/api/",
                0.0,
            )
            .unwrap();
        assert_eq!(def.base_url(), "http://127.0.0.1:9000/api");
    }

    #[test]
    fn rejects_bad_base_urls() {
        for bad in ["localhost:9000", "ftp://host/api", "not a url", "http://h/api?x=1"] {
            let err = composer()
                .compose(&WeightConfig::default(), &ScheduleConfig::default(), bad, 1.0)
                .unwrap_err();
            assert_eq!(field_of(err), "base_url", "{bad}");
        }
    }

    #[test]
    fn rejects_negative_think_time() {
        let err = composer()
            .compose(
                &WeightConfig::default(),
                &ScheduleConfig::default(),
                "http://localhost/api",
                -1.0,
            )
            .unwrap_err();
        assert_eq!(field_of(err), "think_time");
    }

    #[test]
    fn rejects_all_zero_targets() {
        let schedule = ScheduleConfig::Ramp {
            stages: vec![StageConfig {
                duration_secs: 5.0,
                target: 0,
            }],
            policy: RampPolicy::Step,
        };
        let err = composer()
            .compose(&WeightConfig::default(), &schedule, "http://localhost/api", 1.0)
            .unwrap_err();
        assert_eq!(field_of(err), "stages");
    }

    #[test]
    fn iterations_mode_requires_positive_counts() {
        let compose = |vus, iterations| {
            composer().compose(
                &WeightConfig::default(),
                &ScheduleConfig::Iterations { vus, iterations },
                "http://localhost/api",
                0.0,
            )
        };
        assert_eq!(field_of(compose(0, 10).unwrap_err()), "vus");
        assert_eq!(field_of(compose(2, 0).unwrap_err()), "iterations");

        let def = compose(2, 10).unwrap();
        assert_eq!(def.workload(), &Workload::Iterations { vus: 2, iterations: 10 });
        assert_eq!(def.workload().max_vus(), 2);
        assert_eq!(def.workload().total_duration(), None);
    }

    #[test]
    fn compose_config_carries_seed_and_timeout() {
        let cfg = WorkloadConfig {
            seed: Some(42),
            request_timeout: Some(Duration::from_secs(2)),
            ..WorkloadConfig::default()
        };
        let def = compose_workload(&cfg).unwrap();
        assert_eq!(def.seed(), Some(42));
        assert_eq!(def.request_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(def.workload().total_duration(), Some(Duration::from_secs(80)));

        let zero = WorkloadConfig {
            request_timeout: Some(Duration::ZERO),
            ..WorkloadConfig::default()
        };
        assert_eq!(field_of(compose_workload(&zero).unwrap_err()), "request_timeout");
    }

    #[test]
    fn built_requests_target_the_base_url() {
        let def = compose_workload(&WorkloadConfig::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..100 {
            let profile = def.select_profile(&mut rng);
            let (req, check) = def.build_request(profile, &mut rng);
            assert!(req.url.starts_with("http://localhost:9000/api/"), "{}", req.url);
            assert!(profile.checks().contains(&check));
        }
    }
}
