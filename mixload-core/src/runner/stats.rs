use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::profile::ProfileRegistry;
use crate::result::IterationResult;

#[derive(Debug, Default)]
struct Counters {
    iterations: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
    network_errors: AtomicU64,
}

impl Counters {
    fn record(&self, result: &IterationResult) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        if result.passed {
            self.passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if result.is_network_error() {
            self.network_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Live counters shared by all VUs of one run.
#[derive(Debug)]
pub struct RunStats {
    total: Counters,
    profiles: Vec<(Arc<str>, Counters)>,
}

impl RunStats {
    pub fn new(registry: &ProfileRegistry) -> Self {
        Self {
            total: Counters::default(),
            profiles: registry
                .all()
                .iter()
                .map(|p| (p.shared_name(), Counters::default()))
                .collect(),
        }
    }

    pub fn record(&self, result: &IterationResult) {
        self.total.record(result);
        if let Some((_, counters)) = self
            .profiles
            .iter()
            .find(|(name, _)| **name == *result.profile)
        {
            counters.record(result);
        }
    }

    pub fn iterations_total(&self) -> u64 {
        self.total.iterations.load(Ordering::Relaxed)
    }

    pub fn passed_total(&self) -> u64 {
        self.total.passed.load(Ordering::Relaxed)
    }

    pub fn failed_total(&self) -> u64 {
        self.total.failed.load(Ordering::Relaxed)
    }

    pub fn network_errors_total(&self) -> u64 {
        self.total.network_errors.load(Ordering::Relaxed)
    }

    pub fn summarize(&self, run_duration: Duration) -> RunSummary {
        RunSummary {
            iterations_total: self.iterations_total(),
            passed_total: self.passed_total(),
            failed_total: self.failed_total(),
            network_errors_total: self.network_errors_total(),
            profiles: self
                .profiles
                .iter()
                .map(|(name, c)| ProfileSummary {
                    name: name.to_string(),
                    iterations: c.iterations.load(Ordering::Relaxed),
                    passed: c.passed.load(Ordering::Relaxed),
                    failed: c.failed.load(Ordering::Relaxed),
                    network_errors: c.network_errors.load(Ordering::Relaxed),
                })
                .collect(),
            run_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub name: String,
    pub iterations: u64,
    pub passed: u64,
    pub failed: u64,
    pub network_errors: u64,
}

/// Counts for a finished run. Built only after every VU has stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations_total: u64,
    pub passed_total: u64,
    pub failed_total: u64,
    /// Subset of `failed_total` that never got a response.
    pub network_errors_total: u64,
    /// In registry order.
    pub profiles: Vec<ProfileSummary>,
    pub run_duration: Duration,
}

impl RunSummary {
    pub fn profile(&self, name: &str) -> Option<&ProfileSummary> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Share of iterations whose check passed (0..=1); 0 for an empty run.
    pub fn pass_rate(&self) -> f64 {
        if self.iterations_total == 0 {
            0.0
        } else {
            self.passed_total as f64 / self.iterations_total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::SystemTime;

    use super::*;
    use crate::profiles::{HealthOptions, builtin_registry};

    fn result(profile: &str, status: Option<u16>, passed: bool) -> IterationResult {
        IterationResult {
            profile: Arc::from(profile),
            check: "c",
            vu: 1,
            timestamp: SystemTime::UNIX_EPOCH,
            latency_ms: 1.0,
            status,
            passed,
            error: status.is_none().then(|| "refused".to_string()),
        }
    }

    #[test]
    fn summary_counts_per_profile_in_registry_order() {
        let stats = RunStats::new(&builtin_registry(HealthOptions::default()).unwrap());
        stats.record(&result("search", Some(200), true));
        stats.record(&result("products", Some(200), true));
        stats.record(&result("products", Some(503), false));
        stats.record(&result("health", None, false));

        let s = stats.summarize(Duration::from_secs(3));
        assert_eq!(
            (s.iterations_total, s.passed_total, s.failed_total, s.network_errors_total),
            (4, 2, 2, 1)
        );
        assert_eq!(
            s.profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["products", "search", "health"]
        );

        let products = s.profile("products").unwrap();
        assert_eq!((products.iterations, products.passed, products.failed), (2, 1, 1));
        assert_eq!(s.profile("health").unwrap().network_errors, 1);
        assert!((s.pass_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run_has_zero_pass_rate() {
        let stats = RunStats::new(&ProfileRegistry::new());
        assert_eq!(stats.summarize(Duration::ZERO).pass_rate(), 0.0);
    }
}
