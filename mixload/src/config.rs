use anyhow::Context as _;
use std::collections::BTreeMap;

use mixload_core::{
    DEFAULT_BASE_URL, DEFAULT_DURATION, DEFAULT_REQUEST_TIMEOUT, DEFAULT_THINK_TIME_SECS,
    DEFAULT_VUS, HealthOptions, ScheduleConfig, WeightConfig, WorkloadConfig,
};

use crate::cli::WorkloadArgs;

const WEIGHT_ENV_PREFIX: &str = "WEIGHT_";

pub(crate) fn env_snapshot() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

/// Resolves flags, `WEIGHT_<PROFILE>` variables and built-in defaults into one config.
///
/// Scalar settings already carry their env fallback through clap. Weight variables are
/// open-ended, so they are read from `env` here; `--weight` beats `WEIGHT_<PROFILE>`.
pub(crate) fn workload_config(
    args: &WorkloadArgs,
    env: &BTreeMap<String, String>,
) -> anyhow::Result<WorkloadConfig> {
    let mut weights = WeightConfig::default();
    for (key, value) in env {
        let Some(profile) = key.strip_prefix(WEIGHT_ENV_PREFIX) else {
            continue;
        };
        if profile.is_empty() {
            continue;
        }
        let weight: i64 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}={value} (expected an integer weight)"))?;
        weights.set(profile.to_ascii_lowercase(), weight);
    }
    for (profile, weight) in &args.weights {
        weights.set(profile.clone(), *weight);
    }

    let schedule = match args.iterations {
        Some(iterations) => ScheduleConfig::Iterations {
            vus: to_signed(args.vus.unwrap_or(1)),
            iterations: to_signed(iterations),
        },
        None => ScheduleConfig::default_ramp(
            args.vus.unwrap_or(DEFAULT_VUS),
            args.duration.unwrap_or(DEFAULT_DURATION),
            args.ramp,
        ),
    };

    Ok(WorkloadConfig {
        weights,
        schedule,
        base_url: args
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        think_time_secs: args.think_time.unwrap_or(DEFAULT_THINK_TIME_SECS),
        request_timeout: Some(args.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)),
        seed: args.seed,
        health: HealthOptions {
            error_percent: args.health_error_percent.unwrap_or(0),
        },
    })
}

fn to_signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser as _;
    use mixload_core::RampPolicy;
    use std::time::Duration;

    fn workload_args(argv: &[&str]) -> anyhow::Result<WorkloadArgs> {
        let mut full = vec!["mixload", "export"];
        full.extend_from_slice(argv);
        let cli = Cli::try_parse_from(full)?;
        match cli.command {
            Command::Export(args) => Ok(args.workload),
            Command::Run(_) => anyhow::bail!("expected export command"),
        }
    }

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_the_standard_ramp() -> anyhow::Result<()> {
        let cfg = workload_config(&workload_args(&[])?, &BTreeMap::new())?;

        anyhow::ensure!(cfg.weights.overrides.is_empty());
        anyhow::ensure!(
            cfg.schedule
                == ScheduleConfig::default_ramp(DEFAULT_VUS, DEFAULT_DURATION, RampPolicy::Step)
        );
        anyhow::ensure!(cfg.base_url == DEFAULT_BASE_URL);
        anyhow::ensure!(cfg.think_time_secs == DEFAULT_THINK_TIME_SECS);
        anyhow::ensure!(cfg.request_timeout == Some(DEFAULT_REQUEST_TIMEOUT));
        anyhow::ensure!(cfg.seed.is_none());
        anyhow::ensure!(cfg.health.error_percent == 0);
        Ok(())
    }

    #[test]
    fn weight_env_vars_are_read_and_cli_wins() -> anyhow::Result<()> {
        let args = workload_args(&["--weight", "search=40"])?;
        let env = env(&[
            ("WEIGHT_SEARCH", "10"),
            ("WEIGHT_HEALTH", "0"),
            ("PATH", "/usr/bin"),
            ("WEIGHT_", "3"),
        ]);

        let cfg = workload_config(&args, &env)?;
        // BTreeMap order: WEIGHT_HEALTH before WEIGHT_SEARCH.
        anyhow::ensure!(
            cfg.weights.overrides
                == vec![("health".to_string(), 0), ("search".to_string(), 40)],
            "{:?}",
            cfg.weights.overrides
        );
        Ok(())
    }

    #[test]
    fn non_numeric_weight_env_is_rejected() -> anyhow::Result<()> {
        let err = match workload_config(&workload_args(&[])?, &env(&[("WEIGHT_SEARCH", "lots")])) {
            Ok(cfg) => anyhow::bail!("expected an error, got {cfg:?}"),
            Err(err) => err,
        };
        anyhow::ensure!(err.to_string().contains("WEIGHT_SEARCH"), "{err}");
        Ok(())
    }

    #[test]
    fn iterations_switch_to_shared_iterations() -> anyhow::Result<()> {
        let cfg = workload_config(&workload_args(&["--iterations", "20"])?, &BTreeMap::new())?;
        anyhow::ensure!(
            cfg.schedule
                == ScheduleConfig::Iterations {
                    vus: 1,
                    iterations: 20
                }
        );

        let cfg = workload_config(
            &workload_args(&["--iterations", "20", "--vus", "4"])?,
            &BTreeMap::new(),
        )?;
        anyhow::ensure!(
            cfg.schedule
                == ScheduleConfig::Iterations {
                    vus: 4,
                    iterations: 20
                }
        );
        Ok(())
    }

    #[test]
    fn flags_shape_the_ramp() -> anyhow::Result<()> {
        let args = workload_args(&[
            "--vus",
            "5",
            "--duration",
            "30s",
            "--ramp",
            "linear",
            "--think-time",
            "0",
            "--timeout",
            "250ms",
            "--seed",
            "3",
            "--health-error-percent",
            "25",
        ])?;
        let cfg = workload_config(&args, &BTreeMap::new())?;

        anyhow::ensure!(
            cfg.schedule
                == ScheduleConfig::default_ramp(5, Duration::from_secs(30), RampPolicy::Linear)
        );
        anyhow::ensure!(cfg.think_time_secs == 0.0);
        anyhow::ensure!(cfg.request_timeout == Some(Duration::from_millis(250)));
        anyhow::ensure!(cfg.seed == Some(3));
        anyhow::ensure!(cfg.health.error_percent == 25);
        Ok(())
    }
}
