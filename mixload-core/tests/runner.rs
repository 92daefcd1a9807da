mod support;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use mixload_core::runner::{ProgressUpdate, WorkloadProgress};
use mixload_core::{
    Error, HealthOptions, MemorySink, NdjsonSink, ReportSink, RunOptions, StopSignal,
    WeightConfig, compose_workload, run_workload,
};
use support::{BrokenSink, FailingVuSink, MockEngine, iterations_config, ramp_config};

#[tokio::test]
async fn all_200_means_every_iteration_passes() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&iterations_config(4, 200))?);
    let engine = Arc::new(MockEngine::status(200));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine, sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(summary.iterations_total == 200, "{summary:?}");
    anyhow::ensure!(summary.passed_total == summary.iterations_total);
    anyhow::ensure!(summary.failed_total == 0 && summary.network_errors_total == 0);
    anyhow::ensure!(sink.len() == 200);

    let per_profile: u64 = summary.profiles.iter().map(|p| p.iterations).sum();
    anyhow::ensure!(per_profile == 200, "{:?}", summary.profiles);
    Ok(())
}

#[tokio::test]
async fn health_error_branch_passes_on_500() -> anyhow::Result<()> {
    let cfg = mixload_core::WorkloadConfig {
        weights: WeightConfig::default().with("products", 0).with("search", 0),
        health: HealthOptions { error_percent: 100 },
        ..iterations_config(2, 40)
    };
    let def = Arc::new(compose_workload(&cfg)?);
    let engine = Arc::new(MockEngine::new(|req| {
        Some(if req.url.contains("test_error=true") { 500 } else { 200 })
    }));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine, sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(summary.passed_total == 40, "{summary:?}");
    for r in sink.results() {
        anyhow::ensure!(&*r.profile == "health");
        anyhow::ensure!(r.check == "health error produced");
        anyhow::ensure!(r.status == Some(500) && r.passed, "{r:?}");
    }
    Ok(())
}

#[tokio::test]
async fn a_500_on_the_plain_health_check_fails() -> anyhow::Result<()> {
    let cfg = mixload_core::WorkloadConfig {
        weights: WeightConfig::default().with("products", 0).with("search", 0),
        ..iterations_config(1, 10)
    };
    let def = Arc::new(compose_workload(&cfg)?);
    let engine = Arc::new(MockEngine::status(500));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine, sink, RunOptions::default()).await?;

    anyhow::ensure!(summary.failed_total == 10 && summary.passed_total == 0, "{summary:?}");
    Ok(())
}

#[tokio::test]
async fn iterations_mode_emits_exactly_n_results() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&iterations_config(7, 101))?);
    let engine = Arc::new(MockEngine::status(200).with_delay(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine.clone(), sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(summary.iterations_total == 101, "{summary:?}");
    anyhow::ensure!(sink.len() == 101);
    anyhow::ensure!(engine.started() == 101);

    let mut vus: Vec<u64> = sink.results().iter().map(|r| r.vu).collect();
    vus.sort_unstable();
    vus.dedup();
    anyhow::ensure!(vus.iter().all(|vu| (1..=7).contains(vu)), "{vus:?}");
    Ok(())
}

#[tokio::test]
async fn network_errors_are_counted_not_fatal() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&iterations_config(3, 30))?);
    let engine = Arc::new(MockEngine::new(|_| None));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine, sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(summary.iterations_total == 30);
    anyhow::ensure!(summary.failed_total == 30 && summary.network_errors_total == 30);
    for r in sink.results() {
        anyhow::ensure!(r.status.is_none() && !r.passed);
        let err = r.error.as_deref().unwrap_or_default();
        anyhow::ensure!(err.contains("connection refused"), "{err}");
    }
    Ok(())
}

#[tokio::test]
async fn ramp_run_follows_schedule_and_ends_on_time() -> anyhow::Result<()> {
    let cfg = ramp_config(
        &[
            (Duration::from_millis(200), 2),
            (Duration::from_millis(200), 4),
        ],
        0.01,
    );
    let def = Arc::new(compose_workload(&cfg)?);
    let engine = Arc::new(MockEngine::status(200).with_delay(Duration::from_millis(5)));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine, sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(summary.run_duration >= Duration::from_millis(400), "{summary:?}");
    anyhow::ensure!(summary.run_duration < Duration::from_secs(3), "{summary:?}");
    anyhow::ensure!(summary.iterations_total > 0);

    let results = sink.results();
    anyhow::ensure!(results.iter().all(|r| (1..=4).contains(&r.vu)));
    anyhow::ensure!(
        results.iter().any(|r| r.vu == 4),
        "VU 4 should have run during the second stage"
    );
    Ok(())
}

#[tokio::test]
async fn ramp_down_never_truncates_in_flight_requests() -> anyhow::Result<()> {
    // VUs 2 and 3 start a slow request, then the target drops to 1 mid-request.
    let cfg = ramp_config(
        &[
            (Duration::from_millis(100), 3),
            (Duration::from_millis(300), 1),
        ],
        0.0,
    );
    let def = Arc::new(compose_workload(&cfg)?);
    let engine = Arc::new(MockEngine::status(200).with_delay(Duration::from_millis(250)));
    let sink = Arc::new(MemorySink::new());

    let summary = run_workload(def, engine.clone(), sink.clone(), RunOptions::default()).await?;

    anyhow::ensure!(engine.started() == engine.completed());
    anyhow::ensure!(
        engine.started() == summary.iterations_total,
        "started {} requests but summarized {}",
        engine.started(),
        summary.iterations_total
    );
    anyhow::ensure!(sink.len() as u64 == summary.iterations_total);

    let results = sink.results();
    for vu in [2, 3] {
        let n = results.iter().filter(|r| r.vu == vu).count();
        anyhow::ensure!(n == 1, "VU {vu} emitted {n} results, expected exactly one");
    }
    Ok(())
}

#[tokio::test]
async fn stop_signal_halts_new_iterations() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&iterations_config(2, 1_000_000))?);
    let engine = Arc::new(MockEngine::status(200).with_delay(Duration::from_millis(10)));
    let sink = Arc::new(MemorySink::new());
    let stop = Arc::new(StopSignal::new());

    let stopper = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stop.stop();
        })
    };

    let opts = RunOptions {
        stop,
        ..RunOptions::default()
    };
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        run_workload(def, engine.clone(), sink.clone(), opts),
    )
    .await
    .context("run did not stop")??;
    stopper.await.context("join stopper")?;

    anyhow::ensure!(summary.iterations_total < 1_000_000);
    anyhow::ensure!(summary.iterations_total > 0);
    anyhow::ensure!(engine.started() == summary.iterations_total);
    anyhow::ensure!(sink.len() as u64 == summary.iterations_total);
    Ok(())
}

#[tokio::test]
async fn sink_failure_fails_the_run() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&iterations_config(2, 50))?);
    let engine = Arc::new(MockEngine::status(200));

    let err = run_workload(def, engine, Arc::new(BrokenSink), RunOptions::default())
        .await
        .err()
        .context("expected an error")?;
    anyhow::ensure!(matches!(err, Error::Io(_)), "{err:?}");
    anyhow::ensure!(!err.is_configuration());
    Ok(())
}

#[tokio::test]
async fn one_failing_vu_ends_the_run_early() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&ramp_config(
        &[(Duration::from_secs(3), 4)],
        0.01,
    ))?);
    let engine = Arc::new(MockEngine::status(200));

    let started = Instant::now();
    let err = run_workload(
        def,
        engine,
        Arc::new(FailingVuSink { vu: 4 }),
        RunOptions::default(),
    )
    .await
    .err()
    .context("expected an error")?;
    let took = started.elapsed();

    anyhow::ensure!(matches!(err, Error::Io(_)), "{err:?}");
    anyhow::ensure!(
        took < Duration::from_secs(1),
        "run kept going for {took:?} after vu 4 failed"
    );
    Ok(())
}

#[tokio::test]
async fn panicking_vu_is_an_engine_launch_failure() -> anyhow::Result<()> {
    let def = Arc::new(compose_workload(&ramp_config(
        &[(Duration::from_secs(3), 4)],
        0.01,
    ))?);
    let engine = Arc::new(MockEngine::status(200).panicking_on(5));
    let sink = Arc::new(MemorySink::new());

    let started = Instant::now();
    let err = run_workload(def, engine.clone(), sink.clone(), RunOptions::default())
        .await
        .err()
        .context("expected an error")?;
    let took = started.elapsed();

    anyhow::ensure!(matches!(err, Error::EngineLaunch(_)), "{err:?}");
    anyhow::ensure!(!err.is_configuration());
    anyhow::ensure!(
        took < Duration::from_secs(1),
        "run kept going for {took:?} after a vu panicked"
    );
    // The crashed request never produced a result.
    anyhow::ensure!(sink.len() as u64 == engine.completed());
    Ok(())
}

#[tokio::test]
async fn ndjson_lines_stay_whole_under_concurrency() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("logs").join("combined.ndjson");

    let def = Arc::new(compose_workload(&iterations_config(16, 800))?);
    let engine = Arc::new(MockEngine::status(200));
    let sink = Arc::new(NdjsonSink::create(&path)?);

    run_workload(def, engine, sink.clone(), RunOptions::default()).await?;
    sink.flush()?;

    let text = std::fs::read_to_string(&path)?;
    let mut lines = 0;
    for line in text.lines() {
        let v: serde_json::Value =
            serde_json::from_str(line).with_context(|| format!("bad line: {line}"))?;
        anyhow::ensure!(v["passed"] == true);
        lines += 1;
    }
    anyhow::ensure!(lines == 800, "expected 800 lines, got {lines}");
    Ok(())
}

#[tokio::test]
async fn same_seed_replays_the_same_profile_sequence() -> anyhow::Result<()> {
    async fn sequence() -> anyhow::Result<Vec<String>> {
        let def = Arc::new(compose_workload(&iterations_config(1, 60))?);
        let sink = Arc::new(MemorySink::new());
        run_workload(
            def,
            Arc::new(MockEngine::status(200)),
            sink.clone(),
            RunOptions::default(),
        )
        .await?;
        Ok(sink.results().iter().map(|r| r.profile.to_string()).collect())
    }

    let a = sequence().await?;
    let b = sequence().await?;
    anyhow::ensure!(a.len() == 60);
    anyhow::ensure!(a == b);
    Ok(())
}

#[tokio::test]
async fn progress_reports_stage_and_totals() -> anyhow::Result<()> {
    let cfg = ramp_config(&[(Duration::from_millis(350), 2)], 0.01);
    let def = Arc::new(compose_workload(&cfg)?);
    let engine = Arc::new(MockEngine::status(200));

    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let opts = RunOptions {
        progress: Some({
            let updates = updates.clone();
            Arc::new(move |u: ProgressUpdate| {
                updates
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(u)
            })
        }),
        progress_interval: Duration::from_millis(100),
        ..RunOptions::default()
    };

    run_workload(def, engine, Arc::new(MemorySink::new()), opts).await?;

    let updates = updates
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    anyhow::ensure!(!updates.is_empty(), "no progress updates");
    anyhow::ensure!(updates[0].tick == 1);
    match &updates[0].progress {
        WorkloadProgress::Ramp {
            current_target,
            stage,
            ..
        } => {
            anyhow::ensure!(*current_target == 2);
            anyhow::ensure!(stage.stage == 1 && stage.stages == 1);
        }
        other => anyhow::bail!("unexpected progress {other:?}"),
    }
    Ok(())
}
