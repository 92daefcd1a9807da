use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use mixload_core::{HttpEngine, NdjsonSink, RunOptions, StopSignal, compose_workload, run_workload};

use crate::cli::RunArgs;
use crate::config;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let cfg = config::workload_config(&args.workload, &config::env_snapshot())
        .map_err(RunError::InvalidInput)?;
    let definition = compose_workload(&cfg)
        .map_err(|e| RunError::from_core(e, "invalid workload configuration"))?;
    let definition = Arc::new(definition);

    let results_path = args
        .out
        .clone()
        .unwrap_or_else(|| timestamped_results_path(&args.logs_dir, SystemTime::now()));
    let sink = NdjsonSink::create(&results_path)
        .with_context(|| format!("failed to create results file: {}", results_path.display()))
        .map_err(RunError::RuntimeError)?;

    out.print_header(&definition, &results_path);

    let stop = Arc::new(StopSignal::new());
    let ctrl_c = tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, waiting for in-flight requests");
                stop.stop();
            }
        }
    });

    let options = RunOptions {
        progress: out.progress(),
        stop,
        ..RunOptions::default()
    };

    let result = run_workload(
        definition,
        Arc::new(HttpEngine::default()),
        Arc::new(sink),
        options,
    )
    .await;
    ctrl_c.abort();

    let summary = result.map_err(|e| RunError::from_core(e, "workload run failed"))?;

    out.print_summary(&summary, &results_path)
        .map_err(RunError::RuntimeError)?;

    if summary.failed_total > 0 {
        tracing::info!(
            failed = summary.failed_total,
            "some checks failed; see the results file"
        );
    }

    Ok(ExitCode::Success)
}

/// `<dir>/combined-<UTC timestamp>.ndjson`, with `:` and `.` swapped for `-` so the name is portable.
fn timestamped_results_path(logs_dir: &Path, now: SystemTime) -> PathBuf {
    let stamp = humantime::format_rfc3339_millis(now)
        .to_string()
        .replace([':', '.'], "-");
    logs_dir.join(format!("combined-{stamp}.ndjson"))
}
