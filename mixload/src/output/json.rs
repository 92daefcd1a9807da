use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use mixload_core::runner::{ProgressFn, ProgressUpdate, WorkloadProgress};
use mixload_core::{CombinedWorkloadDefinition, RunSummary};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _definition: &CombinedWorkloadDefinition, _results_path: &Path) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u: ProgressUpdate| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, summary: &RunSummary, results_path: &Path) -> anyhow::Result<()> {
        let line = build_summary_line(summary, results_path);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub vus: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations_target: Option<u64>,

    pub iterations_per_sec: f64,
    pub iterations_total: u64,
    pub passed_total: u64,
    pub failed_total: u64,
    pub network_errors_total: u64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    let (vus, stage, stages, iterations_target) = match &u.progress {
        WorkloadProgress::Ramp {
            current_target,
            stage,
            ..
        } => (*current_target, Some(stage.stage), Some(stage.stages), None),
        WorkloadProgress::Iterations { vus, total, .. } => (*vus, None, None, Some(*total)),
    };

    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        vus,
        stage,
        stages,
        iterations_target,
        iterations_per_sec: u.iterations_per_sec_now,
        iterations_total: u.iterations_total,
        passed_total: u.passed_total,
        failed_total: u.failed_total,
        network_errors_total: u.network_errors_total,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub profiles: Vec<JsonProfileSummary>,
    pub totals: JsonTotals,
    pub duration_secs: f64,
    pub results: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProfileSummary {
    pub profile: String,
    pub iterations: u64,
    pub passed: u64,
    pub failed: u64,
    pub network_errors: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub iterations_total: u64,
    pub passed_total: u64,
    pub failed_total: u64,
    pub network_errors_total: u64,
    pub pass_rate: f64,
}

fn build_summary_line(summary: &RunSummary, results_path: &Path) -> JsonSummaryLine {
    let profiles = summary
        .profiles
        .iter()
        .map(|p| JsonProfileSummary {
            profile: p.name.clone(),
            iterations: p.iterations,
            passed: p.passed,
            failed: p.failed,
            network_errors: p.network_errors,
        })
        .collect();

    JsonSummaryLine {
        kind: "summary",
        profiles,
        totals: JsonTotals {
            iterations_total: summary.iterations_total,
            passed_total: summary.passed_total,
            failed_total: summary.failed_total,
            network_errors_total: summary.network_errors_total,
            pass_rate: summary.pass_rate(),
        },
        duration_secs: summary.run_duration.as_secs_f64(),
        results: results_path.display().to_string(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
