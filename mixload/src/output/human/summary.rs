use std::fmt::Write as _;
use std::path::Path;

use mixload_core::RunSummary;

use super::format::{format_duration, format_percent, format_rate};

pub(crate) fn render(summary: &RunSummary, results_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("summary\n");

    for p in &summary.profiles {
        writeln!(&mut out, "profile: {}", p.name).ok();
        writeln!(
            &mut out,
            "  iterations: {} ({} of all)",
            p.iterations,
            format_percent(p.iterations, summary.iterations_total)
        )
        .ok();
        writeln!(
            &mut out,
            "  checks: passed {} failed {}",
            p.passed, p.failed
        )
        .ok();
        if p.network_errors > 0 {
            writeln!(&mut out, "  network_errors: {}", p.network_errors).ok();
        }
    }

    if !summary.profiles.is_empty() {
        out.push('\n');
    }

    let secs = summary.run_duration.as_secs_f64();
    let iters_per_sec = if secs > 0.0 {
        summary.iterations_total as f64 / secs
    } else {
        0.0
    };

    out.push_str("total:\n");
    writeln!(
        &mut out,
        "  iterations: {} in {} ({}/s)",
        summary.iterations_total,
        format_duration(summary.run_duration),
        format_rate(iters_per_sec)
    )
    .ok();
    writeln!(
        &mut out,
        "  checks: passed {} failed {} ({} passed)",
        summary.passed_total,
        summary.failed_total,
        format_percent(summary.passed_total, summary.iterations_total)
    )
    .ok();
    writeln!(&mut out, "  network_errors: {}", summary.network_errors_total).ok();
    writeln!(&mut out, "results: {}", results_path.display()).ok();

    out
}
