use clap::{Args, Parser, Subcommand};
use mixload_core::RampPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60 * 60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

/// `NAME=N`, e.g. `search=40`. The value may be negative so the core can reject it by name.
pub(crate) fn parse_weight(input: &str) -> Result<(String, i64), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("invalid weight '{input}' (expected NAME=N, e.g. search=40)"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid weight '{input}' (empty profile name)"));
    }

    let value: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{input}' (N must be an integer)"))?;

    Ok((name.to_ascii_lowercase(), value))
}

fn parse_ramp_policy(input: &str) -> Result<RampPolicy, String> {
    input
        .trim()
        .parse()
        .map_err(|_| format!("invalid ramp policy '{input}' (expected step or linear)"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar and a plain-text summary.
    HumanReadable,
    /// Emit JSON progress and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "mixload",
    author,
    version,
    about = "Weighted multi-profile HTTP load generator",
    long_about = "mixload mixes the products, search and health traffic profiles into one weighted workload and drives it against a catalog API.\n\nConcurrency follows a staged ramp (warm-up to min(10, VUS), hold VUS for DURATION, cool down to 0) or a fixed iteration count. Every request is written to an NDJSON results file.",
    after_help = "Examples:\n  mixload run\n  mixload run --vus 20 --duration 30s --base-url http://localhost:9000/api\n  mixload run --weight search=50 --weight health=0\n  K6_ITERATIONS=20 HEALTH_ERROR_PERCENT=10 mixload run\n  mixload export --vus 100"
)]
pub struct Cli {
    /// Log run progress at info level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compose and run the combined workload
    Run(RunArgs),

    /// Print the composed workload definition as JSON without running it
    Export(ExportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct WorkloadArgs {
    /// Override a profile weight (repeatable, NAME=N). Also read from WEIGHT_<PROFILE>.
    #[arg(long = "weight", value_name = "NAME=N", value_parser = parse_weight)]
    pub weights: Vec<(String, i64)>,

    /// Peak number of virtual users
    #[arg(long, env = "K6_VUS")]
    pub vus: Option<u64>,

    /// Main stage duration (e.g. 60s, 2m)
    #[arg(long, env = "K6_DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Target API base URL
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Run exactly N iterations instead of the timed ramp (VUs default to 1)
    #[arg(long, env = "K6_ITERATIONS")]
    pub iterations: Option<u64>,

    /// Pause between iterations, in seconds (fractions allowed)
    #[arg(long, env = "THINK_TIME", value_name = "SECS")]
    pub think_time: Option<f64>,

    /// Per-request timeout (e.g. 5s, 500ms)
    #[arg(long = "timeout", env = "REQUEST_TIMEOUT", value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Seed for reproducible profile selection and request parameters
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// How concurrency moves inside a stage
    #[arg(long = "ramp", env = "RAMP_POLICY", value_parser = parse_ramp_policy, default_value = "step")]
    pub ramp: RampPolicy,

    /// Percentage (0-100) of health requests that hit the server's error path
    #[arg(long, env = "HEALTH_ERROR_PERCENT", value_name = "PCT")]
    pub health_error_percent: Option<u8>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    /// Results file (NDJSON). Defaults to <logs-dir>/combined-<timestamp>.ndjson
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Directory for timestamped results files
    #[arg(long, env = "LOGS_DIR", default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    /// Write the JSON here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}
