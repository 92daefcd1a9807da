use anyhow::Context as _;
use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use mixload_core::{Check, CombinedWorkloadDefinition, Workload, compose_workload};

use crate::cli::ExportArgs;
use crate::config;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

pub async fn export(args: ExportArgs) -> Result<ExitCode, RunError> {
    let cfg = config::workload_config(&args.workload, &config::env_snapshot())
        .map_err(RunError::InvalidInput)?;
    let definition = compose_workload(&cfg)
        .map_err(|e| RunError::from_core(e, "invalid workload configuration"))?;

    let doc = WorkloadDoc::from_definition(&definition);
    write_json(args.out.as_deref(), &doc)
        .await
        .map_err(|e| RunError::RuntimeError(e.context("failed to write workload JSON")))?;

    Ok(ExitCode::Success)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkloadDoc {
    pub base_url: String,
    pub think_time: DocDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<DocDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub total_weight: u64,
    pub profiles: Vec<ProfileDoc>,
    pub workload: WorkloadKindDoc,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileDoc {
    pub name: String,
    pub weight: u64,
    pub checks: Vec<Check>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub(crate) enum WorkloadKindDoc {
    #[serde(rename_all = "camelCase")]
    RampingVus {
        policy: String,
        max_vus: u64,
        stages: Vec<StageDoc>,
    },
    #[serde(rename_all = "camelCase")]
    SharedIterations { vus: u64, iterations: u64 },
}

#[derive(Debug, Serialize)]
pub(crate) struct StageDoc {
    pub duration: DocDuration,
    pub target: u64,
}

/// Serialized as a humantime string, e.g. `1m 30s`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DocDuration(Duration);

impl Serialize for DocDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl WorkloadDoc {
    pub(crate) fn from_definition(def: &CombinedWorkloadDefinition) -> Self {
        let profiles = def
            .weights()
            .entries()
            .iter()
            .map(|entry| ProfileDoc {
                name: entry.profile.clone(),
                weight: entry.weight,
                checks: def
                    .registry()
                    .get(&entry.profile)
                    .map(|p| p.checks())
                    .unwrap_or_default(),
            })
            .collect();

        let workload = match def.workload() {
            Workload::Ramp(schedule) => WorkloadKindDoc::RampingVus {
                policy: schedule.policy().to_string(),
                max_vus: schedule.max_target(),
                stages: schedule
                    .stages()
                    .iter()
                    .map(|s| StageDoc {
                        duration: DocDuration(s.duration),
                        target: s.target,
                    })
                    .collect(),
            },
            Workload::Iterations { vus, iterations } => WorkloadKindDoc::SharedIterations {
                vus: *vus,
                iterations: *iterations,
            },
        };

        Self {
            base_url: def.base_url().to_string(),
            think_time: DocDuration(def.think_time()),
            request_timeout: def.request_timeout().map(DocDuration),
            seed: def.seed(),
            total_weight: def.selector().total(),
            profiles,
            workload,
        }
    }
}

async fn write_json(out: Option<&Path>, doc: &WorkloadDoc) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(doc).context("failed to serialize workload")?;
    json.push('\n');

    let Some(path) = out else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
