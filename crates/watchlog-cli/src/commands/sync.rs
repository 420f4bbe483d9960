use super::sync_ui::SyncUI;
use super::{build_orchestrator, load_config, load_credentials};
use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use watchlog_config::{Config, PathManager, SortOrder};
use watchlog_core::{ErrorClass, NoteStatus, SyncOptions, SyncReport};

/// Per-run settings given on the command line.
#[derive(Debug, Default)]
pub struct SyncOverrides {
    pub ignore_before: Option<String>,
    pub sort: Option<SortOrder>,
    pub output_path: Option<PathBuf>,
}

impl SyncOverrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(ignore_before) = self.ignore_before {
            config.sync.ignore_before = ignore_before;
        }
        if let Some(sort) = self.sort {
            config.output.sort_order = sort;
        }
        if let Some(path) = self.output_path {
            config.output.path = Some(path);
        }
    }
}

pub async fn run_sync(
    paths: &PathManager,
    overrides: SyncOverrides,
    dry_run: bool,
    output: &Output,
) -> Result<ExitCode> {
    tracing::debug!("Sync command started");

    let mut config = match load_config(paths) {
        Ok(config) => config,
        Err(e) => return Ok(output.failure(ErrorClass::Configuration, e.to_string())),
    };
    overrides.apply(&mut config);

    let store = match load_credentials(paths) {
        Ok(store) => store,
        Err(e) => return Ok(output.failure(ErrorClass::Authentication, e.to_string())),
    };

    let orchestrator = build_orchestrator(config, store);
    let ui = SyncUI::new(output.is_human() && !output.is_quiet());
    ui.set_message("Syncing Trakt history...");

    let result = orchestrator.run(&SyncOptions { dry_run }).await;
    ui.finish();

    match result {
        Ok(outcome) => {
            if dry_run && output.is_human() {
                // The rendered note is the payload of a dry run, so quiet does not suppress it
                print!("{}", outcome.content);
            }
            report_success(&outcome.report, dry_run.then_some(outcome.content.as_str()), output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(output.failure(e.class(), e.to_string())),
    }
}

/// One-line human summary of a finished run.
pub fn summary(report: &SyncReport) -> String {
    let action = match report.status {
        NoteStatus::Written => "wrote",
        NoteStatus::Unchanged => "unchanged",
        NoteStatus::DryRun => "dry run for",
    };
    let mut line = format!(
        "Sync completed: {} shows ({} episodes), {} movies, {} rated; {} {} in {:.1}s",
        report.shows,
        report.episodes,
        report.movies,
        report.rated,
        action,
        report.output_path.display(),
        report.duration.as_secs_f64()
    );
    if report.degraded_lookups > 0 {
        line.push_str(&format!(", {} lookups degraded", report.degraded_lookups));
    }
    line
}

fn report_success(report: &SyncReport, content: Option<&str>, output: &Output) {
    match output.format() {
        OutputFormat::Human => output.success(summary(report)),
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let mut value = serde_json::to_value(report).unwrap_or_default();
            if let serde_json::Value::Object(map) = &mut value {
                map.insert("success".to_string(), serde_json::Value::Bool(true));
                if let Some(content) = content {
                    map.insert("content".to_string(), serde_json::Value::String(content.to_string()));
                }
            }
            output.json(&value);
        }
    }
}
