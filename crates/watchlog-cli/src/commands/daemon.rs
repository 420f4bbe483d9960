use super::{build_orchestrator, load_config, load_credentials};
use crate::output::Output;
use color_eyre::Result;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use watchlog_config::{default_scheduler_config, PathManager, SchedulerConfig};
use watchlog_core::{ErrorClass, SyncError, SyncOptions, SyncOrchestrator};

pub struct Scheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<SyncOrchestrator>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(orchestrator: SyncOrchestrator, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            orchestrator: Arc::new(orchestrator),
            config,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial sync on startup");
            run_scheduled_sync(&self.orchestrator, "startup").await;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let job = Job::new_async(self.config.schedule.as_str(), move |_uuid, _scheduler| {
            let orchestrator = Arc::clone(&orchestrator);
            Box::pin(async move {
                run_scheduled_sync(&orchestrator, "scheduled").await;
            })
        })?;
        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            schedule = %self.config.schedule,
            "Scheduler started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        info!(operation = "scheduler_stopped", "Scheduler stopped");
        Ok(())
    }
}

/// Run one sync and log its outcome. Failures never stop the daemon.
async fn run_scheduled_sync(orchestrator: &SyncOrchestrator, trigger: &'static str) {
    info!(operation = "scheduled_sync_start", trigger, "Starting sync");
    match orchestrator.run(&SyncOptions::default()).await {
        Ok(outcome) => {
            info!(
                operation = "scheduled_sync_complete",
                trigger,
                status = outcome.report.status.as_str(),
                shows = outcome.report.shows,
                movies = outcome.report.movies,
                degraded_lookups = outcome.report.degraded_lookups,
                duration_ms = outcome.report.duration.as_millis() as u64,
                "Sync completed successfully"
            );
        }
        Err(SyncError::AlreadyRunning) => {
            warn!(
                operation = "scheduled_sync_skipped",
                trigger,
                "Previous sync is still running, skipping this run"
            );
        }
        Err(e) => {
            error!(
                operation = "scheduled_sync_error",
                trigger,
                class = e.class().as_str(),
                error = %e,
                "Sync failed"
            );
        }
    }
}

fn effective_scheduler_config(
    configured: Option<SchedulerConfig>,
    schedule_override: Option<String>,
    no_startup_sync: bool,
) -> SchedulerConfig {
    let mut config = configured.unwrap_or_else(default_scheduler_config);
    if let Some(schedule) = schedule_override {
        config.schedule = schedule;
    }
    if no_startup_sync {
        config.run_on_startup = false;
    }
    config
}

pub async fn run_daemon(
    paths: &PathManager,
    schedule_override: Option<String>,
    no_startup_sync: bool,
    output: &Output,
) -> Result<ExitCode> {
    let config = match load_config(paths) {
        Ok(config) => config,
        Err(e) => return Ok(output.failure(ErrorClass::Configuration, e.to_string())),
    };
    // Fail at startup rather than on every tick
    if let Err(e) = config.validate() {
        return Ok(output.failure(ErrorClass::Configuration, e.to_string()));
    }

    let scheduler_config = effective_scheduler_config(config.scheduler.clone(), schedule_override, no_startup_sync);
    let store = match load_credentials(paths) {
        Ok(store) => store,
        Err(e) => return Ok(output.failure(ErrorClass::Authentication, e.to_string())),
    };
    let orchestrator = build_orchestrator(config, store);

    output.info(format!(
        "Daemon running with schedule '{}'. Logs: {}",
        scheduler_config.schedule,
        paths.daemon_log_file().display()
    ));

    let mut scheduler = Scheduler::new(orchestrator, scheduler_config)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create scheduler: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to start scheduler: {}", e))?;

    tokio::signal::ctrl_c().await?;
    info!(operation = "daemon_shutdown", "Shutdown signal received");
    scheduler.shutdown().await?;

    output.success("Daemon stopped.");
    Ok(ExitCode::SUCCESS)
}
