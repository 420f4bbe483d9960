use super::{load_config, load_credentials, prompts, token_manager};
use crate::output::{Output, OutputFormat};
use chrono::{DateTime, Local, Utc};
use color_eyre::Result;
use comfy_table::{Cell, Color, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::process::ExitCode;
use watchlog_config::{Config, PathManager};
use watchlog_core::{ErrorClass, TokenStatus};
use watchlog_sources::authorize_url;

pub async fn run_connect(paths: &PathManager, code: Option<String>, output: &Output) -> Result<ExitCode> {
    let config = load_config(paths)?;
    if !config.is_trakt_configured() {
        return Ok(output.failure(
            ErrorClass::Configuration,
            "Trakt client credentials are not set. Run `watchlog config trakt` first",
        ));
    }

    let mut manager = token_manager(&config, load_credentials(paths)?);

    let code = match code {
        Some(code) => code,
        None => {
            if matches!(manager.status(Utc::now()), TokenStatus::Valid { .. })
                && !prompts::prompt_yes_no("Already connected to Trakt. Connect again?", Some(false))?
            {
                output.info("Keeping the existing connection.");
                return Ok(ExitCode::SUCCESS);
            }
            output.println("");
            output.println(format!("{}", "Connect to Trakt".bold().bright_cyan()));
            output.println("  1. Open this URL in a browser and approve watchlog:");
            output.println(format!(
                "     {}",
                authorize_url(&config.trakt.client_id, &config.trakt.redirect_uri).bright_blue()
            ));
            output.println("  2. Paste the code Trakt shows you below.");
            output.println("");
            prompts::prompt_string("Authorization code", None)?
        }
    };

    match manager.connect(&code).await {
        Ok(token) => {
            match output.format() {
                OutputFormat::Human => output.success(format!(
                    "Connected to Trakt. Token expires {}",
                    display_time(token.expires_at)
                )),
                OutputFormat::Json | OutputFormat::JsonPretty => output.json(&json!({
                    "success": true,
                    "connected": true,
                    "expires_at": token.expires_at.to_rfc3339(),
                })),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(output.failure(e.class(), e.to_string())),
    }
}

pub fn run_disconnect(paths: &PathManager, output: &Output) -> Result<ExitCode> {
    let config = load_config(paths)?;
    let mut manager = token_manager(&config, load_credentials(paths)?);
    if manager.status(Utc::now()) == TokenStatus::Missing {
        output.info("Not connected to Trakt.");
        return Ok(ExitCode::SUCCESS);
    }
    match manager.disconnect() {
        Ok(()) => {
            output.success("Disconnected from Trakt. Stored token removed.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(output.failure(e.class(), e.to_string())),
    }
}

pub fn run_status(paths: &PathManager, output: &Output) -> Result<ExitCode> {
    let config = load_config(paths)?;
    let status = token_manager(&config, load_credentials(paths)?).status(Utc::now());
    let validation = config.validate().err().map(|e| e.to_string());

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(ExitCode::SUCCESS);
            }
            println!("{}", status_table(&config, &status, validation.as_deref()));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let (state, expires_at) = match &status {
                TokenStatus::Missing => ("missing", None),
                TokenStatus::Valid { expires_at } => ("valid", Some(expires_at.to_rfc3339())),
                TokenStatus::Expired { expires_at } => ("expired", Some(expires_at.to_rfc3339())),
            };
            output.json(&json!({
                "config_file": paths.config_file(),
                "trakt_configured": config.is_trakt_configured(),
                "token": state,
                "token_expires_at": expires_at,
                "posters": config.tmdb.is_some(),
                "output_path": config.output.path,
                "ready": validation.is_none(),
                "problem": validation,
            }));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn status_table(config: &Config, status: &TokenStatus, problem: Option<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("watchlog status").fg(Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Trakt application"),
        if config.is_trakt_configured() {
            Cell::new("configured").fg(Color::Green)
        } else {
            Cell::new("not configured").fg(Color::Red)
        },
    ]);
    table.add_row(vec![Cell::new("Connection"), token_cell(status)]);
    table.add_row(vec![
        Cell::new("Posters (TMDB)"),
        Cell::new(if config.tmdb.is_some() { "enabled" } else { "disabled" }),
    ]);
    table.add_row(vec![
        Cell::new("Note file"),
        Cell::new(
            config
                .output
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<not set>".to_string()),
        ),
    ]);
    table.add_row(vec![Cell::new("Ignore before"), Cell::new(&config.sync.ignore_before)]);
    if let Some(scheduler) = &config.scheduler {
        table.add_row(vec![Cell::new("Schedule"), Cell::new(&scheduler.schedule)]);
    }
    table.add_row(vec![
        Cell::new("Ready to sync"),
        match problem {
            None => Cell::new("yes").fg(Color::Green),
            Some(problem) => Cell::new(format!("no: {}", problem)).fg(Color::Yellow),
        },
    ]);
    table
}

fn token_cell(status: &TokenStatus) -> Cell {
    match status {
        TokenStatus::Missing => Cell::new("not connected (run `watchlog connect`)").fg(Color::Red),
        TokenStatus::Valid { expires_at } => {
            Cell::new(format!("connected, token valid until {}", display_time(*expires_at))).fg(Color::Green)
        }
        TokenStatus::Expired { expires_at } => Cell::new(format!(
            "connected, token expired {} (refreshed on next sync)",
            display_time(*expires_at)
        ))
        .fg(Color::Yellow),
    }
}

fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use watchlog_config::{CredentialStore, TokenRecord};

    #[test]
    fn test_status_table_lists_problems() {
        let table = status_table(&Config::default(), &TokenStatus::Missing, Some("Trakt client_id is not configured"));
        let rendered = table.to_string();
        assert!(rendered.contains("not configured"));
        assert!(rendered.contains("not connected"));
        assert!(rendered.contains("no: Trakt client_id is not configured"));
    }

    #[tokio::test]
    async fn test_connect_requires_trakt_credentials() {
        let dir = TempDir::new().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let output = Output::new(OutputFormat::Json, true);

        let code = run_connect(&paths, Some("CODE".to_string()), &output).await.unwrap();
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn test_disconnect_removes_stored_token() {
        let dir = TempDir::new().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let mut store = CredentialStore::new(paths.credentials_file());
        store.set_trakt_token(&TokenRecord {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        });
        store.save().unwrap();

        let output = Output::new(OutputFormat::Json, true);
        assert_eq!(run_disconnect(&paths, &output).unwrap(), ExitCode::SUCCESS);

        let reloaded = CredentialStore::open(paths.credentials_file()).unwrap();
        assert!(!reloaded.has_trakt_token());
    }
}
