use super::{load_config, prompts, save_config};
use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use watchlog_config::{parse_cutoff, Config, PathManager, SortOrder, TmdbConfig};
use watchlog_core::{DateFormat, ErrorClass};

pub fn run_config(paths: &PathManager, cmd: ConfigCommands, output: &Output) -> Result<ExitCode> {
    match cmd {
        ConfigCommands::Show { full } => show_config(paths, full, output),
        ConfigCommands::Trakt { client_id, client_secret } => configure_trakt(paths, client_id, client_secret, output),
        ConfigCommands::Tmdb { api_key, disable } => configure_tmdb(paths, api_key, disable, output),
        ConfigCommands::Output { path, date_format, sort } => configure_output(paths, path, date_format, sort, output),
        ConfigCommands::Sync { ignore_before, concurrency } => configure_sync(paths, ignore_before, concurrency, output),
    }
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<ExitCode> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("It will be created when you run 'watchlog config trakt'.");
        return Ok(ExitCode::SUCCESS);
    }
    let config = load_config(paths)?;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(ExitCode::SUCCESS);
            }
            println!();
            println!("{}", "Configuration".bright_cyan().bold());
            println!("{}", config_file.display().to_string().bright_black());
            println!();
            println!("{}", config_table(&config, full));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let mut value = serde_json::to_value(&config)?;
            if !full {
                mask_json_secrets(&mut value);
            }
            output.json(&json!({
                "config_file": config_file,
                "config": value,
            }));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn config_table(config: &Config, full: bool) -> Table {
    let secret = |value: &str| if full { value.to_string() } else { mask_string(value) };

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Setting").add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Value").add_attribute(comfy_table::Attribute::Bold),
    ]);

    table.add_row(vec![Cell::new("trakt.client_id"), Cell::new(secret(&config.trakt.client_id))]);
    table.add_row(vec![Cell::new("trakt.client_secret"), Cell::new(secret(&config.trakt.client_secret))]);
    table.add_row(vec![Cell::new("trakt.redirect_uri"), Cell::new(&config.trakt.redirect_uri)]);
    table.add_row(vec![
        Cell::new("tmdb.api_key"),
        Cell::new(match &config.tmdb {
            Some(tmdb) => secret(&tmdb.api_key),
            None => "<not set, posters disabled>".to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("output.path"),
        Cell::new(
            config
                .output
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<not set>".to_string()),
        ),
    ]);
    table.add_row(vec![Cell::new("output.date_format"), Cell::new(&config.output.date_format)]);
    table.add_row(vec![Cell::new("output.sort_order"), Cell::new(config.output.sort_order.as_str())]);
    table.add_row(vec![Cell::new("sync.ignore_before"), Cell::new(&config.sync.ignore_before)]);
    table.add_row(vec![Cell::new("sync.concurrency"), Cell::new(config.sync.concurrency)]);
    if let Some(scheduler) = &config.scheduler {
        table.add_row(vec![Cell::new("scheduler.schedule"), Cell::new(&scheduler.schedule)]);
        table.add_row(vec![Cell::new("scheduler.run_on_startup"), Cell::new(scheduler.run_on_startup)]);
    }
    table
}

fn configure_trakt(
    paths: &PathManager,
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    output: &Output,
) -> Result<ExitCode> {
    let mut config = load_config(paths)?;

    let client_id = match client_id_arg {
        Some(id) => id,
        None => {
            print_section_header("Trakt API Setup", output);
            print_instruction_list(
                &[
                    "Login to Trakt and open your API apps page: https://trakt.tv/oauth/applications",
                    "Create a new API application named 'watchlog'",
                    "Use 'urn:ietf:wg:oauth:2.0:oob' as the Redirect URI",
                ],
                output,
            );
            output.println("");
            let current = Some(config.trakt.client_id.as_str()).filter(|id| !id.is_empty());
            loop {
                let input = prompts::prompt_string("Trakt Client ID", current)?;
                match validate_client_id(&input) {
                    Ok(()) => break input,
                    Err(e) => output.error(format!("Validation error: {}", e)),
                }
            }
        }
    };
    if let Err(e) = validate_client_id(&client_id) {
        return Ok(output.failure(ErrorClass::Configuration, e));
    }

    let client_secret = match client_secret_arg {
        Some(secret) => secret,
        None => {
            let current = Some(config.trakt.client_secret.as_str()).filter(|s| !s.is_empty());
            prompts::prompt_secret("Trakt Client Secret", current)?
        }
    };
    if client_secret.trim().is_empty() {
        return Ok(output.failure(ErrorClass::Configuration, "Client Secret cannot be empty"));
    }

    config.trakt.client_id = client_id.trim().to_string();
    config.trakt.client_secret = client_secret.trim().to_string();
    save_config(paths, &config)?;

    output.success("Trakt application saved. Run 'watchlog connect' to authorize access.");
    Ok(ExitCode::SUCCESS)
}

fn configure_tmdb(paths: &PathManager, api_key_arg: Option<String>, disable: bool, output: &Output) -> Result<ExitCode> {
    let mut config = load_config(paths)?;

    if disable {
        config.tmdb = None;
        save_config(paths, &config)?;
        output.success("TMDB key removed. Posters will not be looked up.");
        return Ok(ExitCode::SUCCESS);
    }

    let api_key = match api_key_arg {
        Some(key) => key,
        None => {
            print_section_header("TMDB Posters", output);
            output.println("Create an API key at https://www.themoviedb.org/settings/api");
            output.println("");
            let current = config.tmdb.as_ref().map(|t| t.api_key.as_str());
            prompts::prompt_secret("TMDB API key", current)?
        }
    };
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Ok(output.failure(ErrorClass::Configuration, "TMDB API key cannot be empty"));
    }

    config.tmdb = Some(TmdbConfig { api_key });
    save_config(paths, &config)?;
    output.success("TMDB key saved. Posters will be included in the note.");
    Ok(ExitCode::SUCCESS)
}

fn configure_output(
    paths: &PathManager,
    path_arg: Option<PathBuf>,
    date_format_arg: Option<String>,
    sort_arg: Option<SortOrder>,
    output: &Output,
) -> Result<ExitCode> {
    let mut config = load_config(paths)?;
    let interactive = path_arg.is_none() && date_format_arg.is_none() && sort_arg.is_none();

    let (path, date_format, sort) = if interactive {
        print_section_header("Note Output", output);
        let default_path = config
            .output
            .path
            .clone()
            .unwrap_or_else(|| paths.default_output_file());
        let path = prompts::prompt_string("Note file", Some(&default_path.display().to_string()))?;
        let date_format = loop {
            let input = prompts::prompt_string("Date format", Some(&config.output.date_format))?;
            match DateFormat::parse(&input) {
                Ok(_) => break input,
                Err(e) => output.error(e),
            }
        };
        let sort = loop {
            let input = prompts::prompt_string(
                "Show order (chronological/alphabetical)",
                Some(config.output.sort_order.as_str()),
            )?;
            match input.parse::<SortOrder>() {
                Ok(sort) => break sort,
                Err(e) => output.error(e),
            }
        };
        (Some(PathBuf::from(path)), Some(date_format), Some(sort))
    } else {
        (path_arg, date_format_arg, sort_arg)
    };

    if let Some(date_format) = date_format {
        if let Err(e) = DateFormat::parse(&date_format) {
            return Ok(output.failure(ErrorClass::Configuration, e));
        }
        config.output.date_format = date_format;
    }
    if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
        config.output.path = Some(path);
    }
    if let Some(sort) = sort {
        config.output.sort_order = sort;
    }

    save_config(paths, &config)?;
    output.success("Output settings saved.");
    Ok(ExitCode::SUCCESS)
}

fn configure_sync(
    paths: &PathManager,
    ignore_before_arg: Option<String>,
    concurrency_arg: Option<usize>,
    output: &Output,
) -> Result<ExitCode> {
    let mut config = load_config(paths)?;
    let interactive = ignore_before_arg.is_none() && concurrency_arg.is_none();

    let (ignore_before, concurrency) = if interactive {
        print_section_header("Sync Options", output);
        let ignore_before = loop {
            let input = prompts::prompt_string("Ignore entries watched before (YYYY-MM-DD)", Some(&config.sync.ignore_before))?;
            match parse_cutoff(&input) {
                Ok(_) => break input,
                Err(e) => output.error(e.to_string()),
            }
        };
        let concurrency = prompts::prompt_number("Concurrent lookups", config.sync.concurrency)?;
        (Some(ignore_before), Some(concurrency))
    } else {
        (ignore_before_arg, concurrency_arg)
    };

    if let Some(ignore_before) = ignore_before {
        if let Err(e) = parse_cutoff(&ignore_before) {
            return Ok(output.failure(ErrorClass::Configuration, e.to_string()));
        }
        config.sync.ignore_before = ignore_before.trim().to_string();
    }
    if let Some(concurrency) = concurrency {
        if concurrency == 0 {
            return Ok(output.failure(ErrorClass::Configuration, "Concurrency must be at least 1"));
        }
        config.sync.concurrency = concurrency;
    }

    save_config(paths, &config)?;
    output.success("Sync options saved.");
    Ok(ExitCode::SUCCESS)
}

fn mask_string(s: &str) -> String {
    if s.is_empty() || s == "YOUR_CLIENT_ID" || s == "YOUR_CLIENT_SECRET" {
        return "<not set>".to_string();
    }
    if s.len() <= 4 {
        return "*".repeat(s.len());
    }
    format!("{}***{}", &s[..2], &s[s.len() - 2..])
}

fn mask_json_secrets(value: &mut serde_json::Value) {
    let targets = [("trakt", "client_id"), ("trakt", "client_secret"), ("tmdb", "api_key")];
    for (section, key) in targets {
        if let Some(serde_json::Value::String(secret)) = value.get_mut(section).and_then(|s| s.get_mut(key)) {
            *secret = mask_string(secret);
        }
    }
}

/// Validates Trakt Client ID format
fn validate_client_id(input: &str) -> Result<(), &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Client ID cannot be empty");
    }
    if input.len() < 10 {
        return Err("Client ID seems too short. Please verify it's correct.");
    }
    Ok(())
}

fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.println(format!("  {}. {}", idx + 1, item));
    }
}
