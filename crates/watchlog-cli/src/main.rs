use clap::{ArgAction, Parser, Subcommand};
use commands::{auth, config, daemon, sync};
use std::path::PathBuf;
use std::process::ExitCode;
use watchlog_config::{PathManager, SortOrder};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchlog")]
#[command(about = "watchlog - Keep a Markdown note of everything you watched on Trakt")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch Trakt history and rewrite the note (one-time sync)
    #[command(long_about = "Fetch ratings and watched history from Trakt, join them, and overwrite the configured Markdown note. Flags override the configuration file for this run only.")]
    Sync {
        /// Render the note and print it instead of writing the file
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Ignore entries watched before this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        ignore_before: Option<String>,

        /// Show ordering: chronological or alphabetical
        #[arg(long, value_name = "ORDER")]
        sort: Option<SortOrder>,

        /// Write the note to this path instead of the configured one
        #[arg(long, value_name = "PATH")]
        output_path: Option<PathBuf>,
    },
    /// Connect to Trakt (OAuth authorization code flow)
    #[command(long_about = "Print the Trakt authorization URL, then exchange the code shown by Trakt for an access token. The token is stored in the credentials file and refreshed automatically when it expires.")]
    Connect {
        /// Authorization code (if not provided, will prompt)
        #[arg(long)]
        code: Option<String>,
    },
    /// Forget the stored Trakt token
    Disconnect,
    /// Show connection state and effective settings
    Status,
    /// Configure credentials and settings
    #[command(long_about = "View or modify the configuration file. Running without a subcommand shows the current configuration.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Run as daemon with internal scheduler
    #[command(long_about = "Run watchlog in the foreground and sync on the configured cron schedule. An initial sync is performed on startup unless --no-startup-sync is specified.")]
    Daemon {
        /// Cron schedule expression, seconds first (e.g., '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip initial sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure the Trakt API application
    #[command(long_about = "Configure Trakt API credentials. You'll need to create a Trakt API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// Configure TMDB poster lookups
    Tmdb {
        /// TMDB API key (if not provided, will prompt)
        #[arg(long)]
        api_key: Option<String>,

        /// Remove the TMDB key and stop looking up posters
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "api_key")]
        disable: bool,
    },

    /// Configure the note file and its formatting
    Output {
        /// Note file path
        #[arg(long)]
        path: Option<PathBuf>,

        /// Date format, Moment-style (YYYY-MM-DD) or strftime (%Y-%m-%d)
        #[arg(long)]
        date_format: Option<String>,

        /// Show ordering: chronological or alphabetical
        #[arg(long)]
        sort: Option<SortOrder>,
    },

    /// Configure the history cutoff and lookup concurrency
    Sync {
        /// Ignore entries watched before this date (YYYY-MM-DD)
        #[arg(long)]
        ignore_before: Option<String>,

        /// Maximum concurrent poster and episode lookups
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let paths = PathManager::default();

    // The daemon logs to a rotated file, everything else to stderr
    let log_file = matches!(cli.command, Commands::Daemon { .. }).then(|| paths.daemon_log_file());
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync {
            dry_run,
            ignore_before,
            sort,
            output_path,
        } => {
            let overrides = sync::SyncOverrides {
                ignore_before,
                sort,
                output_path,
            };
            sync::run_sync(&paths, overrides, dry_run, &output).await
        }
        Commands::Connect { code } => auth::run_connect(&paths, code, &output).await,
        Commands::Disconnect => auth::run_disconnect(&paths, &output),
        Commands::Status => auth::run_status(&paths, &output),
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
            config::run_config(&paths, cmd, &output)
        }
        Commands::Daemon {
            schedule,
            no_startup_sync,
        } => daemon::run_daemon(&paths, schedule, no_startup_sync, &output).await,
    }
}
