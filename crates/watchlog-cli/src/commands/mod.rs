pub mod auth;
pub mod config;
pub mod daemon;
pub mod prompts;
pub mod sync;
pub mod sync_ui;

use color_eyre::Result;
use std::sync::Arc;
use watchlog_config::{Config, CredentialStore, PathManager};
use watchlog_core::{SyncOrchestrator, TokenManager};
use watchlog_sources::{PosterSource, TmdbClient, TraktClient};

/// Load the config file, falling back to defaults when it does not exist yet.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        tracing::debug!("No config file at {}, using defaults", config_file.display());
        return Ok(Config::default());
    }
    Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

pub fn save_config(paths: &PathManager, config: &Config) -> Result<()> {
    paths
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    let config_file = paths.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let credentials_file = paths.credentials_file();
    CredentialStore::open(credentials_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))
}

pub fn token_manager(config: &Config, store: CredentialStore) -> TokenManager {
    TokenManager::new(store, Arc::new(TraktClient::new(config.trakt.clone())))
}

/// Wire the Trakt client (history and tokens) and the optional TMDB client into an orchestrator.
pub fn build_orchestrator(config: Config, store: CredentialStore) -> SyncOrchestrator {
    let trakt = Arc::new(TraktClient::new(config.trakt.clone()));
    let posters = config
        .tmdb
        .clone()
        .map(|tmdb| Arc::new(TmdbClient::new(tmdb)) as Arc<dyn PosterSource>);
    let tokens = TokenManager::new(store, trakt.clone());
    SyncOrchestrator::new(config, trakt, posters, tokens)
}
