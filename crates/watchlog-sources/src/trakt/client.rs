use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use watchlog_config::{TokenRecord, TraktConfig};
use watchlog_models::{EpisodeIdEntry, Rating, WatchedMovie, WatchedShow};

use crate::error::SourceError;
use crate::traits::{HistorySource, TokenProvider};
use crate::trakt::{api, auth};

#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    config: TraktConfig,
}

impl TraktClient {
    pub fn new(config: TraktConfig) -> Self {
        Self {
            client: Arc::new(auth::create_trakt_client()),
            config,
        }
    }
}

#[async_trait]
impl HistorySource for TraktClient {
    fn source_name(&self) -> &str {
        "trakt"
    }

    async fn get_ratings(&self, access_token: &str) -> Result<Vec<Rating>, SourceError> {
        api::get_ratings(&self.client, &self.config.client_id, access_token).await
    }

    async fn get_watched_shows(&self, access_token: &str) -> Result<Vec<WatchedShow>, SourceError> {
        api::get_watched_shows(&self.client, &self.config.client_id, access_token).await
    }

    async fn get_watched_movies(&self, access_token: &str) -> Result<Vec<WatchedMovie>, SourceError> {
        api::get_watched_movies(&self.client, &self.config.client_id, access_token).await
    }

    async fn get_episode_ids(
        &self,
        access_token: &str,
        show: &str,
    ) -> Result<Vec<EpisodeIdEntry>, SourceError> {
        api::get_episode_ids(&self.client, &self.config.client_id, access_token, show).await
    }
}

#[async_trait]
impl TokenProvider for TraktClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, SourceError> {
        auth::exchange_code(&self.client, &self.config, code.trim()).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, SourceError> {
        auth::refresh_access_token(&self.client, &self.config, refresh_token).await
    }
}
