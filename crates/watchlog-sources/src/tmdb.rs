use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use watchlog_config::TmdbConfig;
use watchlog_models::MediaKind;

use crate::error::SourceError;
use crate::traits::PosterSource;

const API_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w342";

pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Deserialize)]
struct TmdbDetails {
    poster_path: Option<String>,
}

fn endpoint_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "movie",
        MediaKind::Show => "tv",
    }
}

fn poster_url_from_path(path: Option<String>) -> Option<String> {
    path.filter(|p| !p.trim().is_empty())
        .map(|p| format!("{}{}", IMAGE_BASE, p))
}

#[async_trait]
impl PosterSource for TmdbClient {
    async fn poster_url(&self, kind: MediaKind, tmdb_id: u32) -> Result<Option<String>, SourceError> {
        let endpoint = format!("/{}/{}", endpoint_for(kind), tmdb_id);
        let url = format!("{}{}?api_key={}", API_BASE, endpoint, self.config.api_key);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        // A subject TMDB does not know has no poster; it is not a lookup failure.
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("TMDB has no {} {}", kind.as_str(), tmdb_id);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let details: TmdbDetails =
            serde_json::from_str(&body).map_err(|source| SourceError::Decode { endpoint, source })?;
        Ok(poster_url_from_path(details.poster_path))
    }
}
