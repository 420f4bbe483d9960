use async_trait::async_trait;
use watchlog_config::TokenRecord;
use watchlog_models::{EpisodeIdEntry, MediaKind, Rating, WatchedMovie, WatchedShow};

use crate::error::SourceError;

/// Bulk history collections plus the per-show episode listing.
///
/// All calls are authenticated with a bearer token obtained from a
/// [`TokenProvider`]; implementations never refresh on their own.
#[async_trait]
pub trait HistorySource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn get_ratings(&self, access_token: &str) -> Result<Vec<Rating>, SourceError>;
    async fn get_watched_shows(&self, access_token: &str) -> Result<Vec<WatchedShow>, SourceError>;
    async fn get_watched_movies(&self, access_token: &str) -> Result<Vec<WatchedMovie>, SourceError>;

    /// Every episode of a show with its trakt id, addressed by slug or numeric id.
    async fn get_episode_ids(
        &self,
        access_token: &str,
        show: &str,
    ) -> Result<Vec<EpisodeIdEntry>, SourceError>;
}

/// OAuth code exchange and refresh.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, SourceError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, SourceError>;
}

/// Poster artwork lookup by TMDB id. `Ok(None)` means the subject has no poster.
#[async_trait]
pub trait PosterSource: Send + Sync {
    async fn poster_url(&self, kind: MediaKind, tmdb_id: u32) -> Result<Option<String>, SourceError>;
}
