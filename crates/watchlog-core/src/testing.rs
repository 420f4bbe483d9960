//! In-memory sources used by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use watchlog_config::TokenRecord;
use watchlog_models::{
    EpisodeIdEntry, MediaIds, MediaInfo, MediaKind, Rating, WatchedEpisode, WatchedMovie,
    WatchedSeason, WatchedShow,
};
use watchlog_sources::{HistorySource, PosterSource, SourceError, TokenProvider};

pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 20, 0, 0).unwrap()
}

pub fn show_info(trakt: u64, title: &str, slug: &str) -> MediaInfo {
    MediaInfo {
        title: title.to_string(),
        year: Some(1999),
        ids: MediaIds {
            trakt: Some(trakt),
            slug: Some(slug.to_string()),
            ..MediaIds::default()
        },
    }
}

pub fn movie_info(trakt: u64, title: &str, slug: &str, tmdb: Option<u32>) -> MediaInfo {
    MediaInfo {
        title: title.to_string(),
        year: Some(2021),
        ids: MediaIds {
            trakt: Some(trakt),
            slug: Some(slug.to_string()),
            tmdb,
            ..MediaIds::default()
        },
    }
}

/// Build a watched show from `(season, [(episode, watched_at)])` tuples.
pub fn watched_show(show: MediaInfo, seasons: Vec<(u32, Vec<(u32, DateTime<Utc>)>)>) -> WatchedShow {
    WatchedShow {
        show,
        plays: 1,
        last_watched_at: None,
        seasons: seasons
            .into_iter()
            .map(|(number, episodes)| WatchedSeason {
                number,
                episodes: episodes
                    .into_iter()
                    .map(|(number, last_watched_at)| WatchedEpisode {
                        number,
                        plays: 1,
                        last_watched_at,
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn watched_movie(movie: MediaInfo, plays: u32, last_watched_at: DateTime<Utc>) -> WatchedMovie {
    WatchedMovie {
        movie,
        plays,
        last_watched_at,
    }
}

fn unavailable(endpoint: &str) -> SourceError {
    SourceError::Http {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "Service Unavailable".to_string(),
    }
}

#[derive(Default)]
pub struct FakeHistory {
    ratings: Vec<Rating>,
    shows: Vec<WatchedShow>,
    movies: Vec<WatchedMovie>,
    episode_ids: HashMap<String, Vec<EpisodeIdEntry>>,
    fail_episode_ids: bool,
    fail_movies: bool,
    bulk_calls: AtomicUsize,
    episode_id_calls: AtomicUsize,
    tokens_seen: std::sync::Mutex<Vec<String>>,
}

impl FakeHistory {
    pub fn with_ratings(mut self, ratings: Vec<Rating>) -> Self {
        self.ratings = ratings;
        self
    }

    pub fn with_shows(mut self, shows: Vec<WatchedShow>) -> Self {
        self.shows = shows;
        self
    }

    pub fn with_movies(mut self, movies: Vec<WatchedMovie>) -> Self {
        self.movies = movies;
        self
    }

    pub fn with_episode_ids(mut self, show: &str, entries: Vec<EpisodeIdEntry>) -> Self {
        self.episode_ids.insert(show.to_string(), entries);
        self
    }

    pub fn failing_episode_ids(mut self) -> Self {
        self.fail_episode_ids = true;
        self
    }

    pub fn failing_movies(mut self) -> Self {
        self.fail_movies = true;
        self
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn episode_id_calls(&self) -> usize {
        self.episode_id_calls.load(Ordering::SeqCst)
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    fn record(&self, access_token: &str) {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().unwrap().push(access_token.to_string());
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    fn source_name(&self) -> &str {
        "fake"
    }

    async fn get_ratings(&self, access_token: &str) -> Result<Vec<Rating>, SourceError> {
        self.record(access_token);
        Ok(self.ratings.clone())
    }

    async fn get_watched_shows(&self, access_token: &str) -> Result<Vec<WatchedShow>, SourceError> {
        self.record(access_token);
        Ok(self.shows.clone())
    }

    async fn get_watched_movies(&self, access_token: &str) -> Result<Vec<WatchedMovie>, SourceError> {
        self.record(access_token);
        if self.fail_movies {
            return Err(unavailable("/sync/watched/movies"));
        }
        Ok(self.movies.clone())
    }

    async fn get_episode_ids(
        &self,
        _access_token: &str,
        show: &str,
    ) -> Result<Vec<EpisodeIdEntry>, SourceError> {
        self.episode_id_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_episode_ids {
            return Err(unavailable("/shows/seasons"));
        }
        Ok(self.episode_ids.get(show).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakePosters {
    posters: HashMap<u32, String>,
    failing: HashSet<u32>,
    delay: Option<std::time::Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakePosters {
    pub fn with_poster(mut self, tmdb_id: u32, url: &str) -> Self {
        self.posters.insert(tmdb_id, url.to_string());
        self
    }

    pub fn failing_for(mut self, tmdb_id: u32) -> Self {
        self.failing.insert(tmdb_id);
        self
    }

    /// Hold every lookup open for `millis` so overlapping calls can be observed.
    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(std::time::Duration::from_millis(millis));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of lookups that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PosterSource for FakePosters {
    async fn poster_url(&self, _kind: MediaKind, tmdb_id: u32) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&tmdb_id) {
            return Err(unavailable("/movie"));
        }
        Ok(self.posters.get(&tmdb_id).cloned())
    }
}

#[derive(Default)]
pub struct FakeTokens {
    fail: bool,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
}

impl FakeTokens {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, access_token: &str) -> Result<TokenRecord, SourceError> {
        if self.fail {
            return Err(SourceError::Http {
                endpoint: "/oauth/token".to_string(),
                status: 401,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(TokenRecord {
            access_token: access_token.to_string(),
            refresh_token: format!("{}-refresh", access_token),
            expires_at: Utc::now() + Duration::days(90),
        })
    }
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn exchange_code(&self, _code: &str) -> Result<TokenRecord, SourceError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.issue("exchanged")
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenRecord, SourceError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.issue("refreshed")
    }
}
