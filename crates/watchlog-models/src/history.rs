use crate::media::MediaInfo;
use crate::rating::RatingValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a subject has no poster or the lookup was skipped.
pub const PLACEHOLDER_POSTER_URL: &str = "https://placehold.co/200x300?text=No+Poster";
/// Shown when the poster lookup failed.
pub const UNAVAILABLE_POSTER_URL: &str = "https://placehold.co/200x300?text=Unavailable";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "url", rename_all = "lowercase")]
pub enum Poster {
    Found(String),
    Absent,
    Failed,
}

impl Poster {
    pub fn url(&self) -> &str {
        match self {
            Poster::Found(url) => url,
            Poster::Absent => PLACEHOLDER_POSTER_URL,
            Poster::Failed => UNAVAILABLE_POSTER_URL,
        }
    }
}

/// The reconciled, filtered, rating-annotated history consumed by the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WatchLog {
    pub shows: Vec<NormalizedShow>,
    pub movies: Vec<NormalizedMovie>,
}

impl WatchLog {
    pub fn episode_count(&self) -> usize {
        self.shows
            .iter()
            .flat_map(|show| show.seasons.iter())
            .map(|season| season.episodes.len())
            .sum()
    }

    pub fn season_count(&self) -> usize {
        self.shows.iter().map(|show| show.seasons.len()).sum()
    }

    /// Number of nodes (shows, seasons, episodes, movies) carrying a rating.
    pub fn rated_count(&self) -> usize {
        let mut count = 0;
        for show in &self.shows {
            count += show.rating.is_some() as usize;
            for season in &show.seasons {
                count += season.rating.is_some() as usize;
                count += season.episodes.iter().filter(|e| e.rating.is_some()).count();
            }
        }
        count + self.movies.iter().filter(|m| m.rating.is_some()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedShow {
    pub show: MediaInfo,
    pub rating: Option<RatingValue>,
    pub poster: Poster,
    pub seasons: Vec<NormalizedSeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedSeason {
    pub number: u32,
    pub rating: Option<RatingValue>,
    pub episodes: Vec<NormalizedEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedEpisode {
    pub number: u32,
    pub plays: u32,
    pub watched_at: DateTime<Utc>,
    pub rating: Option<RatingValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedMovie {
    pub movie: MediaInfo,
    pub plays: u32,
    pub watched_at: DateTime<Utc>,
    pub rating: Option<RatingValue>,
    pub poster: Poster,
}
