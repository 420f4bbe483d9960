use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use watchlog_models::{
    MediaKind, NormalizedEpisode, NormalizedMovie, NormalizedSeason, NormalizedShow, WatchLog,
    WatchedMovie, WatchedShow,
};

use crate::keys::{movie_key, season_key, show_key, CompositeKey};
use crate::metadata::ResolvedMetadata;
use crate::rating_index::RatingIndex;

/// Watched history with the cutoff applied and keyless records removed.
#[derive(Debug, Default)]
pub struct FilteredHistory {
    pub shows: Vec<WatchedShow>,
    pub movies: Vec<WatchedMovie>,
    /// Shows or movies dropped because they had no trakt id.
    pub skipped_keyless: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Ratings whose subject never appeared as a node in the tree.
    pub unattached_ratings: usize,
}

/// Drop everything watched before `cutoff` (inclusive boundary: `>= cutoff` is kept).
///
/// Seasons left without episodes and shows left without seasons are removed.
/// Movies sharing a key are merged: the latest watch wins and plays take the maximum.
pub fn apply_cutoff(
    shows: Vec<WatchedShow>,
    movies: Vec<WatchedMovie>,
    cutoff: DateTime<Utc>,
) -> FilteredHistory {
    let mut filtered = FilteredHistory::default();
    let mut dropped_episodes = 0;

    for mut show in shows {
        if show_key(&show.show).is_none() {
            debug!("Skipping watched show without trakt id: {}", show.show.title);
            filtered.skipped_keyless += 1;
            continue;
        }
        for season in &mut show.seasons {
            let before = season.episodes.len();
            season.episodes.retain(|episode| episode.last_watched_at >= cutoff);
            dropped_episodes += before - season.episodes.len();
        }
        show.seasons.retain(|season| !season.episodes.is_empty());
        if !show.seasons.is_empty() {
            filtered.shows.push(show);
        }
    }

    let mut movie_slots: HashMap<CompositeKey, usize> = HashMap::new();
    let mut dropped_movies = 0;
    for movie in movies {
        let Some(key) = movie_key(&movie.movie) else {
            debug!("Skipping watched movie without trakt id: {}", movie.movie.title);
            filtered.skipped_keyless += 1;
            continue;
        };
        if movie.last_watched_at < cutoff {
            dropped_movies += 1;
            continue;
        }
        match movie_slots.get(&key) {
            Some(&slot) => {
                let existing = &mut filtered.movies[slot];
                let plays = existing.plays.max(movie.plays);
                if movie.last_watched_at > existing.last_watched_at {
                    let mut newer = movie;
                    newer.movie.ids.merge(&existing.movie.ids);
                    *existing = newer;
                } else {
                    existing.movie.ids.merge(&movie.movie.ids);
                }
                existing.plays = plays;
            }
            None => {
                movie_slots.insert(key, filtered.movies.len());
                filtered.movies.push(movie);
            }
        }
    }

    debug!(
        "Applied cutoff {}: shows={}, movies={}, dropped_episodes={}, dropped_movies={}, keyless={}",
        cutoff,
        filtered.shows.len(),
        filtered.movies.len(),
        dropped_episodes,
        dropped_movies,
        filtered.skipped_keyless
    );
    filtered
}

/// Join the filtered history against ratings and resolved metadata.
///
/// Ratings only annotate nodes that exist; a rating for something not in the
/// filtered history is counted as unattached and otherwise ignored.
pub fn build_tree(
    history: FilteredHistory,
    index: &RatingIndex,
    metadata: &ResolvedMetadata,
) -> (WatchLog, ReconcileStats) {
    let mut attached: HashSet<CompositeKey> = HashSet::new();
    let mut attach = |key: Option<CompositeKey>| {
        let value = index.lookup(key);
        if let (Some(key), Some(_)) = (key, value) {
            attached.insert(key);
        }
        value
    };

    let mut log = WatchLog::default();

    for show in history.shows {
        let Some(show_id) = show.show.trakt_id() else {
            continue;
        };
        let seasons = show
            .seasons
            .iter()
            .map(|season| NormalizedSeason {
                number: season.number,
                rating: attach(season_key(&show.show, season.number)),
                episodes: season
                    .episodes
                    .iter()
                    .map(|episode| NormalizedEpisode {
                        number: episode.number,
                        plays: episode.plays,
                        watched_at: episode.last_watched_at,
                        rating: attach(
                            metadata
                                .episode_id(show_id, season.number, episode.number)
                                .map(CompositeKey::Episode),
                        ),
                    })
                    .collect(),
            })
            .collect();

        log.shows.push(NormalizedShow {
            rating: attach(show_key(&show.show)),
            poster: metadata.poster(MediaKind::Show, &show.show.ids),
            show: show.show,
            seasons,
        });
    }

    for movie in history.movies {
        log.movies.push(NormalizedMovie {
            rating: attach(movie_key(&movie.movie)),
            poster: metadata.poster(MediaKind::Movie, &movie.movie.ids),
            plays: movie.plays,
            watched_at: movie.last_watched_at,
            movie: movie.movie,
        });
    }

    let unattached_ratings = index.keys().filter(|key| !attached.contains(key)).count();
    debug!(
        "Built watch log: shows={}, movies={}, rated={}, unattached_ratings={}",
        log.shows.len(),
        log.movies.len(),
        log.rated_count(),
        unattached_ratings
    );
    (log, ReconcileStats { unattached_ratings })
}
