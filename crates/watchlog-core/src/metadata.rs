use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use watchlog_models::{MediaIds, MediaInfo, MediaKind, Poster, WatchedMovie, WatchedShow};
use watchlog_sources::{HistorySource, PosterSource};

use crate::rating_index::RatingIndex;

/// (season, episode) -> episode trakt id
pub type EpisodeIdMap = HashMap<(u32, u32), u64>;

/// Poster and episode-id lookups for a single run.
///
/// Every lookup is attempted at most once per subject; failures are logged,
/// counted and cached as a degraded result so the run carries on.
pub struct MetadataResolver {
    history: Arc<dyn HistorySource>,
    posters: Option<Arc<dyn PosterSource>>,
    access_token: String,
    concurrency: usize,
    episode_ids: Mutex<HashMap<u64, Arc<EpisodeIdMap>>>,
    poster_cache: Mutex<HashMap<(MediaKind, u32), Poster>>,
    degraded: AtomicUsize,
}

enum Lookup {
    EpisodeIds(MediaInfo),
    Poster(MediaKind, MediaIds),
}

impl MetadataResolver {
    pub fn new(
        history: Arc<dyn HistorySource>,
        posters: Option<Arc<dyn PosterSource>>,
        access_token: String,
        concurrency: usize,
    ) -> Self {
        Self {
            history,
            posters,
            access_token,
            concurrency: concurrency.max(1),
            episode_ids: Mutex::new(HashMap::new()),
            poster_cache: Mutex::new(HashMap::new()),
            degraded: AtomicUsize::new(0),
        }
    }

    /// Episode ids of a show, fetched once per show. Empty when the listing fails.
    pub async fn episode_ids_for(&self, show: &MediaInfo) -> Arc<EpisodeIdMap> {
        let Some(show_id) = show.trakt_id() else {
            return Arc::new(EpisodeIdMap::new());
        };
        if let Some(cached) = self.episode_ids.lock().await.get(&show_id) {
            return Arc::clone(cached);
        }

        let segment = show.ids.url_segment().unwrap_or_else(|| show_id.to_string());
        let map = match self.history.get_episode_ids(&self.access_token, &segment).await {
            Ok(entries) => {
                debug!("Resolved {} episode ids for {}", entries.len(), show.title);
                entries
                    .into_iter()
                    .map(|entry| ((entry.season, entry.number), entry.trakt_id))
                    .collect()
            }
            Err(e) => {
                warn!("Failed to fetch episode ids for {}: {}", show.title, e);
                self.degraded.fetch_add(1, Ordering::Relaxed);
                EpisodeIdMap::new()
            }
        };

        let map = Arc::new(map);
        self.episode_ids.lock().await.insert(show_id, Arc::clone(&map));
        map
    }

    pub async fn poster_for(&self, kind: MediaKind, ids: &MediaIds) -> Poster {
        let (Some(source), Some(tmdb_id)) = (&self.posters, ids.tmdb) else {
            return Poster::Absent;
        };
        if let Some(cached) = self.poster_cache.lock().await.get(&(kind, tmdb_id)) {
            return cached.clone();
        }

        let poster = match source.poster_url(kind, tmdb_id).await {
            Ok(Some(url)) => Poster::Found(url),
            Ok(None) => Poster::Absent,
            Err(e) => {
                warn!("Failed to fetch poster for {} {}: {}", kind.as_str(), tmdb_id, e);
                self.degraded.fetch_add(1, Ordering::Relaxed);
                Poster::Failed
            }
        };

        self.poster_cache.lock().await.insert((kind, tmdb_id), poster.clone());
        poster
    }

    /// Resolve everything the tree will ask for, `concurrency` lookups at a time.
    ///
    /// Episode listings are only needed for shows with rated episodes.
    pub async fn prefetch(&self, shows: &[WatchedShow], movies: &[WatchedMovie], index: &RatingIndex) {
        let mut lookups = Vec::new();
        let mut seen_posters = HashSet::new();

        for show in shows {
            if show.show.trakt_id().is_some_and(|id| index.has_episode_ratings_for(id)) {
                lookups.push(Lookup::EpisodeIds(show.show.clone()));
            }
            if let Some(tmdb_id) = show.show.ids.tmdb {
                if self.posters.is_some() && seen_posters.insert((MediaKind::Show, tmdb_id)) {
                    lookups.push(Lookup::Poster(MediaKind::Show, show.show.ids.clone()));
                }
            }
        }
        for movie in movies {
            if let Some(tmdb_id) = movie.movie.ids.tmdb {
                if self.posters.is_some() && seen_posters.insert((MediaKind::Movie, tmdb_id)) {
                    lookups.push(Lookup::Poster(MediaKind::Movie, movie.movie.ids.clone()));
                }
            }
        }

        debug!(
            "Prefetching {} metadata lookups with concurrency {}",
            lookups.len(),
            self.concurrency
        );

        let resolver = self;
        stream::iter(lookups)
            .map(|lookup| async move {
                match lookup {
                    Lookup::EpisodeIds(show) => {
                        resolver.episode_ids_for(&show).await;
                    }
                    Lookup::Poster(kind, ids) => {
                        resolver.poster_for(kind, &ids).await;
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<()>>()
            .await;
    }

    /// Freeze the caches into a read-only view for tree building.
    pub fn finish(self) -> ResolvedMetadata {
        ResolvedMetadata {
            episode_ids: self.episode_ids.into_inner(),
            posters: self.poster_cache.into_inner(),
            degraded: self.degraded.into_inner(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedMetadata {
    episode_ids: HashMap<u64, Arc<EpisodeIdMap>>,
    posters: HashMap<(MediaKind, u32), Poster>,
    degraded: usize,
}

impl ResolvedMetadata {
    pub fn episode_id(&self, show_id: u64, season: u32, number: u32) -> Option<u64> {
        self.episode_ids
            .get(&show_id)
            .and_then(|map| map.get(&(season, number)))
            .copied()
    }

    /// Anything never looked up is treated as having no poster.
    pub fn poster(&self, kind: MediaKind, ids: &MediaIds) -> Poster {
        ids.tmdb
            .and_then(|tmdb_id| self.posters.get(&(kind, tmdb_id)))
            .cloned()
            .unwrap_or(Poster::Absent)
    }

    pub fn degraded(&self) -> usize {
        self.degraded
    }
}
