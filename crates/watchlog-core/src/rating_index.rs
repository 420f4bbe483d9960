use std::collections::{HashMap, HashSet};
use tracing::debug;
use watchlog_models::{RatedSubject, Rating, RatingValue};

use crate::keys::{rating_key, CompositeKey};

/// Ratings keyed by subject, built once per run.
#[derive(Debug, Default)]
pub struct RatingIndex {
    entries: HashMap<CompositeKey, RatingValue>,
    /// Shows that have at least one rated episode; only these need an episode-id listing.
    shows_with_episode_ratings: HashSet<u64>,
    keyless: usize,
}

impl RatingIndex {
    /// Later entries overwrite earlier ones with the same key.
    pub fn build(ratings: &[Rating]) -> Self {
        let mut index = Self::default();
        for rating in ratings {
            let Some(key) = rating_key(&rating.subject) else {
                index.keyless += 1;
                debug!("Skipping rating without trakt id: {}", rating.subject.label());
                continue;
            };
            if let RatedSubject::Episode { show, .. } = &rating.subject {
                if let Some(show_id) = show.trakt_id() {
                    index.shows_with_episode_ratings.insert(show_id);
                }
            }
            index.entries.insert(key, RatingValue::from(rating));
        }
        debug!(
            "Built rating index: entries={}, keyless={}",
            index.entries.len(),
            index.keyless
        );
        index
    }

    pub fn get(&self, key: &CompositeKey) -> Option<RatingValue> {
        self.entries.get(key).copied()
    }

    /// Lookup that tolerates a missing key.
    pub fn lookup(&self, key: Option<CompositeKey>) -> Option<RatingValue> {
        key.and_then(|key| self.get(&key))
    }

    pub fn has_episode_ratings_for(&self, show_id: u64) -> bool {
        self.shows_with_episode_ratings.contains(&show_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CompositeKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ratings dropped because their subject had no trakt id.
    pub fn keyless(&self) -> usize {
        self.keyless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use watchlog_models::{MediaIds, MediaInfo};

    fn movie(trakt: Option<u64>) -> MediaInfo {
        MediaInfo {
            title: "Dune".to_string(),
            year: Some(2021),
            ids: MediaIds {
                trakt,
                ..MediaIds::default()
            },
        }
    }

    fn rating(subject: RatedSubject, value: u8, day: u32) -> Rating {
        Rating {
            subject,
            rating: value,
            rated_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_last_write_wins() {
        let ratings = vec![
            rating(RatedSubject::Movie { movie: movie(Some(1)) }, 6, 1),
            rating(RatedSubject::Movie { movie: movie(Some(1)) }, 9, 2),
        ];
        let index = RatingIndex::build(&ratings);

        assert_eq!(index.len(), 1);
        let value = index.get(&CompositeKey::Movie(1)).unwrap();
        assert_eq!(value.rating, 9);
        assert_eq!(value.rated_at, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_absent_is_none() {
        let index = RatingIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.get(&CompositeKey::Show(614)), None);
        assert_eq!(index.lookup(None), None);
    }

    #[test]
    fn test_keyless_ratings_are_counted() {
        let ratings = vec![
            rating(RatedSubject::Movie { movie: movie(None) }, 6, 1),
            rating(RatedSubject::Movie { movie: movie(Some(2)) }, 7, 1),
        ];
        let index = RatingIndex::build(&ratings);
        assert_eq!(index.len(), 1);
        assert_eq!(index.keyless(), 1);
    }

    #[test]
    fn test_tracks_shows_with_episode_ratings() {
        let ratings = vec![rating(
            RatedSubject::Episode {
                show: movie(Some(614)),
                season: 9,
                number: 1,
                ids: MediaIds::with_trakt(555),
            },
            8,
            3,
        )];
        let index = RatingIndex::build(&ratings);
        assert!(index.has_episode_ratings_for(614));
        assert!(!index.has_episode_ratings_for(615));
        assert_eq!(index.get(&CompositeKey::Episode(555)).map(|v| v.rating), Some(8));
    }
}
