use crate::media::MediaInfo;
use crate::media_ids::MediaIds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rating the user assigned to a movie, show, season or episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub subject: RatedSubject,
    /// Trakt scale, 1-10 integer
    pub rating: u8,
    pub rated_at: DateTime<Utc>,
}

/// What a rating points at.
///
/// Seasons have no independent identity in Trakt's rating payloads, so a
/// season is addressed through its show and number. Episodes carry their own
/// trakt id, which differs from the (season, number) pair used by watched
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RatedSubject {
    Movie {
        movie: MediaInfo,
    },
    Show {
        show: MediaInfo,
    },
    Season {
        show: MediaInfo,
        season: u32,
    },
    Episode {
        show: MediaInfo,
        season: u32,
        number: u32,
        ids: MediaIds,
    },
}

impl RatedSubject {
    /// Human readable label for logs.
    pub fn label(&self) -> String {
        match self {
            RatedSubject::Movie { movie } => movie.title.clone(),
            RatedSubject::Show { show } => show.title.clone(),
            RatedSubject::Season { show, season } => format!("{} season {}", show.title, season),
            RatedSubject::Episode { show, season, number, .. } => {
                format!("{} S{:02}E{:02}", show.title, season, number)
            }
        }
    }
}

/// The part of a rating that is attached to nodes of the normalized tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingValue {
    pub rating: u8,
    pub rated_at: DateTime<Utc>,
}

impl From<&Rating> for RatingValue {
    fn from(rating: &Rating) -> Self {
        Self {
            rating: rating.rating,
            rated_at: rating.rated_at,
        }
    }
}
