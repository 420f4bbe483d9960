use crate::media_ids::MediaIds;
use serde::{Deserialize, Serialize};

/// Title, year and identifiers shared by shows and movies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub year: Option<u32>,
    pub ids: MediaIds,
}

impl MediaInfo {
    pub fn trakt_id(&self) -> Option<u64> {
        self.ids.trakt
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }
}

/// One entry of a show's episode listing: the coordinates used by watched
/// history mapped to the episode-level trakt id used by ratings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeIdEntry {
    pub season: u32,
    pub number: u32,
    pub trakt_id: u64,
}
