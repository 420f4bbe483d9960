pub mod history;
pub mod media;
pub mod media_ids;
pub mod rating;
pub mod watched;

pub use history::{NormalizedEpisode, NormalizedMovie, NormalizedSeason, NormalizedShow, Poster, WatchLog};
pub use media::{EpisodeIdEntry, MediaInfo, MediaKind};
pub use media_ids::MediaIds;
pub use rating::{RatedSubject, Rating, RatingValue};
pub use watched::{WatchedEpisode, WatchedMovie, WatchedSeason, WatchedShow};
