use watchlog_models::{MediaIds, MediaInfo, RatedSubject};

/// Join key shared by watched history and ratings.
///
/// Seasons have no trakt id of their own in the payloads we join on, so they
/// are addressed by their show and number. Episodes use their own trakt id,
/// which is what ratings carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositeKey {
    Movie(u64),
    Show(u64),
    Season { show: u64, season: u32 },
    Episode(u64),
}

pub fn movie_key(movie: &MediaInfo) -> Option<CompositeKey> {
    movie.trakt_id().map(CompositeKey::Movie)
}

pub fn show_key(show: &MediaInfo) -> Option<CompositeKey> {
    show.trakt_id().map(CompositeKey::Show)
}

pub fn season_key(show: &MediaInfo, season: u32) -> Option<CompositeKey> {
    show.trakt_id().map(|show| CompositeKey::Season { show, season })
}

pub fn episode_key(episode: &MediaIds) -> Option<CompositeKey> {
    episode.trakt.map(CompositeKey::Episode)
}

pub fn rating_key(subject: &RatedSubject) -> Option<CompositeKey> {
    match subject {
        RatedSubject::Movie { movie } => movie_key(movie),
        RatedSubject::Show { show } => show_key(show),
        RatedSubject::Season { show, season } => season_key(show, *season),
        RatedSubject::Episode { ids, .. } => episode_key(ids),
    }
}
