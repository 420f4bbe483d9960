use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use watchlog_models::{
    EpisodeIdEntry, MediaIds, MediaInfo, RatedSubject, Rating, WatchedEpisode, WatchedMovie,
    WatchedSeason, WatchedShow,
};

use crate::error::SourceError;

const API_BASE: &str = "https://api.trakt.tv";

pub const RATINGS_ENDPOINT: &str = "/sync/ratings/all";
pub const WATCHED_SHOWS_ENDPOINT: &str = "/sync/watched/shows?extended=full";
pub const WATCHED_MOVIES_ENDPOINT: &str = "/sync/watched/movies?extended=full";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<u64>,
    pub slug: Option<String>,
    pub imdb: Option<String>,
    pub tmdb: Option<u32>,
    pub tvdb: Option<u32>,
}

/// Movie or show summary as embedded in every sync payload.
#[derive(Debug, Deserialize)]
pub struct TraktMedia {
    #[serde(default)]
    pub title: Option<String>,
    pub year: Option<u32>,
    #[serde(default)]
    pub ids: TraktIds,
}

#[derive(Debug, Deserialize)]
pub struct TraktWatchedShow {
    #[serde(default)]
    pub plays: u32,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub show: TraktMedia,
    #[serde(default)]
    pub seasons: Vec<TraktWatchedSeason>,
}

#[derive(Debug, Deserialize)]
pub struct TraktWatchedSeason {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<TraktWatchedEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct TraktWatchedEpisode {
    pub number: u32,
    #[serde(default)]
    pub plays: u32,
    pub last_watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TraktWatchedMovie {
    #[serde(default)]
    pub plays: u32,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub movie: TraktMedia,
}

#[derive(Debug, Deserialize)]
pub struct TraktSeasonRef {
    pub number: u32,
    #[serde(default)]
    pub ids: TraktIds,
}

#[derive(Debug, Deserialize)]
pub struct TraktEpisodeRef {
    pub season: u32,
    pub number: u32,
    #[serde(default)]
    pub ids: TraktIds,
}

#[derive(Debug, Deserialize)]
pub struct TraktRatingItem {
    pub rated_at: DateTime<Utc>,
    pub rating: u8,
    #[serde(rename = "type")]
    pub item_type: String,
    pub movie: Option<TraktMedia>,
    pub show: Option<TraktMedia>,
    pub season: Option<TraktSeasonRef>,
    pub episode: Option<TraktEpisodeRef>,
}

#[derive(Debug, Deserialize)]
pub struct TraktSeasonListing {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<TraktEpisodeRef>,
}

/// Remove slashes from IMDB ID (Trakt sometimes includes them)
fn remove_slashes(s: &str) -> String {
    s.replace('/', "")
}

impl From<TraktIds> for MediaIds {
    fn from(ids: TraktIds) -> Self {
        MediaIds {
            trakt: ids.trakt,
            slug: ids.slug,
            imdb: ids.imdb.as_deref().map(remove_slashes),
            tmdb: ids.tmdb,
            tvdb: ids.tvdb,
        }
    }
}

impl From<TraktMedia> for MediaInfo {
    fn from(media: TraktMedia) -> Self {
        MediaInfo {
            title: media.title.unwrap_or_default(),
            year: media.year,
            ids: media.ids.into(),
        }
    }
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    client_id: &str,
    access_token: &str,
    endpoint: &str,
) -> Result<T, SourceError> {
    let url = format!("{}{}", API_BASE, endpoint);
    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Trakt API error: {} - {}. Endpoint: {}", status, body, endpoint);
        return Err(SourceError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| {
        if body.len() < 500 {
            debug!("Trakt raw response for {}: {}", endpoint, body);
        }
        SourceError::Decode {
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

pub async fn get_ratings(
    client: &Client,
    client_id: &str,
    access_token: &str,
) -> Result<Vec<Rating>, SourceError> {
    let items: Vec<TraktRatingItem> = get_json(client, client_id, access_token, RATINGS_ENDPOINT).await?;
    ratings_from_wire(items)
}

pub async fn get_watched_shows(
    client: &Client,
    client_id: &str,
    access_token: &str,
) -> Result<Vec<WatchedShow>, SourceError> {
    let items: Vec<TraktWatchedShow> =
        get_json(client, client_id, access_token, WATCHED_SHOWS_ENDPOINT).await?;
    Ok(watched_shows_from_wire(items))
}

pub async fn get_watched_movies(
    client: &Client,
    client_id: &str,
    access_token: &str,
) -> Result<Vec<WatchedMovie>, SourceError> {
    let items: Vec<TraktWatchedMovie> =
        get_json(client, client_id, access_token, WATCHED_MOVIES_ENDPOINT).await?;
    Ok(watched_movies_from_wire(items))
}

pub async fn get_episode_ids(
    client: &Client,
    client_id: &str,
    access_token: &str,
    show: &str,
) -> Result<Vec<EpisodeIdEntry>, SourceError> {
    let endpoint = format!("/shows/{}/seasons?extended=episodes", urlencoding::encode(show));
    let seasons: Vec<TraktSeasonListing> = get_json(client, client_id, access_token, &endpoint).await?;
    Ok(episode_ids_from_wire(seasons))
}

/// Convert the ratings payload. Unknown item types are skipped; a known type
/// whose subject object is missing is a malformed payload.
pub fn ratings_from_wire(items: Vec<TraktRatingItem>) -> Result<Vec<Rating>, SourceError> {
    let mut ratings = Vec::with_capacity(items.len());
    let mut unknown_types = 0;
    let mut out_of_range = 0;

    for item in items {
        if !(1..=10).contains(&item.rating) {
            out_of_range += 1;
            continue;
        }

        let missing = |what: &str| {
            SourceError::malformed(RATINGS_ENDPOINT, format!("{} rating without {} data", item.item_type, what))
        };

        let subject = match item.item_type.as_str() {
            "movie" => RatedSubject::Movie {
                movie: item.movie.ok_or_else(|| missing("movie"))?.into(),
            },
            "show" => RatedSubject::Show {
                show: item.show.ok_or_else(|| missing("show"))?.into(),
            },
            "season" => {
                let season = item.season.ok_or_else(|| missing("season"))?;
                RatedSubject::Season {
                    show: item.show.ok_or_else(|| missing("show"))?.into(),
                    season: season.number,
                }
            }
            "episode" => {
                let episode = item.episode.ok_or_else(|| missing("episode"))?;
                RatedSubject::Episode {
                    show: item.show.ok_or_else(|| missing("show"))?.into(),
                    season: episode.season,
                    number: episode.number,
                    ids: episode.ids.into(),
                }
            }
            other => {
                unknown_types += 1;
                if unknown_types <= 5 {
                    debug!("Trakt ratings: Skipping item with unknown type: {:?}", other);
                }
                continue;
            }
        };

        ratings.push(Rating {
            subject,
            rating: item.rating,
            rated_at: item.rated_at,
        });
    }

    debug!(
        "Fetched Trakt ratings: total_items={}, unknown_types={}, out_of_range={}",
        ratings.len(),
        unknown_types,
        out_of_range
    );
    Ok(ratings)
}

/// Episodes without a watch timestamp carry no history and are dropped here.
pub fn watched_shows_from_wire(items: Vec<TraktWatchedShow>) -> Vec<WatchedShow> {
    let mut undated = 0;
    let shows: Vec<WatchedShow> = items
        .into_iter()
        .map(|item| {
            let seasons = item
                .seasons
                .into_iter()
                .map(|season| WatchedSeason {
                    number: season.number,
                    episodes: season
                        .episodes
                        .into_iter()
                        .filter_map(|episode| match episode.last_watched_at {
                            Some(last_watched_at) => Some(WatchedEpisode {
                                number: episode.number,
                                plays: episode.plays,
                                last_watched_at,
                            }),
                            None => {
                                undated += 1;
                                None
                            }
                        })
                        .collect(),
                })
                .collect();

            WatchedShow {
                show: item.show.into(),
                plays: item.plays,
                last_watched_at: item.last_watched_at,
                seasons,
            }
        })
        .collect();

    debug!(
        "Fetched Trakt watched shows: total_items={}, undated_episodes={}",
        shows.len(),
        undated
    );
    shows
}

pub fn watched_movies_from_wire(items: Vec<TraktWatchedMovie>) -> Vec<WatchedMovie> {
    let total = items.len();
    let movies: Vec<WatchedMovie> = items
        .into_iter()
        .filter_map(|item| {
            let last_watched_at = item.last_watched_at?;
            Some(WatchedMovie {
                movie: item.movie.into(),
                plays: item.plays,
                last_watched_at,
            })
        })
        .collect();

    debug!(
        "Fetched Trakt watched movies: total_items={}, undated={}",
        movies.len(),
        total - movies.len()
    );
    movies
}

pub fn episode_ids_from_wire(seasons: Vec<TraktSeasonListing>) -> Vec<EpisodeIdEntry> {
    seasons
        .into_iter()
        .flat_map(|season| {
            let season_number = season.number;
            season.episodes.into_iter().filter_map(move |episode| {
                Some(EpisodeIdEntry {
                    // Listings nest episodes under their season; trust the outer number.
                    season: season_number,
                    number: episode.number,
                    trakt_id: episode.ids.trakt?,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ratings_from_wire_all_kinds() {
        let json = r#"[
            {"rated_at":"2024-01-02T10:00:00.000Z","rating":9,"type":"movie",
             "movie":{"title":"Dune","year":2021,"ids":{"trakt":1,"slug":"dune-2021","imdb":"tt1160419","tmdb":438631}}},
            {"rated_at":"2024-01-03T10:00:00.000Z","rating":7,"type":"show",
             "show":{"title":"Futurama","year":1999,"ids":{"trakt":614,"slug":"futurama","tmdb":615}}},
            {"rated_at":"2024-01-04T10:00:00.000Z","rating":6,"type":"season",
             "season":{"number":9,"ids":{"trakt":999}},
             "show":{"title":"Futurama","year":1999,"ids":{"trakt":614,"slug":"futurama"}}},
            {"rated_at":"2024-01-05T10:00:00.000Z","rating":8,"type":"episode",
             "episode":{"season":9,"number":1,"title":"The Impossible Stream","ids":{"trakt":555}},
             "show":{"title":"Futurama","year":1999,"ids":{"trakt":614,"slug":"futurama"}}},
            {"rated_at":"2024-01-06T10:00:00.000Z","rating":5,"type":"list"}
        ]"#;
        let items: Vec<TraktRatingItem> = serde_json::from_str(json).unwrap();
        let ratings = ratings_from_wire(items).unwrap();

        assert_eq!(ratings.len(), 4);
        match &ratings[0].subject {
            RatedSubject::Movie { movie } => {
                assert_eq!(movie.title, "Dune");
                assert_eq!(movie.ids.tmdb, Some(438631));
            }
            other => panic!("unexpected subject {:?}", other),
        }
        assert!(matches!(&ratings[2].subject, RatedSubject::Season { show, season: 9 } if show.trakt_id() == Some(614)));
        match &ratings[3].subject {
            RatedSubject::Episode { season, number, ids, .. } => {
                assert_eq!((*season, *number), (9, 1));
                assert_eq!(ids.trakt, Some(555));
            }
            other => panic!("unexpected subject {:?}", other),
        }
        assert_eq!(ratings[3].rating, 8);
        assert_eq!(ratings[3].rated_at, Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_rating_without_subject_is_malformed() {
        let json = r#"[{"rated_at":"2024-01-02T10:00:00Z","rating":9,"type":"movie"}]"#;
        let items: Vec<TraktRatingItem> = serde_json::from_str(json).unwrap();
        let err = ratings_from_wire(items).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_watched_shows_keep_structure() {
        let json = r#"[{
            "plays":3,"last_watched_at":"2024-02-01T20:00:00.000Z",
            "show":{"title":"Futurama","year":1999,"ids":{"trakt":614,"slug":"futurama","imdb":"tt0149460/"}},
            "seasons":[{"number":9,"episodes":[
                {"number":1,"plays":2,"last_watched_at":"2024-01-31T20:00:00.000Z"},
                {"number":2,"plays":1,"last_watched_at":null}
            ]}]
        }]"#;
        let items: Vec<TraktWatchedShow> = serde_json::from_str(json).unwrap();
        let shows = watched_shows_from_wire(items);

        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].show.ids.imdb.as_deref(), Some("tt0149460"));
        assert_eq!(shows[0].seasons[0].episodes.len(), 1);
        assert_eq!(shows[0].seasons[0].episodes[0].plays, 2);
    }

    #[test]
    fn test_watched_movies_missing_ids_are_kept() {
        let json = r#"[
            {"plays":1,"last_watched_at":"2024-02-01T20:00:00Z","movie":{"title":"Unknown","year":null,"ids":{}}},
            {"plays":1,"last_watched_at":null,"movie":{"title":"Undated","ids":{"trakt":5}}}
        ]"#;
        let items: Vec<TraktWatchedMovie> = serde_json::from_str(json).unwrap();
        let movies = watched_movies_from_wire(items);

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].movie.title, "Unknown");
        assert!(movies[0].movie.ids.trakt.is_none());
    }

    #[test]
    fn test_episode_ids_from_listing() {
        let json = r#"[
            {"number":0,"ids":{"trakt":1},"episodes":[{"season":0,"number":1,"ids":{"trakt":100}}]},
            {"number":9,"ids":{"trakt":2},"episodes":[
                {"season":9,"number":1,"ids":{"trakt":555}},
                {"season":9,"number":2,"ids":{}}
            ]}
        ]"#;
        let seasons: Vec<TraktSeasonListing> = serde_json::from_str(json).unwrap();
        let entries = episode_ids_from_wire(seasons);

        assert_eq!(
            entries,
            vec![
                EpisodeIdEntry { season: 0, number: 1, trakt_id: 100 },
                EpisodeIdEntry { season: 9, number: 1, trakt_id: 555 },
            ]
        );
    }
}
