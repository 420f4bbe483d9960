use serde::{Deserialize, Serialize};

/// Identifiers Trakt attaches to every show, season, episode and movie.
///
/// Only `trakt` participates in joins; the others are carried through so the
/// metadata resolver can reach external services (TMDB posters) and so the
/// renderer can build stable links from `slug`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MediaIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trakt: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u32>,
}

impl MediaIds {
    pub fn with_trakt(trakt: u64) -> Self {
        Self {
            trakt: Some(trakt),
            ..Self::default()
        }
    }

    /// Fill in missing identifiers from `other` without overwriting existing ones.
    pub fn merge(&mut self, other: &MediaIds) {
        if self.trakt.is_none() {
            self.trakt = other.trakt;
        }
        if self.slug.is_none() {
            self.slug = other.slug.clone();
        }
        if self.imdb.is_none() {
            self.imdb = other.imdb.clone();
        }
        if self.tmdb.is_none() {
            self.tmdb = other.tmdb;
        }
        if self.tvdb.is_none() {
            self.tvdb = other.tvdb;
        }
    }

    /// Path segment used in trakt.tv URLs. Trakt accepts either the slug or the numeric id.
    pub fn url_segment(&self) -> Option<String> {
        self.slug
            .clone()
            .or_else(|| self.trakt.map(|id| id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_existing_values() {
        let mut ids = MediaIds {
            trakt: Some(1),
            slug: Some("futurama".to_string()),
            ..MediaIds::default()
        };
        let other = MediaIds {
            trakt: Some(99),
            slug: None,
            imdb: Some("tt0149460".to_string()),
            tmdb: Some(615),
            tvdb: None,
        };

        ids.merge(&other);

        assert_eq!(ids.trakt, Some(1));
        assert_eq!(ids.slug.as_deref(), Some("futurama"));
        assert_eq!(ids.imdb.as_deref(), Some("tt0149460"));
        assert_eq!(ids.tmdb, Some(615));
    }

    #[test]
    fn test_url_segment_prefers_slug() {
        let ids = MediaIds {
            trakt: Some(614),
            slug: Some("futurama".to_string()),
            ..MediaIds::default()
        };
        assert_eq!(ids.url_segment().as_deref(), Some("futurama"));
        assert_eq!(MediaIds::with_trakt(614).url_segment().as_deref(), Some("614"));
    }
}
