use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, instrument};
use watchlog_config::Config;
use watchlog_sources::{HistorySource, PosterSource};

use crate::auth::TokenManager;
use crate::error::SyncError;
use crate::metadata::MetadataResolver;
use crate::rating_index::RatingIndex;
use crate::reconcile::{apply_cutoff, build_tree};
use crate::render::{render, DateFormat, RenderOptions};
use crate::writer::{NoteStatus, NoteWriter};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Render but do not touch the output file.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub output_path: PathBuf,
    pub status: NoteStatus,
    pub shows: usize,
    pub seasons: usize,
    pub episodes: usize,
    pub movies: usize,
    pub rated: usize,
    /// Ratings whose subject is not in the (filtered) watched history.
    pub unattached_ratings: usize,
    /// Watched or rated records without a trakt id.
    pub skipped_keyless: usize,
    /// Poster or episode-id lookups that failed and were degraded.
    pub degraded_lookups: usize,
    pub token_refreshed: bool,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub report: SyncReport,
    /// The rendered note, identical to what was (or would have been) written.
    pub content: String,
}

/// Runs the fetch → reconcile → render → write pipeline.
///
/// At most one run is in flight per orchestrator; a concurrent call fails
/// with [`SyncError::AlreadyRunning`].
pub struct SyncOrchestrator {
    config: Config,
    history: Arc<dyn HistorySource>,
    posters: Option<Arc<dyn PosterSource>>,
    tokens: Mutex<TokenManager>,
    running: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        config: Config,
        history: Arc<dyn HistorySource>,
        posters: Option<Arc<dyn PosterSource>>,
        tokens: TokenManager,
    ) -> Self {
        Self {
            config,
            history,
            posters,
            tokens: Mutex::new(tokens),
            running: Mutex::new(()),
        }
    }

    #[instrument(skip(self), fields(dry_run = options.dry_run))]
    pub async fn run(&self, options: &SyncOptions) -> Result<SyncOutcome, SyncError> {
        let _guard = self.running.try_lock().map_err(|_| SyncError::AlreadyRunning)?;
        let start = Instant::now();

        let result = self.run_inner(options, start).await;
        match &result {
            Ok(outcome) => info!(
                operation = "sync_complete",
                status = outcome.report.status.as_str(),
                shows = outcome.report.shows,
                movies = outcome.report.movies,
                duration_ms = outcome.report.duration.as_millis() as u64,
                "Sync finished"
            ),
            Err(e) => error!(
                operation = "sync_failed",
                class = e.class().as_str(),
                error = %e,
                "Sync failed"
            ),
        }
        result
    }

    async fn run_inner(&self, options: &SyncOptions, start: Instant) -> Result<SyncOutcome, SyncError> {
        // Everything that can be rejected locally is checked before any network activity.
        self.config.validate()?;
        let cutoff = self.config.sync.cutoff()?;
        let date_format = DateFormat::parse(&self.config.output.date_format).map_err(SyncError::Configuration)?;
        let output_path = self
            .config
            .output
            .path
            .clone()
            .ok_or_else(|| SyncError::Configuration("Output path is not configured".to_string()))?;
        let render_options = RenderOptions {
            sort_order: self.config.output.sort_order,
            date_format,
        };

        let token = self.tokens.lock().await.ensure_fresh(Utc::now()).await?;

        let resolver = MetadataResolver::new(
            Arc::clone(&self.history),
            self.posters.clone(),
            token.access_token.clone(),
            self.config.sync.concurrency,
        );

        info!(operation = "fetch_start", source = self.history.source_name(), "Fetching ratings and watched history");
        let access_token = token.access_token.as_str();
        let (ratings, shows, movies) = futures::try_join!(
            async {
                self.history
                    .get_ratings(access_token)
                    .await
                    .map_err(|e| SyncError::fetch("ratings", e))
            },
            async {
                self.history
                    .get_watched_shows(access_token)
                    .await
                    .map_err(|e| SyncError::fetch("watched shows", e))
            },
            async {
                self.history
                    .get_watched_movies(access_token)
                    .await
                    .map_err(|e| SyncError::fetch("watched movies", e))
            },
        )?;
        info!(
            operation = "fetch_complete",
            ratings = ratings.len(),
            shows = shows.len(),
            movies = movies.len(),
            "Fetched Trakt history"
        );

        let index = RatingIndex::build(&ratings);
        let filtered = apply_cutoff(shows, movies, cutoff);
        let skipped_keyless = filtered.skipped_keyless + index.keyless();

        resolver.prefetch(&filtered.shows, &filtered.movies, &index).await;
        let metadata = resolver.finish();

        let (log, stats) = build_tree(filtered, &index, &metadata);
        let content = render(&log, &render_options);

        let status = if options.dry_run {
            NoteStatus::DryRun
        } else {
            NoteWriter::new(output_path.clone())
                .write(&content)
                .await
                .map_err(|source| SyncError::Output {
                    path: output_path.clone(),
                    source,
                })?
        };

        let report = SyncReport {
            output_path,
            status,
            shows: log.shows.len(),
            seasons: log.season_count(),
            episodes: log.episode_count(),
            movies: log.movies.len(),
            rated: log.rated_count(),
            unattached_ratings: stats.unattached_ratings,
            skipped_keyless,
            degraded_lookups: metadata.degraded(),
            token_refreshed: token.refreshed,
            duration: start.elapsed(),
        };
        Ok(SyncOutcome { report, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::testing::{movie_info, show_info, ts, watched_movie, watched_show, FakeHistory, FakePosters, FakeTokens};
    use chrono::{DateTime, Duration as ChronoDuration};
    use tempfile::TempDir;
    use watchlog_config::{CredentialStore, OutputConfig, SyncConfig, TokenRecord, TraktConfig};
    use watchlog_models::{EpisodeIdEntry, MediaIds, RatedSubject, Rating};

    struct Harness {
        dir: TempDir,
        history: Arc<FakeHistory>,
        tokens: Arc<FakeTokens>,
    }

    impl Harness {
        fn new(history: FakeHistory) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                history: Arc::new(history),
                tokens: Arc::new(FakeTokens::default()),
            }
        }

        fn with_tokens(mut self, tokens: FakeTokens) -> Self {
            self.tokens = Arc::new(tokens);
            self
        }

        fn output_path(&self) -> PathBuf {
            self.dir.path().join("Trakt History.md")
        }

        fn credentials_path(&self) -> PathBuf {
            self.dir.path().join("credentials.toml")
        }

        fn config(&self) -> Config {
            Config {
                trakt: TraktConfig {
                    client_id: "id".to_string(),
                    client_secret: "secret".to_string(),
                    ..TraktConfig::default()
                },
                output: OutputConfig {
                    path: Some(self.output_path()),
                    ..OutputConfig::default()
                },
                sync: SyncConfig {
                    ignore_before: "2024-01-01".to_string(),
                    concurrency: 2,
                },
                ..Config::default()
            }
        }

        fn orchestrator(&self, config: Config, expires_at: DateTime<Utc>, posters: Option<Arc<FakePosters>>) -> SyncOrchestrator {
            let mut store = CredentialStore::new(self.credentials_path());
            store.set_trakt_token(&TokenRecord {
                access_token: "stored".to_string(),
                refresh_token: "stored-refresh".to_string(),
                expires_at,
            });
            store.save().unwrap();
            SyncOrchestrator::new(
                config,
                self.history.clone(),
                posters.map(|p| p as Arc<dyn PosterSource>),
                TokenManager::new(store, self.tokens.clone()),
            )
        }
    }

    fn futurama() -> watchlog_models::MediaInfo {
        show_info(614, "Futurama", "futurama")
    }

    #[tokio::test]
    async fn test_two_recent_episodes_without_ratings() {
        let history = FakeHistory::default().with_shows(vec![watched_show(
            futurama(),
            vec![(9, vec![(1, ts(2024, 2, 1)), (2, ts(2024, 2, 2))])],
        )]);
        let harness = Harness::new(history);
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let outcome = orchestrator.run(&SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.report.status, NoteStatus::Written);
        assert_eq!(outcome.report.shows, 1);
        assert_eq!(outcome.report.seasons, 1);
        assert_eq!(outcome.report.episodes, 2);
        let written = std::fs::read_to_string(harness.output_path()).unwrap();
        assert_eq!(written, outcome.content);
        assert_eq!(written.matches("## [Futurama (1999)]").count(), 1);
        assert_eq!(written.matches("### Season 9").count(), 1);
        assert!(written.contains("[S09E01](https://trakt.tv/shows/futurama/seasons/9/episodes/1) watched [[2024-02-01]] · 1 play · –"));
        assert!(written.contains("[S09E02](https://trakt.tv/shows/futurama/seasons/9/episodes/2) watched [[2024-02-02]] · 1 play · –"));
        // No episode ratings, so no listing was needed
        assert_eq!(harness.history.episode_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_episode_rating_through_resolved_id() {
        let history = FakeHistory::default()
            .with_shows(vec![watched_show(
                futurama(),
                vec![(9, vec![(1, ts(2024, 2, 1)), (2, ts(2024, 2, 2))])],
            )])
            .with_ratings(vec![Rating {
                subject: RatedSubject::Episode {
                    show: futurama(),
                    season: 9,
                    number: 1,
                    ids: MediaIds::with_trakt(555),
                },
                rating: 8,
                rated_at: ts(2024, 2, 3),
            }])
            .with_episode_ids(
                "futurama",
                vec![
                    EpisodeIdEntry { season: 9, number: 1, trakt_id: 555 },
                    EpisodeIdEntry { season: 9, number: 2, trakt_id: 556 },
                ],
            );
        let harness = Harness::new(history);
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let outcome = orchestrator.run(&SyncOptions::default()).await.unwrap();

        assert!(outcome.content.contains("[S09E01](https://trakt.tv/shows/futurama/seasons/9/episodes/1) watched [[2024-02-01]] · 1 play · 8/10"));
        assert!(outcome.content.contains("episodes/2) watched [[2024-02-02]] · 1 play · –"));
        assert_eq!(outcome.report.rated, 1);
        assert_eq!(outcome.report.unattached_ratings, 0);
        assert_eq!(harness.history.episode_id_calls(), 1);
    }

    #[tokio::test]
    async fn test_movie_watched_before_and_after_cutoff_appears_once() {
        let dune = movie_info(1, "Dune", "dune-2021", Some(438631));
        let history = FakeHistory::default()
            .with_movies(vec![
                watched_movie(dune.clone(), 1, ts(2023, 6, 1)),
                watched_movie(dune.clone(), 2, ts(2024, 3, 1)),
            ])
            .with_ratings(vec![Rating {
                subject: RatedSubject::Movie { movie: dune },
                rating: 9,
                rated_at: ts(2024, 3, 2),
            }]);
        let posters = Arc::new(FakePosters::default().with_poster(438631, "https://image.tmdb.org/t/p/w342/dune.jpg"));
        let harness = Harness::new(history);
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), Some(posters.clone()));

        let outcome = orchestrator.run(&SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.report.movies, 1);
        assert_eq!(posters.calls(), 1);
        let rows: Vec<&str> = outcome.content.lines().filter(|l| l.contains("[Dune (2021)]")).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            "| ![](https://image.tmdb.org/t/p/w342/dune.jpg) | [Dune (2021)](https://trakt.tv/movies/dune-2021) | [[2024-03-01]] | 2 | 9/10 |"
        );
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_once_before_fetch() {
        let harness = Harness::new(FakeHistory::default());
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() - ChronoDuration::minutes(1), None);

        let outcome = orchestrator.run(&SyncOptions::default()).await.unwrap();

        assert!(outcome.report.token_refreshed);
        assert_eq!(harness.tokens.refresh_calls(), 1);
        assert!(harness.history.tokens_seen().iter().all(|t| t == "refreshed"));
        assert_eq!(harness.history.bulk_calls(), 3);
    }

    #[tokio::test]
    async fn test_each_run_reads_the_current_stored_token() {
        let harness = Harness::new(FakeHistory::default());
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let mut store = CredentialStore::open(harness.credentials_path()).unwrap();
        store.set_trakt_token(&TokenRecord {
            access_token: "reconnected".to_string(),
            refresh_token: "reconnected-refresh".to_string(),
            expires_at: Utc::now() + ChronoDuration::days(7),
        });
        store.save().unwrap();

        orchestrator.run(&SyncOptions::default()).await.unwrap();

        let seen = harness.history.tokens_seen();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|t| t == "reconnected"));
        assert_eq!(harness.tokens.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_refreshed_token_persisted_when_fetch_fails() {
        let harness = Harness::new(FakeHistory::default().failing_movies());
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() - ChronoDuration::minutes(1), None);

        let err = orchestrator.run(&SyncOptions::default()).await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch { what: "watched movies", .. }));
        assert_eq!(err.class(), ErrorClass::SyncFailed);
        let stored = CredentialStore::open(harness.credentials_path()).unwrap();
        assert_eq!(stored.trakt_token().unwrap().access_token, "refreshed");
        assert!(!harness.output_path().exists());
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_output_untouched() {
        let harness = Harness::new(FakeHistory::default()).with_tokens(FakeTokens::failing());
        std::fs::write(harness.output_path(), "previous").unwrap();
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() - ChronoDuration::minutes(1), None);

        let err = orchestrator.run(&SyncOptions::default()).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Authentication);
        assert_eq!(harness.history.bulk_calls(), 0);
        assert_eq!(std::fs::read_to_string(harness.output_path()).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_configuration_error_before_network() {
        let harness = Harness::new(FakeHistory::default());
        let mut config = harness.config();
        config.output.date_format = "%Q".to_string();
        let orchestrator = harness.orchestrator(config, Utc::now() - ChronoDuration::minutes(1), None);

        let err = orchestrator.run(&SyncOptions::default()).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Configuration);
        assert_eq!(harness.tokens.refresh_calls(), 0);
        assert_eq!(harness.history.bulk_calls(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_and_unchanged() {
        let harness = Harness::new(FakeHistory::default());
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let dry = orchestrator.run(&SyncOptions { dry_run: true }).await.unwrap();
        assert_eq!(dry.report.status, NoteStatus::DryRun);
        assert!(!harness.output_path().exists());
        assert!(dry.content.contains("_No shows found._"));

        let first = orchestrator.run(&SyncOptions::default()).await.unwrap();
        assert_eq!(first.report.status, NoteStatus::Written);
        let second = orchestrator.run(&SyncOptions::default()).await.unwrap();
        assert_eq!(second.report.status, NoteStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let harness = Harness::new(FakeHistory::default());
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let _held = orchestrator.running.lock().await;
        let err = orchestrator.run(&SyncOptions::default()).await.unwrap_err();
        assert!(matches!(err, SyncError::AlreadyRunning));
    }

    #[tokio::test]
    async fn test_degraded_lookups_do_not_abort() {
        let history = FakeHistory::default()
            .with_shows(vec![watched_show(futurama(), vec![(1, vec![(1, ts(2024, 2, 1))])])])
            .with_ratings(vec![Rating {
                subject: RatedSubject::Episode {
                    show: futurama(),
                    season: 1,
                    number: 1,
                    ids: MediaIds::with_trakt(10),
                },
                rating: 5,
                rated_at: ts(2024, 2, 2),
            }])
            .failing_episode_ids();
        let harness = Harness::new(history);
        let orchestrator = harness.orchestrator(harness.config(), Utc::now() + ChronoDuration::days(1), None);

        let outcome = orchestrator.run(&SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.report.degraded_lookups, 1);
        assert_eq!(outcome.report.unattached_ratings, 1);
        assert!(outcome.content.contains("· 1 play · –"));
    }
}
