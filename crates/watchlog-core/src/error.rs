use std::path::PathBuf;
use thiserror::Error;
use watchlog_config::ConfigError;
use watchlog_sources::SourceError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A sync is already running")]
    AlreadyRunning,
}

/// The three notification classes a failed run is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Authentication,
    SyncFailed,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::Authentication => "authentication",
            ErrorClass::SyncFailed => "sync_failed",
        }
    }
}

impl SyncError {
    pub fn fetch(what: &'static str, source: SourceError) -> Self {
        // A rejected token during a fetch means the user has to reconnect.
        if source.is_unauthorized() {
            return SyncError::Authentication(format!("Trakt rejected the access token while fetching {}", what));
        }
        SyncError::Fetch { what, source }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::Configuration(_) => ErrorClass::Configuration,
            SyncError::Authentication(_) => ErrorClass::Authentication,
            SyncError::Fetch { .. } | SyncError::Output { .. } | SyncError::AlreadyRunning => {
                ErrorClass::SyncFailed
            }
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            SyncError::from(ConfigError::MissingClientId).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            SyncError::Authentication("no token".to_string()).class(),
            ErrorClass::Authentication
        );
        assert_eq!(SyncError::AlreadyRunning.class(), ErrorClass::SyncFailed);
    }

    #[test]
    fn test_unauthorized_fetch_is_authentication() {
        let err = SyncError::fetch(
            "ratings",
            SourceError::Http {
                endpoint: "/sync/ratings/all".to_string(),
                status: 401,
                body: String::new(),
            },
        );
        assert_eq!(err.class(), ErrorClass::Authentication);

        let err = SyncError::fetch(
            "ratings",
            SourceError::Http {
                endpoint: "/sync/ratings/all".to_string(),
                status: 500,
                body: String::new(),
            },
        );
        assert_eq!(err.class(), ErrorClass::SyncFailed);
    }
}
