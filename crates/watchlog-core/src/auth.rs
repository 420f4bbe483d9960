use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use watchlog_config::{CredentialStore, TokenRecord};
use watchlog_sources::TokenProvider;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Missing,
    Valid { expires_at: DateTime<Utc> },
    Expired { expires_at: DateTime<Utc> },
}

/// Access token returned by [`TokenManager::ensure_fresh`].
#[derive(Debug, Clone)]
pub struct FreshToken {
    pub access_token: String,
    pub refreshed: bool,
}

/// Owns the persisted token record and keeps it usable.
pub struct TokenManager {
    store: CredentialStore,
    provider: Arc<dyn TokenProvider>,
}

impl TokenManager {
    pub fn new(store: CredentialStore, provider: Arc<dyn TokenProvider>) -> Self {
        Self { store, provider }
    }

    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        match self.store.trakt_token() {
            None => TokenStatus::Missing,
            Some(token) if token.is_expired_at(now) => TokenStatus::Expired {
                expires_at: token.expires_at,
            },
            Some(token) => TokenStatus::Valid {
                expires_at: token.expires_at,
            },
        }
    }

    /// Return a usable access token, refreshing it first when it has expired.
    ///
    /// The credential file is re-read first, so a token stored by another
    /// process since the last run is used. A refreshed token is written to
    /// the credential store before returning.
    pub async fn ensure_fresh(&mut self, now: DateTime<Utc>) -> Result<FreshToken, SyncError> {
        self.reload()?;
        let token = self.store.trakt_token().ok_or_else(|| {
            SyncError::Authentication("Not connected to Trakt. Run `watchlog connect` first".to_string())
        })?;

        if !token.is_expired_at(now) {
            return Ok(FreshToken {
                access_token: token.access_token,
                refreshed: false,
            });
        }

        info!("Trakt access token expired at {}, refreshing", token.expires_at);
        let refreshed = self.provider.refresh(&token.refresh_token).await.map_err(|e| {
            warn!("Trakt token refresh failed: {}", e);
            SyncError::Authentication(format!("Token refresh failed, please reconnect: {}", e))
        })?;
        self.persist(&refreshed)?;

        Ok(FreshToken {
            access_token: refreshed.access_token,
            refreshed: true,
        })
    }

    /// Exchange an authorization code and store the resulting token.
    pub async fn connect(&mut self, code: &str) -> Result<TokenRecord, SyncError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SyncError::Authentication("Authorization code cannot be empty".to_string()));
        }
        self.reload()?;
        let token = self
            .provider
            .exchange_code(code)
            .await
            .map_err(|e| SyncError::Authentication(format!("Failed to exchange authorization code: {}", e)))?;
        self.persist(&token)?;
        info!("Connected to Trakt, token expires at {}", token.expires_at);
        Ok(token)
    }

    pub fn disconnect(&mut self) -> Result<(), SyncError> {
        self.reload()?;
        self.store.clear_trakt_token();
        self.save()
    }

    fn reload(&mut self) -> Result<(), SyncError> {
        let path = self.store.path().to_path_buf();
        let store = CredentialStore::open(path.clone()).map_err(|e| {
            SyncError::Authentication(format!("Failed to load credentials from {}: {}", path.display(), e))
        })?;
        self.store = store;
        Ok(())
    }

    fn persist(&mut self, token: &TokenRecord) -> Result<(), SyncError> {
        self.store.set_trakt_token(token);
        self.save()
    }

    fn save(&self) -> Result<(), SyncError> {
        self.store.save().map_err(|e| {
            SyncError::Authentication(format!(
                "Failed to save credentials to {}: {}",
                self.store.path().display(),
                e
            ))
        })
    }
}
