use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ACCESS_TOKEN_KEY: &str = "trakt_access_token";
const REFRESH_TOKEN_KEY: &str = "trakt_refresh_token";
const TOKEN_EXPIRES_KEY: &str = "trakt_token_expires";

/// OAuth token pair plus the absolute instant the access token stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    /// Create a store and load it from disk in one step.
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    /// The stored Trakt token, if all three parts are present and readable.
    pub fn trakt_token(&self) -> Option<TokenRecord> {
        let access_token = self.get(ACCESS_TOKEN_KEY)?.clone();
        let refresh_token = self.get(REFRESH_TOKEN_KEY)?.clone();
        let expires_at = self
            .get(TOKEN_EXPIRES_KEY)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))?;
        Some(TokenRecord {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Replace the whole token record.
    pub fn set_trakt_token(&mut self, token: &TokenRecord) {
        self.set(ACCESS_TOKEN_KEY.to_string(), token.access_token.clone());
        self.set(REFRESH_TOKEN_KEY.to_string(), token.refresh_token.clone());
        self.set(TOKEN_EXPIRES_KEY.to_string(), token.expires_at.to_rfc3339());
    }

    pub fn clear_trakt_token(&mut self) {
        self.remove(ACCESS_TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
        self.remove(TOKEN_EXPIRES_KEY);
    }

    pub fn has_trakt_token(&self) -> bool {
        self.trakt_token().is_some()
    }
}
