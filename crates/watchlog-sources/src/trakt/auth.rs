use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use watchlog_config::{TokenRecord, TraktConfig};

use crate::error::SourceError;

const TOKEN_URL: &str = "https://api.trakt.tv/oauth/token";
const TOKEN_ENDPOINT: &str = "/oauth/token";
const AUTHORIZE_URL: &str = "https://trakt.tv/oauth/authorize";

pub fn create_trakt_client() -> Client {
    Client::builder()
        .user_agent(concat!("watchlog/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// URL the user opens in a browser to obtain an authorization code.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri)
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    /// Unix seconds; absent on some proxies, in which case "now" is used.
    #[serde(default)]
    created_at: Option<i64>,
}

impl TokenResponse {
    /// Fails when `expires_in` does not fit a valid expiry timestamp.
    pub(crate) fn into_record(self, now: DateTime<Utc>) -> Result<TokenRecord, SourceError> {
        let issued_at = self
            .created_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(now);
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                SourceError::malformed(TOKEN_ENDPOINT, format!("expires_in {} is out of range", self.expires_in))
            })?;
        Ok(TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

pub async fn exchange_code(
    client: &Client,
    config: &TraktConfig,
    code: &str,
) -> Result<TokenRecord, SourceError> {
    let payload = serde_json::json!({
        "code": code,
        "client_id": config.client_id,
        "client_secret": config.client_secret,
        "redirect_uri": config.redirect_uri,
        "grant_type": "authorization_code"
    });
    request_token(client, &payload).await
}

pub async fn refresh_access_token(
    client: &Client,
    config: &TraktConfig,
    refresh_token: &str,
) -> Result<TokenRecord, SourceError> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": config.client_id,
        "client_secret": config.client_secret,
        "redirect_uri": config.redirect_uri,
        "grant_type": "refresh_token"
    });
    request_token(client, &payload).await
}

async fn request_token(
    client: &Client,
    payload: &serde_json::Value,
) -> Result<TokenRecord, SourceError> {
    let response = client
        .post(TOKEN_URL)
        .json(payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http {
            endpoint: TOKEN_ENDPOINT.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    let token: TokenResponse = serde_json::from_str(&body).map_err(|source| SourceError::Decode {
        endpoint: TOKEN_ENDPOINT.to_string(),
        source,
    })?;
    let record = token.into_record(Utc::now())?;
    debug!("Obtained Trakt token expiring at {}", record.expires_at);
    Ok(record)
}
