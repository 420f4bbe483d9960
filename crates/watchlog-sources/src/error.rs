use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{endpoint} returned {status}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed {endpoint} payload: {message}")]
    Malformed { endpoint: String, message: String },
}

impl SourceError {
    pub fn malformed(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// True when the remote side rejected our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SourceError::Http { status: 401 | 403, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Http { status, .. } => Some(*status),
            SourceError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
