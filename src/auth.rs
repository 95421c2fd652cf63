use crate::{Result, SpotifyBackupError};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Tokens are renewed this long before Spotify would reject them.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Application credentials for the OAuth client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    /// URL-encoded form body for the token request.
    pub fn form_body(&self) -> String {
        [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// A bearer token together with the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Decode a successful token endpoint response received at `now`.
    pub fn from_response(body: &str, now: DateTime<Utc>) -> Result<Self> {
        let response: TokenResponse = serde_json::from_str(body)
            .map_err(|e| SpotifyBackupError::Parse(format!("token response: {e}")))?;

        if let Some(token_type) = &response.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(SpotifyBackupError::Auth(format!(
                    "unexpected token type '{token_type}'"
                )));
            }
        }

        Ok(Self {
            value: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        })
    }

    /// Turn a rejected token request into an [`Auth`](SpotifyBackupError::Auth) error.
    pub fn error_from_response(status: u16, body: &str) -> SpotifyBackupError {
        match serde_json::from_str::<TokenError>(body) {
            Ok(TokenError {
                error,
                error_description: Some(description),
            }) => SpotifyBackupError::Auth(format!("{error}: {description}")),
            Ok(TokenError { error, .. }) => SpotifyBackupError::Auth(error),
            Err(_) => SpotifyBackupError::Auth(format!("token request failed with status {status}")),
        }
    }

    /// Whether the token should be renewed before the next request.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}
