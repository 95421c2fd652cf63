use crate::{Result, SpotifyBackupError, MAX_FEATURES_BATCH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::iterator::DEFAULT_MAX_PAGES;

pub const ENV_CLIENT_ID: &str = "SPOTIFY_BACKUP_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_BACKUP_CLIENT_SECRET";
pub const ENV_USER: &str = "SPOTIFY_BACKUP_USER";

const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";

fn default_requests_timeout() -> u64 {
    10
}

fn default_features_batch_size() -> usize {
    MAX_FEATURES_BATCH
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_accounts_url() -> String {
    DEFAULT_ACCOUNTS_URL.to_string()
}

/// Settings for a backup run.
///
/// Loaded from a JSON file of the form
///
/// ```json
/// {
///     "client_id": "...",
///     "secret": "...",
///     "user": "spotify_user_id",
///     "requests_timeout": 10
/// }
/// ```
///
/// stored by default at `~/.config/spotify-backup/config.json`. The environment
/// variables `SPOTIFY_BACKUP_CLIENT_ID`, `SPOTIFY_BACKUP_CLIENT_SECRET` and
/// `SPOTIFY_BACKUP_USER` take precedence over the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Application client ID from the Spotify developer dashboard
    pub client_id: String,
    /// Application client secret
    #[serde(rename = "secret", alias = "client_secret")]
    pub client_secret: String,
    /// Default user whose playlists are backed up (ID, URI or profile link)
    pub user: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_requests_timeout")]
    pub requests_timeout: u64,
    /// Number of tracks per audio-features request (1..=100)
    #[serde(default = "default_features_batch_size")]
    pub features_batch_size: usize,
    /// Upper bound on pages fetched per collection
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Base URL of the Web API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Token endpoint for the client-credentials grant
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
}

impl BackupConfig {
    /// Create a config with default limits and endpoints.
    pub fn new(client_id: &str, client_secret: &str, user: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            user: user.to_string(),
            requests_timeout: default_requests_timeout(),
            features_batch_size: default_features_batch_size(),
            max_pages: default_max_pages(),
            api_base_url: default_api_base_url(),
            accounts_url: default_accounts_url(),
        }
    }

    /// Get the default config file path using XDG directories.
    ///
    /// Returns a path like: `~/.config/spotify-backup/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            SpotifyBackupError::InvalidConfig("Cannot determine XDG config directory".to_string())
        })?;
        Ok(config_dir.join("spotify-backup").join("config.json"))
    }

    /// Parse a config file, apply environment overrides and validate the result.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            SpotifyBackupError::InvalidConfig(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_json(&json)?.with_env_overrides();
        config.validate()?;

        log::debug!("Config loaded from: {}", path.display());
        Ok(config)
    }

    /// Load `path` (or the default path), falling back to the environment alone when
    /// the file does not exist.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if path.exists() {
            return Self::load(&path);
        }

        log::debug!(
            "No config file at {}, reading settings from the environment",
            path.display()
        );
        let config = Self::from_lookup(|key| std::env::var(key).ok()).ok_or_else(|| {
            SpotifyBackupError::InvalidConfig(format!(
                "No config file at {} and {ENV_CLIENT_ID}, {ENV_CLIENT_SECRET} and {ENV_USER} are not all set",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SpotifyBackupError::InvalidConfig(format!("Invalid config JSON: {e}")))
    }

    /// Build a config purely from variables provided by `lookup`.
    ///
    /// Returns `None` unless the client ID, secret and user are all present.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Option<Self> {
        Some(Self::new(
            &lookup(ENV_CLIENT_ID)?,
            &lookup(ENV_CLIENT_SECRET)?,
            &lookup(ENV_USER)?,
        ))
    }

    /// Replace credentials and user with values from the process environment, when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Replace credentials and user with values provided by `lookup`, when present.
    pub fn with_overrides<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Self {
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            self.client_id = client_id;
        }
        if let Some(client_secret) = lookup(ENV_CLIENT_SECRET) {
            self.client_secret = client_secret;
        }
        if let Some(user) = lookup(ENV_USER) {
            self.user = user;
        }
        self
    }

    /// Check that the settings can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(SpotifyBackupError::InvalidConfig(
                "client_id and secret must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_FEATURES_BATCH).contains(&self.features_batch_size) {
            return Err(SpotifyBackupError::InvalidConfig(format!(
                "features_batch_size must be between 1 and {MAX_FEATURES_BATCH}, got {}",
                self.features_batch_size
            )));
        }
        if self.max_pages == 0 {
            return Err(SpotifyBackupError::InvalidConfig(
                "max_pages must be at least 1".to_string(),
            ));
        }
        if self.requests_timeout == 0 {
            return Err(SpotifyBackupError::InvalidConfig(
                "requests_timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.requests_timeout)
    }

    /// Set the per-request timeout in seconds
    pub fn with_requests_timeout(mut self, seconds: u64) -> Self {
        self.requests_timeout = seconds;
        self
    }

    /// Set the audio-features batch size
    pub fn with_features_batch_size(mut self, batch_size: usize) -> Self {
        self.features_batch_size = batch_size;
        self
    }

    /// Set the per-collection page bound
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Point the client at another Web API and token endpoint (used by tests)
    pub fn with_endpoints(mut self, api_base_url: &str, accounts_url: &str) -> Self {
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self.accounts_url = accounts_url.to_string();
        self
    }
}
