use crate::auth::{AccessToken, ClientCredentials};
use crate::config::BackupConfig;
use crate::identifier::{EntityType, Identifier};
use crate::r#trait::SpotifyClient;
use crate::types::{PLAYLISTS_PAGE_SIZE, PLAYLIST_ITEMS_PAGE_SIZE};
use crate::{CollectionPage, Result, SpotifyBackupError, MAX_FEATURES_BATCH};

use async_trait::async_trait;
use chrono::Utc;
use http_client::{HttpClient, Request, Response};
use http_types::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Client for the Spotify Web API.
///
/// Authenticates with the OAuth client-credentials grant, caches the bearer token and
/// renews it shortly before it expires. Every request is bounded by the configured
/// timeout. Responses are mapped onto [`SpotifyBackupError`]: 401/403 become `Auth`,
/// 404 becomes `NotFound`, 429 becomes `RateLimit`, and any other non-success status
/// becomes `Http`. Nothing is retried here.
///
/// # Examples
///
/// ```rust,no_run
/// use spotify_backup::{AsyncPaginatedIterator, BackupConfig, SpotifyClientImpl, SpotifyInterface};
///
/// # tokio_test::block_on(async {
/// let config = BackupConfig::new("client-id", "client-secret", "some_user");
/// let client = SpotifyClientImpl::from_config(
///     Box::new(http_client::native::NativeClient::new()),
///     &config,
/// );
/// let interface = SpotifyInterface::new(client, config);
///
/// let mut playlists = interface.list_all_playlists(None)?;
/// while let Some(playlist) = playlists.next().await? {
///     println!("{}", playlist["name"]);
/// }
/// # Ok::<(), spotify_backup::SpotifyBackupError>(())
/// # });
/// ```
pub struct SpotifyClientImpl {
    client: Box<dyn HttpClient>,
    credentials: ClientCredentials,
    api_base_url: String,
    accounts_url: String,
    timeout: Duration,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct AudioFeaturesResponse {
    audio_features: Vec<Option<Value>>,
}

impl SpotifyClientImpl {
    /// Create a client for the public Spotify endpoints.
    pub fn new(client: Box<dyn HttpClient>, credentials: ClientCredentials) -> Self {
        let defaults = BackupConfig::new("", "", "");
        Self {
            client,
            credentials,
            timeout: defaults.timeout(),
            api_base_url: defaults.api_base_url,
            accounts_url: defaults.accounts_url,
            token: Mutex::new(None),
        }
    }

    /// Create a client with the credentials, endpoints and timeout of `config`.
    pub fn from_config(client: Box<dyn HttpClient>, config: &BackupConfig) -> Self {
        Self {
            client,
            credentials: ClientCredentials::new(&config.client_id, &config.client_secret),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            accounts_url: config.accounts_url.clone(),
            timeout: config.timeout(),
            token: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, requesting a new one when none is cached or the
    /// cached one is about to expire.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let cached = self.lock_token().clone();
        if let Some(token) = cached {
            if !token.is_expired(Utc::now()) {
                return Ok(token);
            }
            log::debug!("Access token expired, requesting a new one");
        }

        let token = self.request_token().await?;
        *self.lock_token() = Some(token.clone());
        Ok(token)
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<AccessToken>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_token(&self) -> Result<AccessToken> {
        log::debug!("Requesting client-credentials token from {}", self.accounts_url);

        let mut request = Request::new(Method::Post, parse_url(&self.accounts_url)?);
        let _ = request.insert_header("Content-Type", "application/x-www-form-urlencoded");
        let _ = request.insert_header("Accept", "application/json");
        request.set_body(self.credentials.form_body());

        let mut response = self.send(request).await?;
        let status: u16 = response.status().into();
        let body = read_body(&mut response).await?;

        if status != 200 {
            return Err(AccessToken::error_from_response(status, &body));
        }

        AccessToken::from_response(&body, Utc::now())
    }

    async fn send(&self, request: Request) -> Result<Response> {
        match tokio::time::timeout(self.timeout, self.client.send(request)).await {
            Ok(response) => response.map_err(|e| SpotifyBackupError::Http(e.to_string())),
            Err(_) => Err(SpotifyBackupError::Http(format!(
                "request timed out after {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }

    /// GET `path` relative to the API base URL and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base_url, path);
        let token = self.access_token().await?;

        log::debug!("GET {url}");
        let mut request = Request::new(Method::Get, parse_url(&url)?);
        request
            .insert_header("Authorization", token.bearer().as_str())
            .map_err(|e| SpotifyBackupError::Auth(format!("invalid bearer header: {e}")))?;
        let _ = request.insert_header("Accept", "application/json");

        let mut response = self.send(request).await?;
        let status: u16 = response.status().into();

        match status {
            200..=299 => {
                let body = read_body(&mut response).await?;
                serde_json::from_str(&body)
                    .map_err(|e| SpotifyBackupError::Parse(format!("{url}: {e}")))
            }
            401 | 403 => {
                // A rejected token is dropped so the next call starts a fresh grant
                *self.lock_token() = None;
                let body = read_body(&mut response).await.unwrap_or_default();
                Err(SpotifyBackupError::Auth(format!(
                    "{url} answered {status}: {}",
                    api_error_message(&body)
                )))
            }
            404 => Err(SpotifyBackupError::NotFound(url)),
            429 => {
                let retry_after = response
                    .header("Retry-After")
                    .and_then(|values| values.last().as_str().trim().parse().ok())
                    .unwrap_or(1);
                log::warn!("Rate limited on {url}, server asked to wait {retry_after}s");
                Err(SpotifyBackupError::RateLimit { retry_after })
            }
            _ => {
                let body = read_body(&mut response).await.unwrap_or_default();
                Err(SpotifyBackupError::Http(format!(
                    "{url} answered {status}: {}",
                    api_error_message(&body)
                )))
            }
        }
    }
}

#[async_trait(?Send)]
impl SpotifyClient for SpotifyClientImpl {
    async fn user_playlists_page(&self, user_id: &str, offset: u32) -> Result<CollectionPage> {
        self.get_json(&format!(
            "/users/{}/playlists?limit={PLAYLISTS_PAGE_SIZE}&offset={offset}",
            urlencoding::encode(user_id)
        ))
        .await
    }

    async fn playlist_items_page(
        &self,
        playlist_uri: &str,
        offset: u32,
    ) -> Result<CollectionPage> {
        let id = Identifier::parse(playlist_uri).to_id(EntityType::Playlist)?;
        self.get_json(&format!(
            "/playlists/{id}/tracks?limit={PLAYLIST_ITEMS_PAGE_SIZE}&offset={offset}&additional_types=track"
        ))
        .await
    }

    async fn playlist(&self, playlist_uri: &str) -> Result<Value> {
        let id = Identifier::parse(playlist_uri).to_id(EntityType::Playlist)?;
        self.get_json(&format!("/playlists/{id}")).await
    }

    async fn track(&self, track_uri: &str) -> Result<Value> {
        let id = Identifier::parse(track_uri).to_id(EntityType::Track)?;
        self.get_json(&format!("/tracks/{id}")).await
    }

    async fn audio_features(&self, track_uris: &[String]) -> Result<Vec<Option<Value>>> {
        if track_uris.is_empty() {
            return Ok(Vec::new());
        }
        if track_uris.len() > MAX_FEATURES_BATCH {
            return Err(SpotifyBackupError::InvalidConfig(format!(
                "audio features accept at most {MAX_FEATURES_BATCH} tracks per request, got {}",
                track_uris.len()
            )));
        }

        let ids = track_uris
            .iter()
            .map(|uri| Identifier::parse(uri).to_id(EntityType::Track))
            .collect::<Result<Vec<_>>>()?;

        let response: AudioFeaturesResponse = self
            .get_json(&format!("/audio-features?ids={}", ids.join(",")))
            .await?;
        Ok(response.audio_features)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    url.parse::<Url>()
        .map_err(|e| SpotifyBackupError::Http(format!("invalid URL '{url}': {e}")))
}

async fn read_body(response: &mut Response) -> Result<String> {
    response
        .body_string()
        .await
        .map_err(|e| SpotifyBackupError::Http(e.to_string()))
}

/// Pull `error.message` out of a Web API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
