#![allow(dead_code)]
use async_trait::async_trait;
use serde_json::{json, Value};
use spotify_backup::{CollectionPage, Result, SpotifyBackupError, SpotifyClient};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

// =============================================================================
// FAKE SPOTIFY SERVICE
// =============================================================================

/// In-memory Spotify catalogue serving pages of a configurable size.
///
/// Every call is recorded in `calls` as `"<operation> <argument>"`.
pub struct FakeSpotify {
    pub page_size: u32,
    pub user_playlists: HashMap<String, Vec<Value>>,
    pub playlist_items: HashMap<String, Vec<Value>>,
    pub tracks: HashMap<String, Value>,
    pub features: HashMap<String, Value>,
    /// Playlist URIs whose item listing fails with a transport error
    pub failing_playlists: HashSet<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeSpotify {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            user_playlists: HashMap::new(),
            playlist_items: HashMap::new(),
            tracks: HashMap::new(),
            features: HashMap::new(),
            failing_playlists: HashSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Register a playlist of `owner` with its items.
    pub fn with_playlist(mut self, owner: &str, playlist: Value, items: Vec<Value>) -> Self {
        let uri = playlist["uri"].as_str().unwrap_or_default().to_string();
        for item in &items {
            if let Some(uri) = item["track"]["uri"].as_str() {
                self.tracks.insert(uri.to_string(), item["track"].clone());
            }
        }
        self.user_playlists
            .entry(owner.to_string())
            .or_default()
            .push(playlist);
        self.playlist_items.insert(uri, items);
        self
    }

    pub fn with_features(mut self, track_uri: &str, features: Value) -> Self {
        self.features.insert(track_uri.to_string(), features);
        self
    }

    pub fn with_failing_playlist(mut self, playlist_uri: &str) -> Self {
        self.failing_playlists.insert(playlist_uri.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &str, argument: impl std::fmt::Display) {
        self.calls
            .borrow_mut()
            .push(format!("{operation} {argument}"));
    }

    fn page(&self, all: &[Value], offset: u32, base: &str) -> CollectionPage {
        let start = (offset as usize).min(all.len());
        let end = (start + self.page_size as usize).min(all.len());
        CollectionPage {
            items: all[start..end].to_vec(),
            limit: self.page_size,
            next: (end < all.len()).then(|| format!("{base}?offset={end}")),
            offset,
            total: Some(all.len() as u32),
        }
    }
}

#[async_trait(?Send)]
impl SpotifyClient for FakeSpotify {
    async fn user_playlists_page(&self, user_id: &str, offset: u32) -> Result<CollectionPage> {
        self.record("user_playlists_page", format!("{user_id}@{offset}"));
        let playlists = self
            .user_playlists
            .get(user_id)
            .ok_or_else(|| SpotifyBackupError::NotFound(format!("user {user_id}")))?;
        Ok(self.page(playlists, offset, &format!("/users/{user_id}/playlists")))
    }

    async fn playlist_items_page(
        &self,
        playlist_uri: &str,
        offset: u32,
    ) -> Result<CollectionPage> {
        self.record("playlist_items_page", format!("{playlist_uri}@{offset}"));
        if self.failing_playlists.contains(playlist_uri) {
            return Err(SpotifyBackupError::Http("connection reset".to_string()));
        }
        let items = self
            .playlist_items
            .get(playlist_uri)
            .ok_or_else(|| SpotifyBackupError::NotFound(playlist_uri.to_string()))?;
        Ok(self.page(items, offset, &format!("/playlists/{playlist_uri}/tracks")))
    }

    async fn playlist(&self, playlist_uri: &str) -> Result<Value> {
        self.record("playlist", playlist_uri);
        self.user_playlists
            .values()
            .flatten()
            .find(|p| p["uri"] == playlist_uri)
            .cloned()
            .ok_or_else(|| SpotifyBackupError::NotFound(playlist_uri.to_string()))
    }

    async fn track(&self, track_uri: &str) -> Result<Value> {
        self.record("track", track_uri);
        self.tracks
            .get(track_uri)
            .cloned()
            .ok_or_else(|| SpotifyBackupError::NotFound(track_uri.to_string()))
    }

    async fn audio_features(&self, track_uris: &[String]) -> Result<Vec<Option<Value>>> {
        self.record("audio_features", track_uris.len());
        Ok(track_uris
            .iter()
            .map(|uri| self.features.get(uri).cloned())
            .collect())
    }
}

// =============================================================================
// RECORD BUILDERS
// =============================================================================

pub fn playlist_record(id: &str, name: &str, owner: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} description"),
        "uri": format!("spotify:playlist:{id}"),
        "external_urls": {"spotify": format!("https://open.spotify.com/playlist/{id}")},
        "owner": {"display_name": owner, "uri": format!("spotify:user:{owner}")},
        "tracks": {"total": 0}
    })
}

pub fn track_record(id: &str, name: &str, artists: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:track:{id}"),
        "external_urls": {"spotify": format!("https://open.spotify.com/track/{id}")},
        "artists": artists.iter().map(|a| json!({"name": a})).collect::<Vec<_>>(),
        "album": {"name": format!("{name} (album)"), "release_date": "2020-05-01"},
        "duration_ms": 215000,
        "popularity": 42
    })
}

pub fn item(track: Value) -> Value {
    json!({"added_at": "2024-01-01T00:00:00Z", "track": track})
}

pub fn deleted_item() -> Value {
    json!({"added_at": "2024-01-02T00:00:00Z", "track": null})
}

pub fn features_record(id: &str, tempo: f64) -> Value {
    json!({
        "id": id,
        "uri": format!("spotify:track:{id}"),
        "tempo": tempo,
        "time_signature": 4,
        "key": 5,
        "mode": 1,
        "danceability": 0.5,
        "energy": 0.7,
        "speechiness": 0.04,
        "acousticness": 0.1,
        "instrumentalness": 0.0,
        "liveness": 0.2,
        "loudness": -6.5,
        "valence": 0.3
    })
}

// =============================================================================
// STUB HTTP CLIENT
// =============================================================================

/// A request as seen by [`StubHttpClient`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Canned response for [`StubHttpClient`].
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl CannedResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }

    pub fn token(value: &str) -> Self {
        Self::json(
            200,
            json!({"access_token": value, "token_type": "Bearer", "expires_in": 3600}),
        )
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// HTTP client answering from a queue of canned responses and recording every request.
#[derive(Debug, Clone, Default)]
pub struct StubHttpClient {
    responses: Arc<Mutex<VecDeque<CannedResponse>>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl StubHttpClient {
    pub fn new(responses: Vec<CannedResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl http_client::HttpClient for StubHttpClient {
    async fn send(
        &self,
        mut req: http_client::Request,
    ) -> std::result::Result<http_client::Response, http_client::Error> {
        let seen = {
            let header =
                |name: &str| req.header(name).map(|values| values.last().as_str().to_string());
            SeenRequest {
                method: req.method().to_string(),
                url: req.url().to_string(),
                authorization: header("Authorization"),
                content_type: header("Content-Type"),
                body: String::new(),
            }
        };
        let body = req.body_string().await?;
        self.requests.lock().unwrap().push(SeenRequest { body, ..seen });

        let canned = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CannedResponse::json(500, json!({"error": "no canned response"})));

        let mut response = http_client::Response::new(canned.status);
        for (name, value) in &canned.headers {
            response.insert_header(name.as_str(), value.as_str());
        }
        response.set_body(canned.body);
        Ok(response)
    }
}
