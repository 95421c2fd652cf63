use crate::{CollectionPage, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Trait for the Spotify Web API operations the backup needs, so they can be mocked.
///
/// This trait abstracts the remote service behind the handful of calls used by the
/// pagination and projection layer: two paged listings, two single-entity lookups and
/// the bulk audio-features lookup. Records are returned as raw JSON; flattening them
/// is the job of [`projection`](crate::projection).
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockSpotifyClient`
/// that implements this trait using the `mockall` library.
///
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait(?Send)]
pub trait SpotifyClient {
    /// Fetch one page of the playlists of `user_id`, starting at `offset`.
    async fn user_playlists_page(&self, user_id: &str, offset: u32) -> Result<CollectionPage>;

    /// Fetch one page of the items of a playlist, starting at `offset`.
    ///
    /// Items are `{added_at, track}` wrappers; `track` is null for deleted tracks.
    async fn playlist_items_page(&self, playlist_uri: &str, offset: u32)
        -> Result<CollectionPage>;

    /// Look up a playlist. Fails with `NotFound` for unknown or private playlists.
    async fn playlist(&self, playlist_uri: &str) -> Result<Value>;

    /// Look up a track. Fails with `NotFound` for unknown tracks.
    async fn track(&self, track_uri: &str) -> Result<Value>;

    /// Fetch audio features for up to [`MAX_FEATURES_BATCH`](crate::MAX_FEATURES_BATCH)
    /// tracks, answering `None` for tracks without features, in input order.
    async fn audio_features(&self, track_uris: &[String]) -> Result<Vec<Option<Value>>>;
}
