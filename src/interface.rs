use crate::config::BackupConfig;
use crate::identifier::{EntityType, Identifier};
use crate::iterator::{
    AsyncPaginatedIterator, ClientFeatures, FeatureBatches, PageIterator, PlaylistItems,
    UserPlaylists,
};
use crate::projection::{
    project_features, project_playlist, project_track, ProjectedRow, AUDIO_FEATURES_SCHEMA,
    TRACK_SCHEMA,
};
use crate::r#trait::SpotifyClient;
use crate::table::Table;
use crate::{Result, SpotifyBackupError};

use serde_json::{json, Value};

/// High-level operations of a playlist backup.
///
/// Wraps a [`SpotifyClient`] and the run's [`BackupConfig`], resolves identifiers once,
/// and composes the pagination, lookup and projection layers into the rows and tables
/// written to disk.
///
/// Failed single-entity lookups (`NotFound`) are logged and degrade to all-null rows.
/// Any other failure, including a failed page or batch fetch, is returned to the caller.
pub struct SpotifyInterface<C: SpotifyClient> {
    client: C,
    config: BackupConfig,
}

impl<C: SpotifyClient> SpotifyInterface<C> {
    pub fn new(client: C, config: BackupConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// The user ID for `user`, or the configured default user when `None`.
    pub fn user_id(&self, user: Option<&Identifier>) -> Result<String> {
        match user {
            Some(user) => user.to_id(EntityType::User),
            None => Identifier::parse(&self.config.user).to_id(EntityType::User),
        }
    }

    /// Lazily list every playlist of `user` (default: the configured user).
    pub fn list_all_playlists(
        &self,
        user: Option<&Identifier>,
    ) -> Result<PageIterator<UserPlaylists<'_, C>>> {
        let user_id = self.user_id(user)?;
        Ok(PageIterator::with_max_pages(
            UserPlaylists::new(&self.client, user_id),
            self.config.max_pages,
        ))
    }

    /// Lazily list every item (`{added_at, track}`) of a playlist.
    pub fn list_all_tracks(
        &self,
        playlist: &Identifier,
    ) -> Result<PageIterator<PlaylistItems<'_, C>>> {
        let playlist_uri = playlist.to_uri(EntityType::Playlist)?;
        Ok(PageIterator::with_max_pages(
            PlaylistItems::new(&self.client, playlist_uri),
            self.config.max_pages,
        ))
    }

    /// The raw playlist record, looked up when only an ID or URI is known.
    ///
    /// Returns `Ok(None)` when the playlist does not exist.
    pub async fn resolve_playlist(&self, playlist: &Identifier) -> Result<Option<Value>> {
        if let Some(record) = playlist.as_record() {
            return Ok(Some(record.clone()));
        }

        let uri = playlist.to_uri(EntityType::Playlist)?;
        match self.client.playlist(&uri).await {
            Ok(record) => Ok(Some(record)),
            Err(SpotifyBackupError::NotFound(_)) => {
                log::warn!("Could not find playlist for uri {uri}.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The track as a playlist item (`{added_at, track}`), looked up when only an ID or
    /// URI is known.
    ///
    /// Looked-up tracks carry a null `added_at`. Returns `Ok(None)` when the track does
    /// not exist.
    pub async fn resolve_track(&self, track: &Identifier) -> Result<Option<Value>> {
        if let Some(record) = track.as_record() {
            if record.get("track").is_some() {
                return Ok(Some(record.clone()));
            }
            return Ok(Some(as_playlist_item(record.clone())));
        }

        let uri = track.to_uri(EntityType::Track)?;
        match self.client.track(&uri).await {
            Ok(record) => Ok(Some(as_playlist_item(record))),
            Err(SpotifyBackupError::NotFound(_)) => {
                log::warn!("Could not find track for uri {uri}.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Playlist metadata row; all-null when the playlist cannot be found.
    pub async fn playlist_info(&self, playlist: &Identifier) -> Result<ProjectedRow> {
        let record = self.resolve_playlist(playlist).await?;
        Ok(project_playlist(record.as_ref()))
    }

    /// Track metadata row; all-null when the track cannot be found.
    pub async fn track_info(&self, track: &Identifier) -> Result<ProjectedRow> {
        let record = self.resolve_track(track).await?;
        Ok(project_track(record.as_ref()))
    }

    /// Lazily fetch audio features for `tracks`, batched by the configured batch size.
    pub fn audio_features(
        &self,
        tracks: &[Identifier],
    ) -> Result<FeatureBatches<ClientFeatures<'_, C>>> {
        let uris = tracks
            .iter()
            .map(|track| track.to_uri(EntityType::Track))
            .collect::<Result<Vec<_>>>()?;
        FeatureBatches::new(
            ClientFeatures::new(&self.client),
            uris,
            self.config.features_batch_size,
        )
    }

    /// One row per playlist item, in playlist order, including all-null rows for
    /// deleted tracks.
    pub async fn playlist_tracks_table(&self, playlist: &Identifier) -> Result<Table> {
        let mut items = self.list_all_tracks(playlist)?;
        let mut table = Table::new(&TRACK_SCHEMA);
        while let Some(item) = items.next().await? {
            table.push(project_track(Some(&item)))?;
        }
        log::debug!(
            "Retrieved {} tracks in {} pages from {}",
            table.len(),
            items.current_page(),
            playlist
        );
        Ok(table)
    }

    /// Audio-feature rows aligned with `uris`.
    ///
    /// URIs that are not catalogue tracks (local files, episodes) are not sent to the
    /// service and get an all-null row in their position.
    pub async fn features_table(&self, uris: &[String]) -> Result<Table> {
        let lookups: Vec<Identifier> = uris
            .iter()
            .filter(|uri| is_catalogue_track(uri))
            .map(|uri| Identifier::Uri(uri.clone()))
            .collect();
        let mut fetched = self.audio_features(&lookups)?.collect_all().await?.into_iter();

        let rows = uris.iter().map(|uri| {
            if is_catalogue_track(uri) {
                project_features(fetched.next().flatten().as_ref())
            } else {
                project_features(None)
            }
        });
        Table::from_rows(&AUDIO_FEATURES_SCHEMA, rows)
    }

    /// The backup table of one playlist.
    ///
    /// Rows of unavailable tracks are dropped; with `include_audio_features` the
    /// audio-feature columns are appended to every remaining row.
    pub async fn playlist_table(
        &self,
        playlist: &Identifier,
        include_audio_features: bool,
    ) -> Result<Table> {
        let mut table = self.playlist_tracks_table(playlist).await?;

        let dropped = table.retain_non_null("uri")?;
        if dropped > 0 {
            log::info!("Skipped {dropped} unavailable tracks in {playlist}");
        }

        if !include_audio_features {
            return Ok(table);
        }

        let uris: Vec<String> = table
            .column("uri")
            .unwrap_or_default()
            .into_iter()
            .map(|cell| cell.to_string())
            .collect();
        let features = self.features_table(&uris).await?;
        table.hconcat(features)
    }
}

fn as_playlist_item(track: Value) -> Value {
    json!({ "added_at": null, "track": track })
}

fn is_catalogue_track(uri: &str) -> bool {
    Identifier::Uri(uri.to_string())
        .to_id(EntityType::Track)
        .is_ok()
}
