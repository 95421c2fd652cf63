pub mod auth;
pub mod backup;
pub mod client;
pub mod config;
pub mod identifier;
pub mod interface;
pub mod iterator;
pub mod projection;
pub mod table;
pub mod r#trait;
pub mod types;

pub use auth::{AccessToken, ClientCredentials};
pub use backup::{run_backup, BackupOptions, BackupSummary, BackupTarget};
pub use client::SpotifyClientImpl;
pub use config::BackupConfig;
pub use identifier::{EntityType, Identifier};
pub use interface::SpotifyInterface;
pub use iterator::{
    AsyncPaginatedIterator, BatchSource, ClientFeatures, FeatureBatches, PageIterator, PageSource,
    PlaylistItems, UserPlaylists,
};
pub use projection::{
    project, project_features, project_playlist, project_track, Cell, Column, Field,
    ProjectedRow, Schema, AUDIO_FEATURES_SCHEMA, PLAYLIST_SCHEMA, TRACK_SCHEMA,
};
pub use r#trait::SpotifyClient;
pub use table::Table;
pub use types::{CollectionPage, SpotifyBackupError, MAX_FEATURES_BATCH};

#[cfg(feature = "mock")]
pub use r#trait::MockSpotifyClient;

pub type Result<T> = std::result::Result<T, SpotifyBackupError>;
