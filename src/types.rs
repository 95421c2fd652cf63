//! Data types shared across the crate.
//!
//! This module contains the page envelope returned by Spotify's listing endpoints,
//! the service limits the client and batch fetcher must respect, and the crate-wide
//! error type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ================================================================================================
// SERVICE LIMITS
// ================================================================================================

/// Maximum number of track IDs accepted by the bulk audio-features endpoint.
pub const MAX_FEATURES_BATCH: usize = 100;

/// Page size requested when listing a user's playlists (the endpoint maximum).
pub const PLAYLISTS_PAGE_SIZE: u32 = 50;

/// Page size requested when listing the items of a playlist (the endpoint maximum).
pub const PLAYLIST_ITEMS_PAGE_SIZE: u32 = 100;

// ================================================================================================
// PAGINATION
// ================================================================================================

/// One page of a paginated Spotify collection.
///
/// Spotify wraps every listing response in the same envelope. `next` holds the URL
/// of the following page and is `null` on the final page; this crate only uses it as
/// a presence marker and advances its own offset by `limit`.
///
/// # Examples
///
/// ```rust
/// use spotify_backup::CollectionPage;
///
/// let page: CollectionPage = serde_json::from_str(
///     r#"{"items": [{"name": "a"}], "limit": 50, "next": null, "offset": 0, "total": 1}"#,
/// ).unwrap();
///
/// assert_eq!(page.items.len(), 1);
/// assert!(page.is_last());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPage {
    /// Raw records on this page, in service order
    #[serde(default)]
    pub items: Vec<Value>,
    /// Page size used by the service for this response
    pub limit: u32,
    /// Marker for a following page; absent on the last page
    #[serde(default)]
    pub next: Option<String>,
    /// Offset of the first item, as reported by the service
    #[serde(default)]
    pub offset: u32,
    /// Total number of items in the collection, if reported
    #[serde(default)]
    pub total: Option<u32>,
}

impl CollectionPage {
    /// Whether this is the final page of the collection.
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    /// Total number of pages implied by `total` and `limit`, if both are known.
    pub fn total_pages(&self) -> Option<u32> {
        match (self.total, self.limit) {
            (Some(_), 0) => None,
            (Some(total), limit) => Some(total.div_ceil(limit).max(1)),
            (None, _) => None,
        }
    }
}

// ================================================================================================
// ERROR TYPES
// ================================================================================================

/// Error types for Spotify backup operations.
///
/// Failures fall into three groups:
///
/// - **Lookups**: [`NotFound`](Self::NotFound) is returned by the client when an entity
///   was deleted or is private. [`SpotifyInterface`](crate::SpotifyInterface) recovers
///   from it locally and degrades the affected row to nulls.
/// - **Transport**: [`Http`](Self::Http), [`Auth`](Self::Auth) and
///   [`RateLimit`](Self::RateLimit) propagate to the caller unchanged. No retries are
///   performed inside this crate.
/// - **Local**: identifier, configuration, pagination-guard and file errors.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use spotify_backup::{BackupConfig, Identifier, SpotifyBackupError, SpotifyClientImpl, SpotifyInterface};
///
/// #[tokio::main]
/// async fn main() {
///     let config = BackupConfig::new("client-id", "client-secret", "some_user");
///     let client = SpotifyClientImpl::from_config(
///         Box::new(http_client::native::NativeClient::new()),
///         &config,
///     );
///     let interface = SpotifyInterface::new(client, config);
///
///     match interface.playlist_table(&Identifier::parse("37i9dQZF1DXcBWIGoYBM5M"), true).await {
///         Ok(table) => println!("{} tracks", table.len()),
///         Err(SpotifyBackupError::Auth(msg)) => eprintln!("Check your credentials: {msg}"),
///         Err(SpotifyBackupError::RateLimit { retry_after }) => {
///             eprintln!("Rate limited, retry in {retry_after} seconds");
///         }
///         Err(e) => eprintln!("Other error: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum SpotifyBackupError {
    /// HTTP/network related errors.
    ///
    /// Connection failures, timeouts and unexpected status codes.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failures.
    ///
    /// The token endpoint rejected the client credentials, or the API answered
    /// 401/403 for a request.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limiting from the Web API.
    ///
    /// The `retry_after` field carries the `Retry-After` header value in seconds.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimit {
        /// Number of seconds to wait before retrying
        retry_after: u64,
    },

    /// A looked-up playlist or track does not exist (or is not visible).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input that is neither a bare ID, a URI/share link of the expected type,
    /// nor a record carrying a `uri`/`id` field.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Failed to decode a response from the Web API.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A traversal fetched more pages than the configured bound allows.
    ///
    /// This protects against a service that keeps reporting a next page.
    #[error("Pagination stopped after {pages} pages without reaching the last page")]
    PaginationLimit {
        /// Number of pages fetched before giving up
        pages: u32,
    },

    /// Invalid configuration values or a missing configuration file.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rows or tables whose columns do not line up with the table they are combined with.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// CSV serialization errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpotifyBackupError {
    /// Whether this error is a remote call failure that the caller may choose to skip.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SpotifyBackupError::Http(_)
                | SpotifyBackupError::Auth(_)
                | SpotifyBackupError::RateLimit { .. }
                | SpotifyBackupError::Parse(_)
        )
    }
}

// ================================================================================================
// TESTS
// ================================================================================================
