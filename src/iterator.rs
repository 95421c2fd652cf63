use crate::r#trait::SpotifyClient;
use crate::{CollectionPage, Result, SpotifyBackupError};

use async_trait::async_trait;
use serde_json::Value;

/// Default upper bound on the number of pages a single traversal may fetch.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Async iterator trait for paginated Spotify data.
///
/// This trait provides a common interface for iterating over paginated collections
/// such as a user's playlists, the items of a playlist, or batched audio features.
/// Implementations fetch lazily: a remote call only happens when the local buffer is
/// drained and the caller asks for another item.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait(?Send)]
pub trait AsyncPaginatedIterator<T> {
    /// Fetch the next item from the iterator.
    ///
    /// This method automatically handles pagination, fetching new pages as needed.
    /// Returns `None` when there are no more items available.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))` - Next item in the sequence
    /// - `Ok(None)` - No more items available
    /// - `Err(...)` - Network or parsing error occurred
    async fn next(&mut self) -> Result<Option<T>>;

    /// Collect all remaining items into a Vec.
    ///
    /// **Warning**: This method will fetch ALL remaining pages. Use
    /// [`take`](Self::take) when only a prefix is needed.
    async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Take up to n items from the iterator.
    ///
    /// Pages beyond the one containing the n-th item are never requested.
    ///
    /// # Arguments
    ///
    /// * `n` - Maximum number of items to collect
    async fn take(&mut self, n: usize) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for _ in 0..n {
            match self.next().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Returns the number of pages (or batches) fetched so far.
    fn current_page(&self) -> u32;

    /// Get the total number of pages, if known.
    ///
    /// Returns `Some(n)` if the total page count is known, `None` otherwise.
    /// This information may not be available until at least one page has been fetched.
    fn total_pages(&self) -> Option<u32> {
        None
    }
}

// =============================================================================
// PAGE ITERATOR
// =============================================================================

/// A remote "list items" operation addressed by offset.
#[async_trait(?Send)]
pub trait PageSource {
    /// Fetch the page starting at `offset`.
    async fn fetch_page(&self, offset: u32) -> Result<CollectionPage>;

    /// Short description of the collection, used in log messages.
    fn describe(&self) -> String;
}

/// Lazy iterator over every raw record of a paginated collection.
///
/// Starting at offset 0, a page is fetched only once the previous one has been fully
/// consumed; the offset advances by the page's `limit` and iteration ends after the
/// first page whose `next` marker is absent. Pages reporting a next page but no
/// items are skipped. Since that trusts the service to eventually stop, every
/// traversal is capped at `max_pages` fetches and fails with
/// [`SpotifyBackupError::PaginationLimit`] beyond it.
pub struct PageIterator<S: PageSource> {
    source: S,
    offset: u32,
    pages_fetched: u32,
    max_pages: u32,
    has_more: bool,
    buffer: Vec<Value>,
    total_pages: Option<u32>,
}

#[async_trait(?Send)]
impl<S: PageSource> AsyncPaginatedIterator<Value> for PageIterator<S> {
    async fn next(&mut self) -> Result<Option<Value>> {
        while self.buffer.is_empty() {
            match self.next_page().await? {
                Some(page) => {
                    self.buffer = page.items;
                    self.buffer.reverse(); // Reverse so we can pop from end efficiently
                }
                None => return Ok(None),
            }
        }

        Ok(self.buffer.pop())
    }

    fn current_page(&self) -> u32 {
        self.pages_fetched
    }

    fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }
}

impl<S: PageSource> PageIterator<S> {
    /// Create a new iterator starting at offset 0 with the default page bound.
    pub fn new(source: S) -> Self {
        Self::with_max_pages(source, DEFAULT_MAX_PAGES)
    }

    /// Create a new iterator that gives up after `max_pages` fetches.
    pub fn with_max_pages(source: S, max_pages: u32) -> Self {
        Self {
            source,
            offset: 0,
            pages_fetched: 0,
            max_pages,
            has_more: true,
            buffer: Vec::new(),
            total_pages: None,
        }
    }

    /// Fetch the next raw page, bypassing the item buffer.
    ///
    /// Returns `Ok(None)` once the last page has been fetched.
    pub async fn next_page(&mut self) -> Result<Option<CollectionPage>> {
        if !self.has_more {
            return Ok(None);
        }

        if self.pages_fetched >= self.max_pages {
            log::warn!(
                "Giving up on {} after {} pages without reaching the last page",
                self.source.describe(),
                self.pages_fetched
            );
            return Err(SpotifyBackupError::PaginationLimit {
                pages: self.pages_fetched,
            });
        }

        log::debug!(
            "Fetching {} at offset {} (page {})",
            self.source.describe(),
            self.offset,
            self.pages_fetched + 1
        );

        let page = self.source.fetch_page(self.offset).await?;

        self.pages_fetched += 1;
        self.has_more = !page.is_last();
        self.offset = self.offset.saturating_add(page.limit);
        if let Some(total_pages) = page.total_pages() {
            self.total_pages = Some(total_pages);
        }

        Ok(Some(page))
    }

    /// The offset the next fetch will use.
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

/// The playlists owned or followed by a user.
pub struct UserPlaylists<'a, C: SpotifyClient + ?Sized> {
    client: &'a C,
    user_id: String,
}

impl<'a, C: SpotifyClient + ?Sized> UserPlaylists<'a, C> {
    pub fn new(client: &'a C, user_id: String) -> Self {
        Self { client, user_id }
    }
}

#[async_trait(?Send)]
impl<'a, C: SpotifyClient + ?Sized> PageSource for UserPlaylists<'a, C> {
    async fn fetch_page(&self, offset: u32) -> Result<CollectionPage> {
        self.client.user_playlists_page(&self.user_id, offset).await
    }

    fn describe(&self) -> String {
        format!("playlists of user '{}'", self.user_id)
    }
}

/// The items (added-at wrapper plus track) of a playlist.
pub struct PlaylistItems<'a, C: SpotifyClient + ?Sized> {
    client: &'a C,
    playlist_uri: String,
}

impl<'a, C: SpotifyClient + ?Sized> PlaylistItems<'a, C> {
    pub fn new(client: &'a C, playlist_uri: String) -> Self {
        Self {
            client,
            playlist_uri,
        }
    }
}

#[async_trait(?Send)]
impl<'a, C: SpotifyClient + ?Sized> PageSource for PlaylistItems<'a, C> {
    async fn fetch_page(&self, offset: u32) -> Result<CollectionPage> {
        self.client
            .playlist_items_page(&self.playlist_uri, offset)
            .await
    }

    fn describe(&self) -> String {
        format!("items of {}", self.playlist_uri)
    }
}

// =============================================================================
// BATCHED AUDIO FEATURES
// =============================================================================

/// A bulk lookup that resolves a bounded list of track URIs in one call.
#[async_trait(?Send)]
pub trait BatchSource {
    /// Resolve every URI in `uris`, answering `None` for unknown tracks.
    ///
    /// The answer must have the same length and order as `uris`.
    async fn fetch_batch(&self, uris: &[String]) -> Result<Vec<Option<Value>>>;
}

/// Adapts a [`SpotifyClient`] into a [`BatchSource`] for audio features.
pub struct ClientFeatures<'a, C: SpotifyClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: SpotifyClient + ?Sized> ClientFeatures<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl<'a, C: SpotifyClient + ?Sized> BatchSource for ClientFeatures<'a, C> {
    async fn fetch_batch(&self, uris: &[String]) -> Result<Vec<Option<Value>>> {
        self.client.audio_features(uris).await
    }
}

/// Lazy iterator resolving an ordered URI list in consecutive chunks.
///
/// Each chunk holds at most `batch_size` URIs and is requested only when the
/// previous chunk's results have been consumed. Results come back in input order,
/// one per URI, with `None` where the service has no features for a track.
pub struct FeatureBatches<S: BatchSource> {
    source: S,
    uris: Vec<String>,
    batch_size: usize,
    cursor: usize,
    buffer: Vec<Option<Value>>,
    batches_fetched: u32,
}

#[async_trait(?Send)]
impl<S: BatchSource> AsyncPaginatedIterator<Option<Value>> for FeatureBatches<S> {
    async fn next(&mut self) -> Result<Option<Option<Value>>> {
        if self.buffer.is_empty() && self.cursor < self.uris.len() {
            let end = usize::min(self.cursor + self.batch_size, self.uris.len());
            let chunk = &self.uris[self.cursor..end];

            log::debug!(
                "Fetching audio features batch {} ({} tracks)",
                self.batches_fetched + 1,
                chunk.len()
            );

            let results = self.source.fetch_batch(chunk).await?;
            if results.len() != chunk.len() {
                return Err(SpotifyBackupError::Parse(format!(
                    "audio features batch returned {} results for {} tracks",
                    results.len(),
                    chunk.len()
                )));
            }

            self.cursor = end;
            self.batches_fetched += 1;
            self.buffer = results;
            self.buffer.reverse();
        }

        Ok(self.buffer.pop())
    }

    fn current_page(&self) -> u32 {
        self.batches_fetched
    }

    fn total_pages(&self) -> Option<u32> {
        u32::try_from(self.uris.len().div_ceil(self.batch_size)).ok()
    }
}

impl<S: BatchSource> FeatureBatches<S> {
    /// Create a batched lookup over `uris`.
    ///
    /// Fails with [`SpotifyBackupError::InvalidConfig`] when `batch_size` is zero.
    pub fn new(source: S, uris: Vec<String>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SpotifyBackupError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            source,
            uris,
            batch_size,
            cursor: 0,
            buffer: Vec::new(),
            batches_fetched: 0,
        })
    }

    /// Number of results not yet yielded.
    pub fn remaining(&self) -> usize {
        self.uris.len() - self.cursor + self.buffer.len()
    }
}
