use crate::identifier::{EntityType, Identifier};
use crate::interface::SpotifyInterface;
use crate::iterator::AsyncPaginatedIterator;
use crate::projection::{project_playlist, PLAYLIST_SCHEMA};
use crate::r#trait::SpotifyClient;
use crate::table::Table;
use crate::{Result, SpotifyBackupError};

use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-run playlist index file.
pub const INDEX_FILE_NAME: &str = "playlists.csv";

const DIRECTORY_PREFIX: &str = "spotify-backup-";

/// Upper bound on the playlist-name part of a file name, leaving room for the id
/// suffix within the usual 255-byte file name limit.
pub const MAX_NAME_BYTES: usize = 150;

/// Dated output directory of a backup run: `<root>/spotify-backup-YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    root: PathBuf,
    date: NaiveDate,
}

impl BackupTarget {
    pub fn new(root: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            root: root.into(),
            date,
        }
    }

    /// Target stamped with the local date.
    pub fn today(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn directory(&self) -> PathBuf {
        self.root
            .join(format!("{DIRECTORY_PREFIX}{}", self.date.format("%Y-%m-%d")))
    }

    /// Create the directory (and its parents) if needed and return it.
    pub fn create(&self) -> Result<PathBuf> {
        let directory = self.directory();
        fs::create_dir_all(&directory)?;
        Ok(directory)
    }
}

/// What to back up and how to react to failing playlists.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Whose playlists to back up; `None` means the configured user
    pub user: Option<Identifier>,
    /// Append the audio-feature columns to every track row
    pub include_audio_features: bool,
    /// Log and skip playlists whose download fails instead of aborting
    pub keep_going: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            user: None,
            include_audio_features: true,
            keep_going: false,
        }
    }
}

impl BackupOptions {
    pub fn with_user(mut self, user: Identifier) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_audio_features(mut self, include: bool) -> Self {
        self.include_audio_features = include;
        self
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }
}

/// Outcome of [`run_backup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub directory: PathBuf,
    pub playlists_written: usize,
    pub playlists_skipped: usize,
    pub tracks_written: usize,
}

/// CSV file name for a playlist: `<sanitized name>_<id>.csv`.
///
/// Anything other than word characters, `-`, `.` and spaces collapses to `_`. The name
/// part is cut to [`MAX_NAME_BYTES`] on a character boundary.
pub fn playlist_file_name(name: &str, id: &str) -> Result<String> {
    let unsafe_chars = regex::Regex::new(r"[^\w\-. ]+")
        .map_err(|e| SpotifyBackupError::InvalidConfig(e.to_string()))?;
    let sanitized = unsafe_chars.replace_all(name.trim(), "_");
    let sanitized = truncate_to_bytes(&sanitized, MAX_NAME_BYTES).trim_matches('.');

    if sanitized.is_empty() {
        Ok(format!("playlist_{id}.csv"))
    } else {
        Ok(format!("{sanitized}_{id}.csv"))
    }
}

/// Back up every playlist of a user into `target`.
///
/// Writes [`INDEX_FILE_NAME`] with one metadata row per playlist and one CSV per
/// playlist. Playlists are walked lazily; the index is written once the listing is
/// exhausted. With `keep_going`, playlists failing with a transport error or
/// disappearing mid-run are logged and counted as skipped; otherwise the first
/// failure ends the run. Listed playlists without an id are always skipped.
pub async fn run_backup<C: SpotifyClient>(
    interface: &SpotifyInterface<C>,
    target: &BackupTarget,
    options: &BackupOptions,
) -> Result<BackupSummary> {
    let directory = target.create()?;
    log::info!("Backing up playlists to {}", directory.display());

    let mut summary = BackupSummary {
        directory: directory.clone(),
        ..Default::default()
    };
    let mut index = Table::new(&PLAYLIST_SCHEMA);
    let mut playlists = interface.list_all_playlists(options.user.as_ref())?;

    while let Some(record) = playlists.next().await? {
        index.push(project_playlist(Some(&record)))?;

        let position = index.len();
        let name = record["name"].as_str().unwrap_or_default().to_string();
        let playlist = Identifier::Record(record);
        let id = match playlist.to_id(EntityType::Playlist) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("[{position}] Skipping playlist without a usable id: {e}");
                summary.playlists_skipped += 1;
                continue;
            }
        };

        match interface
            .playlist_table(&playlist, options.include_audio_features)
            .await
        {
            Ok(table) => {
                let path = directory.join(playlist_file_name(&name, &id)?);
                table.save_csv(&path)?;
                log::info!(
                    "[{position}] Saved '{name}' ({} tracks) to {}",
                    table.len(),
                    path.display()
                );
                summary.playlists_written += 1;
                summary.tracks_written += table.len();
            }
            Err(e) if options.keep_going && is_skippable(&e) => {
                log::warn!("[{position}] Skipping '{name}' ({id}): {e}");
                summary.playlists_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    index.save_csv(&directory.join(INDEX_FILE_NAME))?;
    log::info!(
        "Backup finished: {} playlists written, {} skipped, {} tracks",
        summary.playlists_written,
        summary.playlists_skipped,
        summary.tracks_written
    );
    Ok(summary)
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    &s[..end]
}

fn is_skippable(error: &SpotifyBackupError) -> bool {
    error.is_transport() || matches!(error, SpotifyBackupError::NotFound(_))
}

/// Whether `path` looks like a directory produced by [`BackupTarget`].
pub fn is_backup_directory(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(DIRECTORY_PREFIX))
        .map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_is_date_stamped() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let target = BackupTarget::new("/tmp/backups", date);
        assert_eq!(
            target.directory(),
            PathBuf::from("/tmp/backups/spotify-backup-2024-03-07")
        );
        assert!(is_backup_directory(&target.directory()));
        assert!(!is_backup_directory(Path::new("/tmp/backups/spotify-backup-latest")));
    }

    #[test]
    fn test_playlist_file_name_sanitizing() {
        assert_eq!(
            playlist_file_name("Road Trip 2023", "abc").unwrap(),
            "Road Trip 2023_abc.csv"
        );
        assert_eq!(
            playlist_file_name("AC/DC: best-of", "abc").unwrap(),
            "AC_DC_ best-of_abc.csv"
        );
        assert_eq!(
            playlist_file_name("../../etc", "abc").unwrap(),
            "_.._etc_abc.csv"
        );
        assert_eq!(playlist_file_name("  ", "xyz").unwrap(), "playlist_xyz.csv");
    }

    #[test]
    fn test_long_names_are_cut_on_char_boundary() {
        let id = "37i9dQZF1DXcBWIGoYBM5M";
        let name = playlist_file_name(&"日".repeat(100), id).unwrap();

        assert!(name.len() <= 255);
        assert!(name.ends_with(&format!("_{id}.csv")));
        let stem = name.trim_end_matches(&format!("_{id}.csv"));
        assert_eq!(stem, "日".repeat(50));
        assert_eq!(stem.len(), MAX_NAME_BYTES);

        assert_eq!(truncate_to_bytes("aé", 2), "a");
        assert_eq!(truncate_to_bytes("short", MAX_NAME_BYTES), "short");
    }

    #[test]
    fn test_create_makes_parents() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let target = BackupTarget::new(dir.path().join("nested"), date);

        let created = target.create().unwrap();
        assert!(created.is_dir());
        assert!(created.ends_with("spotify-backup-2024-01-02"));
    }

    #[test]
    fn test_options_builders() {
        let options = BackupOptions::default()
            .with_user(Identifier::parse("someone"))
            .with_audio_features(false)
            .with_keep_going(true);
        assert!(!options.include_audio_features);
        assert!(options.keep_going);
        assert_eq!(options.user.unwrap().to_string(), "someone");
    }
}
