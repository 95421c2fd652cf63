pub mod backup;
pub mod export;
pub mod list;
pub mod utils;

use clap::Subcommand;
use spotify_backup::{SpotifyClientImpl, SpotifyInterface};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ListCommands {
    /// List the playlists of a user
    ///
    /// Usage examples:
    /// # Playlists of the configured user
    /// spotify-backup list playlists
    ///
    /// # First 10 playlists of another user
    /// spotify-backup list playlists --user spotify --limit 10
    Playlists {
        /// User ID, URI or profile link (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,

        /// Maximum number of playlists to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// List the tracks of a playlist
    ///
    /// Usage examples:
    /// # All tracks of a playlist given by its share link
    /// spotify-backup list tracks https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M
    ///
    /// # First 5 tracks, only the first page is requested
    /// spotify-backup list tracks spotify:playlist:37i9dQZF1DXcBWIGoYBM5M --limit 5
    Tracks {
        /// Playlist ID, URI or share link
        playlist: String,

        /// Maximum number of tracks to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Back up every playlist of a user to CSV files
    ///
    /// Creates `spotify-backup-YYYY-MM-DD/` in the output directory with a
    /// `playlists.csv` index and one CSV file per playlist.
    ///
    /// Usage examples:
    /// # Back up the configured user into the current directory
    /// spotify-backup backup
    ///
    /// # Back up another user without audio features, skipping failing playlists
    /// spotify-backup backup --user someone --output ~/backups --no-audio-features --keep-going
    Backup {
        /// Directory receiving the dated backup folder
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// User ID, URI or profile link (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,

        /// Do not fetch audio features
        #[arg(long)]
        no_audio_features: bool,

        /// Skip playlists that fail to download instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// List playlists or tracks without writing anything
    List {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Export a single playlist to a CSV file
    ///
    /// Usage examples:
    /// # Export to `<playlist name>_<id>.csv` in the current directory
    /// spotify-backup export 37i9dQZF1DXcBWIGoYBM5M
    ///
    /// # Export to a chosen file without audio features
    /// spotify-backup export spotify:playlist:37i9dQZF1DXcBWIGoYBM5M --output top50.csv --no-audio-features
    Export {
        /// Playlist ID, URI or share link
        playlist: String,

        /// Output file (defaults to `<playlist name>_<id>.csv`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not fetch audio features
        #[arg(long)]
        no_audio_features: bool,
    },
}

pub async fn execute_command(
    command: Commands,
    interface: &SpotifyInterface<SpotifyClientImpl>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Backup {
            output,
            user,
            no_audio_features,
            keep_going,
        } => {
            backup::handle_backup(
                interface,
                &output,
                user.as_deref(),
                !no_audio_features,
                keep_going,
            )
            .await
        }

        Commands::List { command } => match command {
            ListCommands::Playlists { user, limit } => {
                list::handle_list_playlists(interface, user.as_deref(), limit).await
            }
            ListCommands::Tracks { playlist, limit } => {
                list::handle_list_tracks(interface, &playlist, limit).await
            }
        },

        Commands::Export {
            playlist,
            output,
            no_audio_features,
        } => {
            export::handle_export(interface, &playlist, output.as_deref(), !no_audio_features)
                .await
        }
    }
}
