use spotify_backup::{
    run_backup, BackupOptions, BackupTarget, Identifier, SpotifyClientImpl, SpotifyInterface,
};
use std::path::Path;

/// Handle the backup command
pub async fn handle_backup(
    interface: &SpotifyInterface<SpotifyClientImpl>,
    output: &Path,
    user: Option<&str>,
    include_audio_features: bool,
    keep_going: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = BackupOptions::default()
        .with_audio_features(include_audio_features)
        .with_keep_going(keep_going);
    if let Some(user) = user {
        options = options.with_user(Identifier::parse(user));
    }

    let target = BackupTarget::today(output);
    let summary = run_backup(interface, &target, &options).await?;

    println!(
        "Backed up {} playlists ({} tracks) to {}",
        summary.playlists_written,
        summary.tracks_written,
        summary.directory.display()
    );
    if summary.playlists_skipped > 0 {
        println!(
            "{} playlists were skipped, run with --verbose for details",
            summary.playlists_skipped
        );
    }
    Ok(())
}
