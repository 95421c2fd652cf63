use spotify_backup::backup::playlist_file_name;
use spotify_backup::{EntityType, Identifier, SpotifyClientImpl, SpotifyInterface};
use std::path::{Path, PathBuf};

/// Handle the export command
pub async fn handle_export(
    interface: &SpotifyInterface<SpotifyClientImpl>,
    playlist: &str,
    output: Option<&Path>,
    include_audio_features: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut playlist = Identifier::parse(playlist);

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let record = interface
                .resolve_playlist(&playlist)
                .await?
                .ok_or_else(|| format!("Playlist {playlist} not found"))?;
            let name = record["name"].as_str().unwrap_or_default().to_string();
            playlist = Identifier::Record(record);
            PathBuf::from(playlist_file_name(
                &name,
                &playlist.to_id(EntityType::Playlist)?,
            )?)
        }
    };

    let table = interface
        .playlist_table(&playlist, include_audio_features)
        .await?;
    table.save_csv(&path)?;

    println!("Exported {} tracks to {}", table.len(), path.display());
    Ok(())
}
