use super::utils::format_duration;
use spotify_backup::{
    project_playlist, project_track, AsyncPaginatedIterator, Cell, Identifier, SpotifyClientImpl,
    SpotifyInterface,
};

/// Handle the list playlists command
pub async fn handle_list_playlists(
    interface: &SpotifyInterface<SpotifyClientImpl>,
    user: Option<&str>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = user.map(Identifier::parse);
    let mut playlists = interface.list_all_playlists(user.as_ref())?;

    let records = if limit > 0 {
        playlists.take(limit).await?
    } else {
        playlists.collect_all().await?
    };

    for (index, record) in records.iter().enumerate() {
        let row = project_playlist(Some(record));
        println!(
            "{:>4}. {} [{}] by {}",
            index + 1,
            text(row.get("name")),
            text(row.get("uri")),
            text(row.get("owner_name"))
        );
    }

    log::info!(
        "Listed {} playlists ({} pages fetched)",
        records.len(),
        playlists.current_page()
    );
    Ok(())
}

/// Handle the list tracks command
pub async fn handle_list_tracks(
    interface: &SpotifyInterface<SpotifyClientImpl>,
    playlist: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let playlist = Identifier::parse(playlist);
    let mut items = interface.list_all_tracks(&playlist)?;
    let mut count = 0;

    while let Some(item) = items.next().await? {
        count += 1;
        let row = project_track(Some(&item));

        if row.get("uri").map_or(true, Cell::is_null) {
            println!("{count:>4}. <unavailable track>");
        } else {
            let duration = match row.get("duration") {
                Some(Cell::Integer(ms)) => format_duration(*ms),
                _ => "?:??".to_string(),
            };
            println!(
                "{count:>4}. {} - {} [{}] ({duration})",
                text(row.get("artist")),
                text(row.get("name")),
                text(row.get("album"))
            );
        }

        if limit > 0 && count >= limit {
            break;
        }
    }

    log::info!(
        "Listed {count} tracks of {playlist} ({} pages fetched)",
        items.current_page()
    );
    Ok(())
}

fn text(cell: Option<&Cell>) -> String {
    cell.map(Cell::to_string).unwrap_or_default()
}
