use clap::ValueEnum;
use serde::Serialize;
use spotify_player_client::models::{AlbumRef, Artist, Category, SimplifiedPlaylist, Track};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    #[default]
    Tsv,
}

/// Prints `value` as pretty JSON, or as the tab separated lines `rows` makes of it.
pub fn print<T: Serialize>(
    format: Format,
    value: &T,
    rows: impl FnOnce(&T) -> Vec<String>,
) -> Result<(), serde_json::Error> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Tsv => {
            for row in rows(value) {
                println!("{row}");
            }
        }
    }

    Ok(())
}

pub fn duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn track_row(track: &Track) -> String {
    [
        track.id.to_string(),
        track.name.clone(),
        track.artist_names(),
        duration(track.duration_ms),
    ]
    .join("\t")
}

pub fn artist_row(artist: &Artist) -> String {
    [
        artist.id.to_string(),
        artist.name.clone(),
        artist.popularity.to_string(),
        artist.genres.join(", "),
    ]
    .join("\t")
}

pub fn album_row(album: &AlbumRef) -> String {
    let artists = album
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    [
        album.id.to_string(),
        album.name.clone(),
        artists,
        album.release_date.to_string(),
        album.album_type.to_string(),
    ]
    .join("\t")
}

pub fn playlist_row(playlist: &SimplifiedPlaylist) -> String {
    let owner = playlist
        .owner
        .display_name
        .clone()
        .unwrap_or_else(|| playlist.owner.id.clone());

    [
        playlist.id.to_string(),
        playlist.name.clone(),
        owner,
        playlist.tracks.total.to_string(),
    ]
    .join("\t")
}

pub fn category_row(category: &Category) -> String {
    format!("{}\t{}", category.id, category.name)
}
