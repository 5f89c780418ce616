use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use super::{Followers, Id, Image, Page, track::Track};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Absent on playlists created before the service tracked it.
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_local: bool,
    /// `None` for local files and tracks removed from the catalog.
    #[serde(default, deserialize_with = "catalog_track")]
    pub track: Option<Track>,
}

/// Local files come back as a track object without an id.
fn catalog_track<'de, D>(deserializer: D) -> Result<Option<Track>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if !value["id"].is_null() => {
            Track::deserialize(value).map(Some).map_err(de::Error::custom)
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub tracks: Page<PlaylistItem>,
}

impl Playlist {
    pub fn playable_tracks(&self) -> Vec<Track> {
        self.tracks
            .items
            .iter()
            .filter_map(|item| item.track.clone())
            .collect()
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracksRef {
    pub total: u32,
}

/// What list endpoints return in place of a full playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tracks: TracksRef,
}

identified_by_id!(Playlist, SimplifiedPlaylist);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotId {
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreatePlaylistBody<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddTracksBody<'a> {
    pub uris: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}
