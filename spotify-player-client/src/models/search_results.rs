use serde::{Deserialize, Serialize};

use super::{
    Page, album::AlbumRef, artist::Artist, playlist::SimplifiedPlaylist, track::Track,
};

/// One page per requested facet. Facets that were not asked for stay `None`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub tracks: Option<Page<Track>>,
    #[serde(default)]
    pub artists: Option<Page<Artist>>,
    #[serde(default)]
    pub albums: Option<Page<AlbumRef>>,
    #[serde(default)]
    pub playlists: Option<Page<SimplifiedPlaylist>>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.tracks.as_ref().is_none_or(|p| p.items.is_empty())
            && self.artists.as_ref().is_none_or(|p| p.items.is_empty())
            && self.albums.as_ref().is_none_or(|p| p.items.is_empty())
            && self.playlists.as_ref().is_none_or(|p| p.items.is_empty())
    }
}
