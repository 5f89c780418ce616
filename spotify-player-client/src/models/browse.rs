use serde::{Deserialize, Serialize};

use super::{Id, Image, Page, playlist::SimplifiedPlaylist};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub icons: Vec<Image>,
}

identified_by_id!(Category);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Categories {
    pub categories: Page<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedPlaylists {
    #[serde(default)]
    pub message: Option<String>,
    pub playlists: Page<SimplifiedPlaylist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CategoryPlaylists {
    pub playlists: Page<SimplifiedPlaylist>,
}
