use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{Id, Image, Page, artist::ArtistRef, track::Track};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumType {
    #[default]
    #[serde(alias = "ALBUM")]
    Album,
    #[serde(alias = "SINGLE")]
    Single,
    #[serde(alias = "COMPILATION")]
    Compilation,
}

impl Display for AlbumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
        })
    }
}

/// Release date with the precision the service knows it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReleaseDate {
    Year(i32),
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl ReleaseDate {
    pub fn year(&self) -> i32 {
        match self {
            ReleaseDate::Year(year) => *year,
            ReleaseDate::Month { year, .. } => *year,
            ReleaseDate::Day(date) => date.year(),
        }
    }
}

impl FromStr for ReleaseDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid release date: {s:?}");
        let parts: Vec<&str> = s.split('-').collect();

        match parts.as_slice() {
            [year] => year.parse().map(ReleaseDate::Year).map_err(|_| invalid()),
            [year, month] => {
                let year = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(ReleaseDate::Month { year, month })
            }
            [_, _, _] => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(ReleaseDate::Day)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for ReleaseDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReleaseDate> for String {
    fn from(value: ReleaseDate) -> Self {
        value.to_string()
    }
}

impl Display for ReleaseDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseDate::Year(year) => write!(f, "{year:04}"),
            ReleaseDate::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            ReleaseDate::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Album as embedded in tracks, search results and browse lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub album_type: AlbumType,
    pub release_date: ReleaseDate,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub total_tracks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub album_type: AlbumType,
    pub release_date: ReleaseDate,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub popularity: Option<u8>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tracks: Page<Track>,
}

identified_by_id!(AlbumRef, Album);

impl From<Album> for AlbumRef {
    fn from(album: Album) -> Self {
        Self {
            id: album.id,
            name: album.name,
            album_type: album.album_type,
            release_date: album.release_date,
            artists: album.artists,
            images: album.images,
            total_tracks: album.total_tracks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NewReleases {
    pub albums: Page<AlbumRef>,
}
