use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, fmt::Display};

use crate::{Error, Result};

/// Page size limit of most list endpoints.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Page size limit of album tracks, playlist tracks and recommendations.
pub const MAX_LONG_PAGE_SIZE: u32 = 100;
/// The service refuses search offsets past this.
pub const MAX_SEARCH_OFFSET: u32 = 1000;
pub const DEFAULT_LIMIT: u32 = 20;
const MAX_SEEDS: usize = 5;

pub(crate) fn clamp_limit(limit: u32, max: u32) -> u32 {
    limit.clamp(1, max)
}

pub(crate) fn require_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        Err(Error::invalid(format!("{kind} id must not be empty")))
    } else {
        Ok(id)
    }
}

/// Two ASCII letters, or `from_token` when `allow_from_token` is set.
pub(crate) fn require_country(code: &str, allow_from_token: bool) -> Result<&str> {
    if allow_from_token && code == "from_token" {
        return Ok(code);
    }

    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(Error::invalid(format!(
            "{code:?} is not an ISO 3166-1 alpha-2 country code"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchType {
    Track,
    Artist,
    Album,
    Playlist,
}

impl SearchType {
    pub const ALL: [SearchType; 4] = [
        SearchType::Track,
        SearchType::Artist,
        SearchType::Album,
        SearchType::Playlist,
    ];
}

impl Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SearchType::Track => "track",
            SearchType::Artist => "artist",
            SearchType::Album => "album",
            SearchType::Playlist => "playlist",
        })
    }
}

impl std::str::FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "track" => Ok(SearchType::Track),
            "artist" => Ok(SearchType::Artist),
            "album" => Ok(SearchType::Album),
            "playlist" => Ok(SearchType::Playlist),
            other => Err(Error::invalid(format!("unknown search type {other:?}"))),
        }
    }
}

/// Comma separated, deduplicated, in a stable order.
pub(crate) fn join_search_types(types: &[SearchType]) -> Result<String> {
    if types.is_empty() {
        return Err(Error::invalid("at least one search type is required"));
    }

    let mut types = types.to_vec();
    types.sort();
    types.dedup();

    Ok(types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(","))
}

/// Window the top artists and tracks are computed over.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IncludeGroup {
    Album,
    Single,
    AppearsOn,
    Compilation,
}

impl Display for IncludeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IncludeGroup::Album => "album",
            IncludeGroup::Single => "single",
            IncludeGroup::AppearsOn => "appears_on",
            IncludeGroup::Compilation => "compilation",
        })
    }
}

/// Where a recently-played page starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayedCursor {
    Before(DateTime<Utc>),
    After(DateTime<Utc>),
}

impl PlayedCursor {
    pub(crate) fn query(&self) -> (&'static str, String) {
        match self {
            PlayedCursor::Before(at) => ("before", at.timestamp_millis().to_string()),
            PlayedCursor::After(at) => ("after", at.timestamp_millis().to_string()),
        }
    }
}

/// Seeds and tunable attributes for `/recommendations`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub seed_artists: Vec<String>,
    pub seed_tracks: Vec<String>,
    pub seed_genres: Vec<String>,
    pub limit: Option<u32>,
    pub market: Option<String>,
    /// Keys like `min_energy`, `max_tempo`, `target_valence`.
    pub attributes: BTreeMap<String, f32>,
}

impl RecommendationRequest {
    pub(crate) fn query(&self) -> Result<Vec<(String, String)>> {
        let seeds = self.seed_artists.len() + self.seed_tracks.len() + self.seed_genres.len();
        if seeds == 0 || seeds > MAX_SEEDS {
            return Err(Error::invalid(format!(
                "recommendations need between 1 and {MAX_SEEDS} seeds, got {seeds}"
            )));
        }

        let limit = clamp_limit(self.limit.unwrap_or(DEFAULT_LIMIT), MAX_LONG_PAGE_SIZE);
        let mut query = vec![("limit".to_string(), limit.to_string())];

        for (key, seeds) in [
            ("seed_artists", &self.seed_artists),
            ("seed_tracks", &self.seed_tracks),
            ("seed_genres", &self.seed_genres),
        ] {
            if !seeds.is_empty() {
                query.push((key.to_string(), seeds.join(",")));
            }
        }

        if let Some(market) = &self.market {
            query.push(("market".to_string(), require_country(market, true)?.to_string()));
        }

        for (key, value) in &self.attributes {
            let tunable = ["min_", "max_", "target_"]
                .iter()
                .any(|prefix| key.starts_with(prefix));
            if !tunable {
                return Err(Error::invalid(format!("{key:?} is not a tunable attribute")));
            }
            query.push((key.clone(), value.to_string()));
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(0, MAX_PAGE_SIZE), 1);
        assert_eq!(clamp_limit(500, MAX_PAGE_SIZE), 50);
        assert_eq!(clamp_limit(500, MAX_LONG_PAGE_SIZE), 100);
        assert_eq!(clamp_limit(20, MAX_PAGE_SIZE), 20);
    }

    #[test]
    fn search_types_are_deduplicated() {
        let joined = join_search_types(&[
            SearchType::Playlist,
            SearchType::Track,
            SearchType::Playlist,
        ])
        .unwrap();
        assert_eq!(joined, "track,playlist");
        assert!(matches!(
            join_search_types(&[]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn country_codes() {
        assert!(require_country("ID", false).is_ok());
        assert!(require_country("from_token", true).is_ok());
        assert!(require_country("from_token", false).is_err());
        assert!(require_country("USA", false).is_err());
        assert!(require_country("1D", false).is_err());
    }

    #[test]
    fn recommendation_seeds_are_bounded() {
        let none = RecommendationRequest::default();
        assert!(none.query().is_err());

        let too_many = RecommendationRequest {
            seed_genres: vec!["pop".into(); 6],
            ..Default::default()
        };
        assert!(too_many.query().is_err());

        let mut ok = RecommendationRequest {
            seed_artists: vec!["4NHQUGzhtTLFvgF5SZesLK".into()],
            seed_genres: vec!["pop".into(), "indie".into()],
            limit: Some(250),
            ..Default::default()
        };
        ok.attributes.insert("min_energy".into(), 0.5);

        let query = ok.query().unwrap();
        assert!(query.contains(&("limit".into(), "100".into())));
        assert!(query.contains(&("seed_genres".into(), "pop,indie".into())));
        assert!(query.contains(&("min_energy".into(), "0.5".into())));

        ok.attributes.insert("energy".into(), 1.0);
        assert!(ok.query().is_err());
    }

    #[test]
    fn played_cursor_uses_milliseconds() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(
            PlayedCursor::Before(at).query(),
            ("before", "1700000000123".to_string())
        );
    }
}
