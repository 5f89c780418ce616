use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use snafu::prelude::*;
use spotify_player_client::{
    CatalogClient, ClientConfig,
    client::DEFAULT_BASE_URL,
    params::{DEFAULT_LIMIT, IncludeGroup, PlayedCursor, RecommendationRequest, SearchType, TimeRange},
};
use std::time::Duration;

use crate::output::{self, Format, album_row, artist_row, category_row, playlist_row, track_row};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    /// Bearer token sent with every request.
    token: String,

    #[clap(long, env = "SPOTIFY_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[clap(long, default_value_t = 10)]
    /// Request timeout in seconds.
    timeout: u64,

    #[clap(short, long)]
    /// Market (ISO 3166-1 alpha-2 country code, or from_token).
    market: Option<String>,

    #[clap(short, long)]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(short, long, value_enum, default_value_t = Format::Tsv)]
    format: Format,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Paging {
    #[clap(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: u32,

    #[clap(short, long, default_value_t = 0)]
    offset: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Search tracks, artists, albums and playlists
    Search {
        query: String,
        #[clap(short = 't', long = "type", value_delimiter = ',', default_value = "track")]
        types: Vec<SearchType>,
        #[clap(flatten)]
        paging: Paging,
    },
    /// Show a track
    Track {
        id: String,
        #[clap(long, default_value_t = false)]
        /// Also show its audio features.
        features: bool,
    },
    /// Audio analysis of a track
    Analysis { id: String },
    /// Audio features of several tracks
    Features {
        #[clap(required = true, num_args = 1..=100)]
        ids: Vec<String>,
    },
    /// Show an album and its tracks
    Album {
        id: String,
        #[clap(flatten)]
        paging: Paging,
    },
    /// Show an artist with top tracks
    Artist {
        id: String,
        #[clap(long, default_value_t = false)]
        /// List albums instead of top tracks.
        albums: bool,
        #[clap(long, default_value_t = false)]
        /// List related artists instead of top tracks.
        related: bool,
    },
    /// List the tracks of a playlist
    Playlist {
        id: String,
        #[clap(flatten)]
        paging: Paging,
    },
    /// Playlists of the current user
    Playlists {
        #[clap(flatten)]
        paging: Paging,
    },
    /// Saved tracks of the current user
    Saved {
        #[clap(flatten)]
        paging: Paging,
    },
    /// Top artists or tracks of the current user
    Top {
        #[clap(value_enum)]
        kind: TopKind,
        #[clap(short, long, value_enum, default_value_t = Range::Medium)]
        range: Range,
        #[clap(flatten)]
        paging: Paging,
    },
    /// Recently played tracks
    Recent {
        #[clap(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
        #[clap(long)]
        /// Only plays before this RFC 3339 timestamp.
        before: Option<DateTime<Utc>>,
    },
    /// New album releases
    NewReleases {
        #[clap(flatten)]
        paging: Paging,
    },
    /// Featured playlists
    Featured {
        #[clap(flatten)]
        paging: Paging,
        #[clap(long)]
        locale: Option<String>,
    },
    /// Browse categories, or the playlists of one category
    Categories {
        /// Category id to list playlists for.
        id: Option<String>,
        #[clap(flatten)]
        paging: Paging,
        #[clap(long)]
        locale: Option<String>,
    },
    /// Track recommendations from up to five seeds
    Recommend {
        #[clap(long, value_delimiter = ',')]
        artists: Vec<String>,
        #[clap(long, value_delimiter = ',')]
        tracks: Vec<String>,
        #[clap(long, value_delimiter = ',')]
        genres: Vec<String>,
        #[clap(short, long)]
        limit: Option<u32>,
        #[clap(long = "attr", value_parser = parse_attribute)]
        /// Tunable attribute such as min_energy=0.6
        attributes: Vec<(String, f32)>,
    },
    /// Create a playlist
    CreatePlaylist {
        user_id: String,
        name: String,
        #[clap(short, long)]
        description: Option<String>,
        #[clap(long, default_value_t = false)]
        public: bool,
    },
    /// Add track uris to a playlist
    AddTracks {
        playlist_id: String,
        #[clap(required = true)]
        uris: Vec<String>,
        #[clap(long)]
        position: Option<u32>,
    },
    /// Profile, playlists and top artists of the current user
    Profile,
    #[cfg(feature = "rodio")]
    /// Play previews of a track, album, playlist or your top tracks
    Play {
        #[clap(value_enum)]
        kind: crate::play::PlayKind,
        /// Ignored for top tracks.
        id: Option<String>,
        #[clap(long, default_value_t = false)]
        shuffle: bool,
        #[clap(long, default_value_t = 0)]
        start: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopKind {
    Artists,
    Tracks,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Range {
    Short,
    Medium,
    Long,
}

impl From<Range> for TimeRange {
    fn from(value: Range) -> Self {
        match value {
            Range::Short => TimeRange::ShortTerm,
            Range::Medium => TimeRange::MediumTerm,
            Range::Long => TimeRange::LongTerm,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    ClientError { error: String },
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("{error}"))]
    OutputError { error: String },
}

impl From<spotify_player_client::Error> for Error {
    fn from(error: spotify_player_client::Error) -> Self {
        Error::ClientError {
            error: error.to_string(),
        }
    }
}

impl From<spotify_player_controls::Error> for Error {
    fn from(error: spotify_player_controls::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::OutputError {
            error: error.to_string(),
        }
    }
}

fn parse_attribute(value: &str) -> Result<(String, f32), String> {
    let (key, number) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {value:?}"))?;
    let number = number
        .trim()
        .parse()
        .map_err(|_| format!("{number:?} is not a number"))?;

    Ok((key.trim().to_string(), number))
}

fn init_logging(verbosity: Option<tracing::Level>) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    init_logging(cli.verbosity);

    let client = CatalogClient::new(ClientConfig {
        base_url: cli.base_url,
        timeout: Duration::from_secs(cli.timeout),
        ..Default::default()
    })?;

    let token = cli.token.as_str();
    let market = cli.market.as_deref();
    let format = cli.format;

    match cli.command {
        Commands::Search {
            query,
            types,
            paging,
        } => {
            let result = client
                .search(token, &query, &types, paging.limit, paging.offset, market)
                .await?;

            output::print(format, &result, |result| {
                let mut rows = Vec::new();
                if let Some(tracks) = &result.tracks {
                    rows.extend(tracks.items.iter().map(|t| format!("track\t{}", track_row(t))));
                }
                if let Some(artists) = &result.artists {
                    rows.extend(artists.items.iter().map(|a| format!("artist\t{}", artist_row(a))));
                }
                if let Some(albums) = &result.albums {
                    rows.extend(albums.items.iter().map(|a| format!("album\t{}", album_row(a))));
                }
                if let Some(playlists) = &result.playlists {
                    rows.extend(
                        playlists
                            .items
                            .iter()
                            .map(|p| format!("playlist\t{}", playlist_row(p))),
                    );
                }
                rows
            })?;
        }
        Commands::Track { id, features } => {
            let track = client.track(token, &id, market).await?;
            output::print(format, &track, |t| vec![track_row(t)])?;

            if features {
                let features = client.audio_features(token, &id).await?;
                output::print(format, &features, |f| {
                    vec![format!(
                        "danceability {:.2}\tenergy {:.2}\tvalence {:.2}\ttempo {:.1}",
                        f.danceability, f.energy, f.valence, f.tempo
                    )]
                })?;
            }
        }
        Commands::Analysis { id } => {
            let analysis = client.audio_analysis(token, &id).await?;
            output::print(format, &analysis, |a| {
                a.sections
                    .iter()
                    .map(|s| format!("{:.2}\t{:.2}\t{:.1}\t{}", s.start, s.duration, s.tempo, s.key))
                    .collect()
            })?;
        }
        Commands::Features { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let features = client.audio_features_for_tracks(token, &ids).await?;
            output::print(format, &features, |features| {
                ids.iter()
                    .zip(features)
                    .map(|(id, f)| match f {
                        Some(f) => format!("{id}\t{:.2}\t{:.2}\t{:.1}", f.danceability, f.energy, f.tempo),
                        None => format!("{id}\t-\t-\t-"),
                    })
                    .collect()
            })?;
        }
        Commands::Album { id, paging } => {
            let album = client.album(token, &id, market).await?;
            output::print(format, &album, |a| {
                vec![format!(
                    "{}\t{}\t{}\t{} tracks",
                    a.id, a.name, a.release_date, a.total_tracks
                )]
            })?;

            if paging.offset > 0 || paging.limit != DEFAULT_LIMIT {
                let tracks = client
                    .album_tracks(token, &id, paging.limit, paging.offset, market)
                    .await?;
                output::print(format, &tracks, |p| p.items.iter().map(track_row).collect())?;
            } else {
                output::print(format, &album.tracks, |p| {
                    p.items.iter().map(track_row).collect()
                })?;
            }
        }
        Commands::Artist { id, albums, related } => {
            let artist = client.artist(token, &id).await?;
            output::print(format, &artist, |a| vec![artist_row(a)])?;

            if albums {
                let albums = client
                    .artist_albums(
                        token,
                        &id,
                        &[IncludeGroup::Album, IncludeGroup::Single],
                        50,
                        0,
                        market,
                    )
                    .await?;
                output::print(format, &albums, |p| p.items.iter().map(album_row).collect())?;
            } else if related {
                let related = client.artist_related_artists(token, &id).await?;
                output::print(format, &related, |r| r.iter().map(artist_row).collect())?;
            } else {
                let top = client
                    .artist_top_tracks(token, &id, market.unwrap_or("US"))
                    .await?;
                output::print(format, &top, |t| t.iter().map(track_row).collect())?;
            }
        }
        Commands::Playlist { id, paging } => {
            let items = client
                .playlist_items(token, &id, paging.limit, paging.offset)
                .await?;
            output::print(format, &items, |p| {
                p.items
                    .iter()
                    .filter_map(|item| item.track.as_ref())
                    .map(track_row)
                    .collect()
            })?;
        }
        Commands::Playlists { paging } => {
            let playlists = client
                .user_playlists(token, paging.limit, paging.offset)
                .await?;
            output::print(format, &playlists, |p| {
                p.items.iter().map(playlist_row).collect()
            })?;
        }
        Commands::Saved { paging } => {
            let saved = client
                .saved_tracks(token, paging.limit, paging.offset)
                .await?;
            output::print(format, &saved, |p| {
                p.items
                    .iter()
                    .map(|s| format!("{}\t{}", s.added_at.to_rfc3339(), track_row(&s.track)))
                    .collect()
            })?;
        }
        Commands::Top { kind, range, paging } => match kind {
            TopKind::Artists => {
                let artists = client
                    .top_artists(token, range.into(), paging.limit, paging.offset)
                    .await?;
                output::print(format, &artists, |p| p.items.iter().map(artist_row).collect())?;
            }
            TopKind::Tracks => {
                let tracks = client
                    .top_tracks(token, range.into(), paging.limit, paging.offset)
                    .await?;
                output::print(format, &tracks, |p| p.items.iter().map(track_row).collect())?;
            }
        },
        Commands::Recent { limit, before } => {
            let history = client
                .recently_played(token, limit, before.map(PlayedCursor::Before))
                .await?;
            output::print(format, &history, |p| {
                p.items
                    .iter()
                    .map(|h| format!("{}\t{}", h.played_at.to_rfc3339(), track_row(&h.track)))
                    .collect()
            })?;
        }
        Commands::NewReleases { paging } => {
            let releases = client
                .new_releases(token, paging.limit, paging.offset, market)
                .await?;
            output::print(format, &releases, |p| p.items.iter().map(album_row).collect())?;
        }
        Commands::Featured { paging, locale } => {
            let featured = client
                .featured_playlists(token, paging.limit, paging.offset, market, locale.as_deref())
                .await?;
            output::print(format, &featured, |f| {
                f.message
                    .iter()
                    .cloned()
                    .chain(f.playlists.items.iter().map(playlist_row))
                    .collect()
            })?;
        }
        Commands::Categories { id, paging, locale } => match id {
            Some(id) => {
                let category = client
                    .category(token, &id, market, locale.as_deref())
                    .await?;
                output::print(format, &category, |c| vec![category_row(c)])?;

                let playlists = client
                    .category_playlists(token, &id, paging.limit, paging.offset, market)
                    .await?;
                output::print(format, &playlists, |p| {
                    p.items.iter().map(playlist_row).collect()
                })?;
            }
            None => {
                let categories = client
                    .categories(token, paging.limit, paging.offset, market, locale.as_deref())
                    .await?;
                output::print(format, &categories, |p| {
                    p.items.iter().map(category_row).collect()
                })?;
            }
        },
        Commands::Recommend {
            artists,
            tracks,
            genres,
            limit,
            attributes,
        } => {
            let request = RecommendationRequest {
                seed_artists: artists,
                seed_tracks: tracks,
                seed_genres: genres,
                limit,
                market: cli.market.clone(),
                attributes: attributes.into_iter().collect(),
            };
            let recommendations = client.recommendations(token, &request).await?;
            output::print(format, &recommendations, |r| {
                r.tracks.iter().map(track_row).collect()
            })?;
        }
        Commands::CreatePlaylist {
            user_id,
            name,
            description,
            public,
        } => {
            let playlist = client
                .create_playlist(token, &user_id, &name, description.as_deref(), public)
                .await?;
            output::print(format, &playlist, |p| vec![format!("{}\t{}", p.id, p.name)])?;
        }
        Commands::AddTracks {
            playlist_id,
            uris,
            position,
        } => {
            let snapshot = client
                .add_tracks_to_playlist(token, &playlist_id, &uris, position)
                .await?;
            output::print(format, &snapshot, |s| vec![s.snapshot_id.clone()])?;
        }
        Commands::Profile => {
            let (profile, playlists, top_artists) = tokio::try_join!(
                client.profile(token),
                client.user_playlists(token, 50, 0),
                client.top_artists(token, TimeRange::default(), 5, 0),
            )?;

            let summary = serde_json::json!({
                "profile": profile,
                "playlists": playlists,
                "top_artists": top_artists,
            });

            output::print(format, &summary, |_| {
                let mut rows = vec![format!(
                    "{}\t{}\t{}",
                    profile.id,
                    profile.display_name.as_deref().unwrap_or("-"),
                    profile.product.as_deref().unwrap_or("-"),
                )];
                rows.extend(playlists.items.iter().map(playlist_row));
                rows.extend(top_artists.items.iter().map(artist_row));
                rows
            })?;
        }
        #[cfg(feature = "rodio")]
        Commands::Play {
            kind,
            id,
            shuffle,
            start,
        } => {
            crate::play::run(&client, token, market, kind, id.as_deref(), shuffle, start).await?;
        }
    }

    Ok(())
}
