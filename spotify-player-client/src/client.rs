use crate::{
    Error, Result,
    models::{
        Album, Artist, AudioAnalysis, AudioFeatures, Category, CursorPage, Page, PlayHistory,
        Playlist, PlaylistItem, Profile, Recommendations, SavedTrack, SearchResult,
        SimplifiedPlaylist, SnapshotId, Track,
        album::{AlbumRef, NewReleases},
        artist::{ArtistTopTracks, Artists},
        audio::AudioFeaturesList,
        browse::{Categories, CategoryPlaylists, FeaturedPlaylists},
        playlist::{AddTracksBody, CreatePlaylistBody},
    },
    params::{
        IncludeGroup, MAX_LONG_PAGE_SIZE, MAX_PAGE_SIZE, MAX_SEARCH_OFFSET, PlayedCursor,
        RecommendationRequest, SearchType, TimeRange, clamp_limit, join_search_types,
        require_country, require_id,
    },
    transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport},
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fmt::Display, sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_URIS_PER_REQUEST: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("spotify-player/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Typed access to the catalog API.
///
/// The client keeps no session: every call takes the bearer token it should
/// be made with. Clones share the underlying transport.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: Url,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

enum Endpoint<'a> {
    Me,
    MyPlaylists,
    MyTracks,
    TopArtists,
    TopTracks,
    RecentlyPlayed,
    UserPlaylists(&'a str),
    Playlist(&'a str),
    PlaylistTracks(&'a str),
    FeaturedPlaylists,
    NewReleases,
    Categories,
    Category(&'a str),
    CategoryPlaylists(&'a str),
    Recommendations,
    Search,
    Artist(&'a str),
    ArtistAlbums(&'a str),
    ArtistTopTracks(&'a str),
    RelatedArtists(&'a str),
    Album(&'a str),
    AlbumTracks(&'a str),
    Track(&'a str),
    AudioFeatures(&'a str),
    SeveralAudioFeatures,
    AudioAnalysis(&'a str),
}

impl Endpoint<'_> {
    fn segments(&self) -> Vec<&str> {
        match self {
            Endpoint::Me => vec!["me"],
            Endpoint::MyPlaylists => vec!["me", "playlists"],
            Endpoint::MyTracks => vec!["me", "tracks"],
            Endpoint::TopArtists => vec!["me", "top", "artists"],
            Endpoint::TopTracks => vec!["me", "top", "tracks"],
            Endpoint::RecentlyPlayed => vec!["me", "player", "recently-played"],
            Endpoint::UserPlaylists(user) => vec!["users", user, "playlists"],
            Endpoint::Playlist(id) => vec!["playlists", id],
            Endpoint::PlaylistTracks(id) => vec!["playlists", id, "tracks"],
            Endpoint::FeaturedPlaylists => vec!["browse", "featured-playlists"],
            Endpoint::NewReleases => vec!["browse", "new-releases"],
            Endpoint::Categories => vec!["browse", "categories"],
            Endpoint::Category(id) => vec!["browse", "categories", id],
            Endpoint::CategoryPlaylists(id) => vec!["browse", "categories", id, "playlists"],
            Endpoint::Recommendations => vec!["recommendations"],
            Endpoint::Search => vec!["search"],
            Endpoint::Artist(id) => vec!["artists", id],
            Endpoint::ArtistAlbums(id) => vec!["artists", id, "albums"],
            Endpoint::ArtistTopTracks(id) => vec!["artists", id, "top-tracks"],
            Endpoint::RelatedArtists(id) => vec!["artists", id, "related-artists"],
            Endpoint::Album(id) => vec!["albums", id],
            Endpoint::AlbumTracks(id) => vec!["albums", id, "tracks"],
            Endpoint::Track(id) => vec!["tracks", id],
            Endpoint::AudioFeatures(id) => vec!["audio-features", id],
            Endpoint::SeveralAudioFeatures => vec!["audio-features"],
            Endpoint::AudioAnalysis(id) => vec!["audio-analysis", id],
        }
    }
}

impl Display for Endpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments().join("/"))
    }
}

#[derive(Debug, Default)]
struct Query(Vec<(String, String)>);

impl Query {
    fn new() -> Self {
        Self::default()
    }

    fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    fn with_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    fn page(self, limit: u32, max: u32, offset: u32) -> Self {
        self.with("limit", clamp_limit(limit, max))
            .with("offset", offset)
    }

    fn market(self, market: Option<&str>) -> Result<Self> {
        let market = market.map(|m| require_country(m, true)).transpose()?;
        Ok(self.with_opt("market", market))
    }

    fn country(self, country: Option<&str>) -> Result<Self> {
        let country = country.map(|c| require_country(c, false)).transpose()?;
        Ok(self.with_opt("country", country))
    }
}

impl CatalogClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::invalid(format!("base url {:?}: {e}", config.base_url)))?;

        if base_url.cannot_be_a_base() {
            return Err(Error::invalid(format!(
                "base url {:?} cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            timeout: config.timeout,
            transport,
        })
    }

    pub async fn profile(&self, token: &str) -> Result<Profile> {
        self.get(token, Endpoint::Me, Query::new()).await
    }

    pub async fn user_playlists(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SimplifiedPlaylist>> {
        let query = Query::new().page(limit, MAX_PAGE_SIZE, offset);
        self.get(token, Endpoint::MyPlaylists, query).await
    }

    pub async fn playlist(
        &self,
        token: &str,
        playlist_id: &str,
        market: Option<&str>,
    ) -> Result<Playlist> {
        let id = require_id("playlist", playlist_id)?;
        let query = Query::new().market(market)?;
        self.get(token, Endpoint::Playlist(id), query).await
    }

    pub async fn playlist_items(
        &self,
        token: &str,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<PlaylistItem>> {
        let id = require_id("playlist", playlist_id)?;
        let query = Query::new().page(limit, MAX_LONG_PAGE_SIZE, offset);
        self.get(token, Endpoint::PlaylistTracks(id), query).await
    }

    pub async fn saved_tracks(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page<SavedTrack>> {
        let query = Query::new().page(limit, MAX_PAGE_SIZE, offset);
        self.get(token, Endpoint::MyTracks, query).await
    }

    pub async fn top_artists(
        &self,
        token: &str,
        time_range: TimeRange,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Artist>> {
        let query = Query::new()
            .with("time_range", time_range)
            .page(limit, MAX_PAGE_SIZE, offset);
        self.get(token, Endpoint::TopArtists, query).await
    }

    pub async fn top_tracks(
        &self,
        token: &str,
        time_range: TimeRange,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Track>> {
        let query = Query::new()
            .with("time_range", time_range)
            .page(limit, MAX_PAGE_SIZE, offset);
        self.get(token, Endpoint::TopTracks, query).await
    }

    pub async fn recently_played(
        &self,
        token: &str,
        limit: u32,
        cursor: Option<PlayedCursor>,
    ) -> Result<CursorPage<PlayHistory>> {
        let mut query = Query::new().with("limit", clamp_limit(limit, MAX_PAGE_SIZE));
        if let Some((key, value)) = cursor.as_ref().map(PlayedCursor::query) {
            query = query.with(key, value);
        }

        self.get(token, Endpoint::RecentlyPlayed, query).await
    }

    pub async fn featured_playlists(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
        country: Option<&str>,
        locale: Option<&str>,
    ) -> Result<FeaturedPlaylists> {
        let query = Query::new()
            .page(limit, MAX_PAGE_SIZE, offset)
            .country(country)?
            .with_opt("locale", locale);
        self.get(token, Endpoint::FeaturedPlaylists, query).await
    }

    pub async fn new_releases(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
        country: Option<&str>,
    ) -> Result<Page<AlbumRef>> {
        let query = Query::new()
            .page(limit, MAX_PAGE_SIZE, offset)
            .country(country)?;
        let releases: NewReleases = self.get(token, Endpoint::NewReleases, query).await?;
        Ok(releases.albums)
    }

    pub async fn categories(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
        country: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Page<Category>> {
        let query = Query::new()
            .page(limit, MAX_PAGE_SIZE, offset)
            .country(country)?
            .with_opt("locale", locale);
        let categories: Categories = self.get(token, Endpoint::Categories, query).await?;
        Ok(categories.categories)
    }

    pub async fn category(
        &self,
        token: &str,
        category_id: &str,
        country: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Category> {
        let id = require_id("category", category_id)?;
        let query = Query::new().country(country)?.with_opt("locale", locale);
        self.get(token, Endpoint::Category(id), query).await
    }

    pub async fn category_playlists(
        &self,
        token: &str,
        category_id: &str,
        limit: u32,
        offset: u32,
        country: Option<&str>,
    ) -> Result<Page<SimplifiedPlaylist>> {
        let id = require_id("category", category_id)?;
        let query = Query::new()
            .page(limit, MAX_PAGE_SIZE, offset)
            .country(country)?;
        let playlists: CategoryPlaylists =
            self.get(token, Endpoint::CategoryPlaylists(id), query).await?;
        Ok(playlists.playlists)
    }

    pub async fn recommendations(
        &self,
        token: &str,
        request: &RecommendationRequest,
    ) -> Result<Recommendations> {
        let query = Query(request.query()?);
        self.get(token, Endpoint::Recommendations, query).await
    }

    /// Searches the catalog. A blank query is refused without a request.
    pub async fn search(
        &self,
        token: &str,
        query: &str,
        types: &[SearchType],
        limit: u32,
        offset: u32,
        market: Option<&str>,
    ) -> Result<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid("search query must not be empty"));
        }

        let params = Query::new()
            .with("q", query)
            .with("type", join_search_types(types)?)
            .with("limit", clamp_limit(limit, MAX_PAGE_SIZE))
            .with("offset", offset.min(MAX_SEARCH_OFFSET))
            .market(market)?;

        self.get(token, Endpoint::Search, params).await
    }

    pub async fn artist(&self, token: &str, artist_id: &str) -> Result<Artist> {
        let id = require_id("artist", artist_id)?;
        self.get(token, Endpoint::Artist(id), Query::new()).await
    }

    pub async fn artist_albums(
        &self,
        token: &str,
        artist_id: &str,
        include_groups: &[IncludeGroup],
        limit: u32,
        offset: u32,
        market: Option<&str>,
    ) -> Result<Page<AlbumRef>> {
        let id = require_id("artist", artist_id)?;

        let mut groups = include_groups.to_vec();
        groups.sort();
        groups.dedup();
        let groups = (!groups.is_empty()).then(|| {
            groups
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        });

        let query = Query::new()
            .page(limit, MAX_PAGE_SIZE, offset)
            .with_opt("include_groups", groups)
            .market(market)?;
        self.get(token, Endpoint::ArtistAlbums(id), query).await
    }

    pub async fn artist_top_tracks(
        &self,
        token: &str,
        artist_id: &str,
        market: &str,
    ) -> Result<Vec<Track>> {
        let id = require_id("artist", artist_id)?;
        let query = Query::new().market(Some(market))?;
        let top: ArtistTopTracks = self.get(token, Endpoint::ArtistTopTracks(id), query).await?;
        Ok(top.tracks)
    }

    pub async fn artist_related_artists(&self, token: &str, artist_id: &str) -> Result<Vec<Artist>> {
        let id = require_id("artist", artist_id)?;
        let related: Artists = self
            .get(token, Endpoint::RelatedArtists(id), Query::new())
            .await?;
        Ok(related.artists)
    }

    pub async fn album(&self, token: &str, album_id: &str, market: Option<&str>) -> Result<Album> {
        let id = require_id("album", album_id)?;
        let query = Query::new().market(market)?;
        self.get(token, Endpoint::Album(id), query).await
    }

    pub async fn album_tracks(
        &self,
        token: &str,
        album_id: &str,
        limit: u32,
        offset: u32,
        market: Option<&str>,
    ) -> Result<Page<Track>> {
        let id = require_id("album", album_id)?;
        let query = Query::new()
            .page(limit, MAX_LONG_PAGE_SIZE, offset)
            .market(market)?;
        self.get(token, Endpoint::AlbumTracks(id), query).await
    }

    pub async fn track(&self, token: &str, track_id: &str, market: Option<&str>) -> Result<Track> {
        let id = require_id("track", track_id)?;
        let query = Query::new().market(market)?;
        self.get(token, Endpoint::Track(id), query).await
    }

    pub async fn audio_features(&self, token: &str, track_id: &str) -> Result<AudioFeatures> {
        let id = require_id("track", track_id)?;
        self.get(token, Endpoint::AudioFeatures(id), Query::new())
            .await
    }

    /// Features in the order of `track_ids`; unknown ids come back as `None`.
    pub async fn audio_features_for_tracks(
        &self,
        token: &str,
        track_ids: &[&str],
    ) -> Result<Vec<Option<AudioFeatures>>> {
        if track_ids.is_empty() || track_ids.len() > MAX_LONG_PAGE_SIZE as usize {
            return Err(Error::invalid(format!(
                "between 1 and {MAX_LONG_PAGE_SIZE} track ids are required, got {}",
                track_ids.len()
            )));
        }

        let ids = track_ids
            .iter()
            .map(|id| require_id("track", id))
            .collect::<Result<Vec<_>>>()?
            .join(",");

        let list: AudioFeaturesList = self
            .get(token, Endpoint::SeveralAudioFeatures, Query::new().with("ids", ids))
            .await?;
        Ok(list.audio_features)
    }

    pub async fn audio_analysis(&self, token: &str, track_id: &str) -> Result<AudioAnalysis> {
        let id = require_id("track", track_id)?;
        self.get(token, Endpoint::AudioAnalysis(id), Query::new())
            .await
    }

    /// Creates a playlist owned by `user_id`. Never retried: a repeated call
    /// creates a second playlist.
    pub async fn create_playlist(
        &self,
        token: &str,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        public: bool,
    ) -> Result<Playlist> {
        let user_id = require_id("user", user_id)?;
        if name.trim().is_empty() {
            return Err(Error::invalid("playlist name must not be empty"));
        }

        let body = serde_json::to_value(CreatePlaylistBody {
            name,
            description,
            public,
        })?;

        info!("creating playlist {name:?} for {user_id}");
        self.post(token, Endpoint::UserPlaylists(user_id), body)
            .await
    }

    /// Appends (or inserts at `position`) track uris. Never retried: a
    /// repeated call inserts the tracks twice.
    pub async fn add_tracks_to_playlist(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
        position: Option<u32>,
    ) -> Result<SnapshotId> {
        let id = require_id("playlist", playlist_id)?;
        if uris.is_empty() || uris.len() > MAX_URIS_PER_REQUEST {
            return Err(Error::invalid(format!(
                "between 1 and {MAX_URIS_PER_REQUEST} uris are required, got {}",
                uris.len()
            )));
        }
        if uris.iter().any(|uri| uri.trim().is_empty()) {
            return Err(Error::invalid("track uris must not be empty"));
        }

        let body = serde_json::to_value(AddTracksBody { uris, position })?;

        info!("adding {} tracks to playlist {id}", uris.len());
        self.post(token, Endpoint::PlaylistTracks(id), body).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        endpoint: Endpoint<'_>,
        query: Query,
    ) -> Result<T> {
        self.call(Method::GET, token, endpoint, query, None).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        token: &str,
        endpoint: Endpoint<'_>,
        body: Value,
    ) -> Result<T> {
        self.call(Method::POST, token, endpoint, Query::new(), Some(body))
            .await
    }

    #[instrument(skip_all, fields(%method, %endpoint))]
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        token: &str,
        endpoint: Endpoint<'_>,
        query: Query,
        body: Option<Value>,
    ) -> Result<T> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Unauthorized {
                message: "no access token".to_string(),
            });
        }

        let url = self.url(&endpoint, query)?;
        debug!("calling {url}");

        let request = HttpRequest {
            method,
            url,
            bearer_token: token.to_string(),
            body,
        };

        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| Error::Unavailable {
                message: format!("no response within {:?}", self.timeout),
            })??;

        decode(response)
    }

    fn url(&self, endpoint: &Endpoint<'_>, query: Query) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| Error::invalid("base url cannot carry a path"))?
            .pop_if_empty()
            .extend(endpoint.segments());

        if !query.0.is_empty() {
            url.query_pairs_mut().extend_pairs(query.0);
        }

        Ok(url)
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let status = response.status;

    if status.is_success() {
        let body = if status == StatusCode::NO_CONTENT || response.body.trim().is_empty() {
            "{}"
        } else {
            response.body.as_str()
        };

        return serde_json::from_str(body).map_err(|e| {
            error!("unable to decode {status} response: {e}");
            Error::from(e)
        });
    }

    let message = error_message(&response.body)
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
    debug!("request failed with {status}: {message}");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized { message },
        StatusCode::NOT_FOUND => Error::NotFound { message },
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
            retry_after: response.retry_after,
            message,
        },
        status if status.is_client_error() => Error::InvalidArgument { message },
        _ => Error::Unavailable { message },
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    value["error"]["message"]
        .as_str()
        .or_else(|| value["error_description"].as_str())
        .or_else(|| value["error"].as_str())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    #[derive(Debug, Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn replying(responses: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Default::default(),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }

        fn last_query(&self) -> HashMap<String, String> {
            self.last_request()
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::ok("{}")))
        }
    }

    #[derive(Debug)]
    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(HttpResponse::ok("{}"))
        }
    }

    fn client(transport: Arc<MockTransport>) -> CatalogClient {
        CatalogClient::with_transport(ClientConfig::default(), transport).unwrap()
    }

    fn status(status: StatusCode, body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        })
    }

    const TRACK: &str = include_str!("../fixtures/track.json");
    const SEARCH: &str = include_str!("../fixtures/search.json");

    #[test]
    fn blank_search_never_reaches_the_network() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        for query in ["", "   ", "\t\n"] {
            let result = tokio_test::block_on(client.search(
                "token",
                query,
                &SearchType::ALL,
                20,
                0,
                None,
            ));
            assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        }

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn search_clamps_limit_and_offset() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(SEARCH))]);
        let client = client(transport.clone());

        let result = client
            .search(
                "token",
                "  feeling ",
                &[SearchType::Track, SearchType::Playlist],
                500,
                5000,
                Some("ID"),
            )
            .await
            .unwrap();
        assert_eq!(result.tracks.unwrap().items.len(), 2);

        let query = transport.last_query();
        assert_eq!(query["limit"], "50");
        assert_eq!(query["offset"], "1000");
        assert_eq!(query["q"], "feeling");
        assert_eq!(query["type"], "track,playlist");
        assert_eq!(query["market"], "ID");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn search_requires_a_type() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        let result = client.search("token", "feeling", &[], 10, 0, None).await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn requests_carry_the_bearer_token() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(TRACK))]);
        let client = client(transport.clone());

        let track = client
            .track(" BQDa1-token ", "11dFghVXANMlKmJXsNCbNl", None)
            .await
            .unwrap();
        assert_eq!(track.duration_ms, 207959);

        let request = transport.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.bearer_token, "BQDa1-token");
        assert_eq!(
            request.url.as_str(),
            "https://api.spotify.com/v1/tracks/11dFghVXANMlKmJXsNCbNl"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_fast() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        let result = client.profile("  ").await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn ids_are_validated_and_encoded() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        let result = client.artist("token", "").await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        assert_eq!(transport.calls(), 0);

        let _ = client.playlist("token", "a/b c", None).await;
        assert_eq!(
            transport.last_request().url.path(),
            "/v1/playlists/a%2Fb%20c"
        );
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let transport = MockTransport::replying(vec![
            status(
                StatusCode::UNAUTHORIZED,
                include_str!("../fixtures/error_401.json"),
            ),
            status(StatusCode::NOT_FOUND, ""),
            Ok(HttpResponse {
                status: StatusCode::TOO_MANY_REQUESTS,
                retry_after: Some(Duration::from_secs(4)),
                body: String::new(),
            }),
            status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            status(
                StatusCode::BAD_REQUEST,
                r#"{"error": {"status": 400, "message": "Invalid limit"}}"#,
            ),
        ]);
        let client = client(transport.clone());

        assert_eq!(
            client.profile("token").await.unwrap_err(),
            Error::Unauthorized {
                message: "The access token expired".into()
            }
        );
        assert_eq!(
            client.artist("token", "nope").await.unwrap_err(),
            Error::NotFound {
                message: "HTTP error 404".into()
            }
        );

        let limited = client.album("token", "x", None).await.unwrap_err();
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(4)));

        assert!(matches!(
            client.track("token", "x", None).await,
            Err(Error::Unavailable { .. })
        ));
        assert_eq!(
            client.audio_features("token", "x").await.unwrap_err(),
            Error::InvalidArgument {
                message: "Invalid limit".into()
            }
        );
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(
            r#"{"id": "", "name": "no id", "duration_ms": 1}"#,
        ))]);
        let client = client(transport);

        assert!(matches!(
            client.track("token", "x", None).await,
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let transport = MockTransport::replying(vec![Err(Error::Unavailable {
            message: "connection reset".into(),
        })]);
        let client = client(transport);

        let error = client.profile("token").await.unwrap_err();
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let config = ClientConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let client = CatalogClient::with_transport(config, Arc::new(StalledTransport)).unwrap();

        let error = client.profile("token").await.unwrap_err();
        assert!(matches!(error, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn pages_clamp_to_endpoint_maximum() {
        let page = r#"{"items": [], "total": 0, "limit": 100, "offset": 0}"#;
        let transport = MockTransport::replying(vec![
            Ok(HttpResponse::ok(page)),
            Ok(HttpResponse::ok(page)),
            Ok(HttpResponse::ok(page)),
        ]);
        let client = client(transport.clone());

        client
            .album_tracks("token", "album", 1000, 0, None)
            .await
            .unwrap();
        assert_eq!(transport.last_query()["limit"], "100");

        client
            .top_artists("token", TimeRange::ShortTerm, 0, 10)
            .await
            .unwrap();
        let query = transport.last_query();
        assert_eq!(query["limit"], "1");
        assert_eq!(query["offset"], "10");
        assert_eq!(query["time_range"], "short_term");

        client.playlist_items("token", "p", 250, 0).await.unwrap();
        assert_eq!(transport.last_query()["limit"], "100");
    }

    #[tokio::test]
    async fn browse_endpoints_unwrap_their_envelopes() {
        let transport = MockTransport::replying(vec![
            Ok(HttpResponse::ok(
                r#"{"albums": {"items": [{"id": "a1", "name": "New", "album_type": "single",
                    "release_date": "2024-05", "total_tracks": 1}], "total": 1, "limit": 20, "offset": 0}}"#,
            )),
            Ok(HttpResponse::ok(
                r#"{"categories": {"items": [{"id": "pop", "name": "Pop", "icons": []}],
                    "total": 1, "limit": 20, "offset": 0}}"#,
            )),
            Ok(HttpResponse::ok(
                r#"{"message": "Monday picks", "playlists": {"items": [{"id": "37i9dQZF1DXcBWIGoYBM5M",
                    "name": "Today's Top Hits", "owner": {"id": "spotify"}}],
                    "total": 1, "limit": 50, "offset": 5}}"#,
            )),
            Ok(HttpResponse::ok(
                r#"{"playlists": {"items": [{"id": "37i9dQZF1DWUa8ZRTfalHk",
                    "name": "Pop Rising", "owner": {"id": "spotify"}}],
                    "total": 1, "limit": 10, "offset": 0}}"#,
            )),
        ]);
        let client = client(transport.clone());

        let releases = client.new_releases("token", 20, 0, Some("SE")).await.unwrap();
        assert_eq!(releases.items[0].release_date.to_string(), "2024-05");
        assert_eq!(transport.last_query()["country"], "SE");

        let categories = client.categories("token", 20, 0, None, Some("sv_SE")).await.unwrap();
        assert_eq!(categories.items[0].id.as_str(), "pop");
        assert_eq!(transport.last_query()["locale"], "sv_SE");

        let featured = client
            .featured_playlists("token", 80, 5, Some("SE"), None)
            .await
            .unwrap();
        assert_eq!(featured.message.as_deref(), Some("Monday picks"));
        assert_eq!(featured.playlists.items[0].owner.id, "spotify");
        let request = transport.last_request();
        assert_eq!(request.url.path(), "/v1/browse/featured-playlists");
        let query = transport.last_query();
        assert_eq!(query["limit"], "50");
        assert_eq!(query["offset"], "5");
        assert_eq!(query["country"], "SE");
        assert!(!query.contains_key("locale"));

        let playlists = client
            .category_playlists("token", "pop", 10, 0, None)
            .await
            .unwrap();
        assert_eq!(playlists.items[0].name, "Pop Rising");
        assert_eq!(
            transport.last_request().url.path(),
            "/v1/browse/categories/pop/playlists"
        );
    }

    #[tokio::test]
    async fn artist_albums_sorts_and_dedups_groups() {
        let transport = MockTransport::replying(vec![
            Ok(HttpResponse::ok(r#"{"items": [], "total": 0, "limit": 20, "offset": 0}"#)),
            Ok(HttpResponse::ok(r#"{"items": [], "total": 0, "limit": 20, "offset": 0}"#)),
        ]);
        let client = client(transport.clone());

        let groups = [
            IncludeGroup::AppearsOn,
            IncludeGroup::Album,
            IncludeGroup::AppearsOn,
            IncludeGroup::Single,
        ];
        client
            .artist_albums("token", "4NHQUGzhtTLFvgF5SZesLK", &groups, 20, 0, Some("US"))
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.url.path(), "/v1/artists/4NHQUGzhtTLFvgF5SZesLK/albums");
        let query = transport.last_query();
        assert_eq!(query["include_groups"], "album,single,appears_on");
        assert_eq!(query["market"], "US");

        client
            .artist_albums("token", "4NHQUGzhtTLFvgF5SZesLK", &[], 20, 0, None)
            .await
            .unwrap();
        assert!(!transport.last_query().contains_key("include_groups"));
    }

    #[tokio::test]
    async fn recommendations_send_seeds_and_attributes() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(
            r#"{"seeds": [{"id": "pop", "type": "GENRE", "initialPoolSize": 250}], "tracks": []}"#,
        ))]);
        let client = client(transport.clone());

        let mut request = RecommendationRequest {
            seed_tracks: vec!["11dFghVXANMlKmJXsNCbNl".into()],
            seed_genres: vec!["pop".into()],
            limit: Some(10),
            market: Some("from_token".into()),
            ..Default::default()
        };
        request.attributes.insert("target_valence".into(), 0.8);

        let recommendations = client.recommendations("token", &request).await.unwrap();
        assert_eq!(recommendations.seeds[0].initial_pool_size, 250);

        assert_eq!(transport.last_request().url.path(), "/v1/recommendations");
        let query = transport.last_query();
        assert_eq!(query["limit"], "10");
        assert_eq!(query["seed_tracks"], "11dFghVXANMlKmJXsNCbNl");
        assert_eq!(query["seed_genres"], "pop");
        assert_eq!(query["market"], "from_token");
        assert_eq!(query["target_valence"], "0.8");
        assert!(!query.contains_key("seed_artists"));
    }

    #[tokio::test]
    async fn bad_country_is_rejected_locally() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        let result = client.new_releases("token", 20, 0, Some("Sweden")).await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn recently_played_sends_one_cursor() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(
            r#"{"items": [], "limit": 50, "next": null, "cursors": null}"#,
        ))]);
        let client = client(transport.clone());

        let at = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        client
            .recently_played("token", 75, Some(PlayedCursor::Before(at)))
            .await
            .unwrap();

        let query = transport.last_query();
        assert_eq!(query["limit"], "50");
        assert_eq!(query["before"], "1700000000000");
        assert!(!query.contains_key("after"));
    }

    #[tokio::test]
    async fn create_playlist_posts_json_once() {
        let created = r#"{"id": "7d2D2S200NyUE5KYs80PwO", "name": "Focus",
            "description": "deep work", "owner": {"id": "ana.k"}, "public": false,
            "tracks": {"items": [], "total": 0, "limit": 100, "offset": 0}}"#;
        let transport = MockTransport::replying(vec![status(StatusCode::CREATED, created)]);
        let client = client(transport.clone());

        let playlist = client
            .create_playlist("token", "ana.k", "Focus", Some("deep work"), false)
            .await
            .unwrap();
        assert_eq!(playlist.name, "Focus");

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.path(), "/v1/users/ana.k/playlists");
        assert_eq!(
            request.body,
            Some(serde_json::json!({"name": "Focus", "description": "deep work", "public": false}))
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn create_playlist_needs_a_name_and_an_owner() {
        let transport = MockTransport::replying(vec![]);
        let client = client(transport.clone());

        let blank_name = client
            .create_playlist("token", "ana.k", "  ", None, false)
            .await;
        assert!(matches!(blank_name, Err(Error::InvalidArgument { .. })));

        let no_owner = client
            .create_playlist("token", "", "Focus", None, false)
            .await;
        assert!(matches!(no_owner, Err(Error::InvalidArgument { .. })));

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn failed_writes_are_not_retried() {
        let transport = MockTransport::replying(vec![status(StatusCode::SERVICE_UNAVAILABLE, "")]);
        let client = client(transport.clone());

        let uris = vec!["spotify:track:11dFghVXANMlKmJXsNCbNl".to_string()];
        let result = client
            .add_tracks_to_playlist("token", "3cEYpjA9oz9GiPac4AsH4n", &uris, None)
            .await;

        assert!(matches!(result, Err(Error::Unavailable { .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn add_tracks_validates_uris() {
        let transport = MockTransport::replying(vec![status(
            StatusCode::CREATED,
            r#"{"snapshot_id": "abc"}"#,
        )]);
        let client = client(transport.clone());

        let too_many = vec!["spotify:track:x".to_string(); 101];
        assert!(
            client
                .add_tracks_to_playlist("token", "p", &too_many, None)
                .await
                .is_err()
        );
        assert!(
            client
                .add_tracks_to_playlist("token", "p", &[], None)
                .await
                .is_err()
        );
        assert_eq!(transport.calls(), 0);

        let uris = vec!["spotify:track:x".to_string()];
        let snapshot = client
            .add_tracks_to_playlist("token", "p", &uris, Some(0))
            .await
            .unwrap();
        assert_eq!(snapshot.snapshot_id, "abc");
        assert_eq!(
            transport.last_request().body,
            Some(serde_json::json!({"uris": ["spotify:track:x"], "position": 0}))
        );
    }

    #[tokio::test]
    async fn several_audio_features_joins_ids() {
        let transport = MockTransport::replying(vec![Ok(HttpResponse::ok(
            r#"{"audio_features": [null]}"#,
        ))]);
        let client = client(transport.clone());

        let features = client
            .audio_features_for_tracks("token", &["a", "b"])
            .await
            .unwrap();
        assert_eq!(features, vec![None]);
        assert_eq!(transport.last_query()["ids"], "a,b");

        assert!(
            client
                .audio_features_for_tracks("token", &[])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn no_content_decodes_as_empty_object() {
        #[derive(serde::Deserialize)]
        struct Empty {}

        let transport = MockTransport::replying(vec![status(StatusCode::NO_CONTENT, "")]);
        let client = client(transport);

        let _: Empty = client.get("token", Endpoint::Me, Query::new()).await.unwrap();
    }

    #[test]
    fn base_url_with_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        };
        let client = CatalogClient::with_transport(config, MockTransport::replying(vec![])).unwrap();

        let url = client
            .url(&Endpoint::ArtistTopTracks("abc"), Query::new().with("market", "US"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1/artists/abc/top-tracks?market=US"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let config = ClientConfig {
            base_url: "mailto:someone@example.com".into(),
            ..Default::default()
        };
        assert!(CatalogClient::with_transport(config, MockTransport::replying(vec![])).is_err());
    }
}
