//! battlemetrics - BattleMetrics API Client
//!
//! An asynchronous, rate-limit-aware client for the BattleMetrics
//! game-server metrics API. Requests are paced against the budget the
//! server advertises in its rate limit headers, list endpoints are exposed
//! as lazy streams that fetch pages on demand, and every response is parsed
//! into typed result objects.
//!
//! ```no_run
//! use battlemetrics::{BattleMetricsClient, PlayerFilter};
//! use futures::TryStreamExt;
//!
//! # async fn run() -> battlemetrics::Result<()> {
//! let client = BattleMetricsClient::new(Some("token".to_string()))?;
//!
//! let server = client.get_server_info(12345, true).await?;
//! println!("{}: {}/{}", server.name, server.player_count, server.max_players);
//!
//! let players: Vec<_> = client
//!     .list_players(PlayerFilter::new().online_only().with_limit(50))?
//!     .try_collect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;

pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use api::{
    DataPoint, Document, Identifier, IdentifierType, Player, PlayerFilter, Resolution, Server,
    ServerFilter, Session, SessionFilter,
};
pub use client::ApiRequest;
pub use config::ClientOptions;
pub use error::{Error, Result};

use api::filters::datetime_param;
use client::http::HttpClient;
use client::pages::paginate;

/// Most identifiers one `match_players` call may carry.
pub const MAX_MATCH_IDENTIFIERS: usize = 100;

/// The main BattleMetrics client.
///
/// All requests from one instance share a single connection pool and a
/// single view of the server's rate limit budget. Construct one client and
/// share it; a second instance paces independently and the two together can
/// overrun the server's limits.
pub struct BattleMetricsClient {
    http: HttpClient,
}

impl BattleMetricsClient {
    /// Create a client with default options.
    ///
    /// Most endpoints work without a token; passing one unlocks the
    /// endpoints and filters that need RCON permissions.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_options(token, ClientOptions::new())
    }

    /// Create a client with custom options.
    pub fn with_options(token: Option<String>, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(token, &options)?,
        })
    }

    /// Whether a token was configured.
    pub fn is_authenticated(&self) -> bool {
        self.http.is_authenticated()
    }

    /// Issue a raw request against an arbitrary endpoint.
    ///
    /// The typed methods below cover the common endpoints; this is the
    /// escape hatch for the rest of the API surface, with the same pacing
    /// and error mapping applied.
    pub async fn request(&self, request: ApiRequest) -> Result<Document> {
        self.http.request(request).await
    }

    /// Get a server's info by id, optionally with its current players.
    pub async fn get_server_info(&self, server_id: i64, include_players: bool) -> Result<Server> {
        let mut request = ApiRequest::get(format!("/servers/{}", server_id));
        if include_players {
            request = request.param("include", "player");
        }
        let doc = self.http.request(request).await?;
        Server::from_document(&doc)
    }

    /// Stream servers matching the given filter.
    pub fn list_servers(
        &self,
        filter: ServerFilter,
    ) -> Result<impl Stream<Item = Result<Server>> + '_> {
        let query = filter.into_query()?;
        let request = ApiRequest::get("/servers").params(query.params);
        Ok(paginate(
            &self.http,
            request,
            query.page_size,
            query.limit,
            |doc| doc.many().iter().map(Server::from_resource).collect(),
        ))
    }

    /// Get a player's info by their BattleMetrics id.
    pub async fn get_player_info(&self, player_id: i64) -> Result<Player> {
        let doc = self
            .http
            .request(ApiRequest::get(format!("/players/{}", player_id)))
            .await?;
        Player::from_resource(doc.one()?, Vec::new())
    }

    /// Stream players matching the given filter, most recently seen first.
    ///
    /// When the filter requests identifiers, each player carries the
    /// identifiers side-loaded on its page.
    pub fn list_players(
        &self,
        filter: PlayerFilter,
    ) -> Result<impl Stream<Item = Result<Player>> + '_> {
        let query = filter.into_query(self.http.is_authenticated())?;
        let request = ApiRequest::get("/players").params(query.params);
        Ok(paginate(
            &self.http,
            request,
            query.page_size,
            query.limit,
            players_of_page,
        ))
    }

    /// Stream a player's sessions, most recent first.
    ///
    /// Unless the filter disabled it, each session carries its server's
    /// data as well.
    pub fn get_player_session_history(
        &self,
        player_id: i64,
        filter: SessionFilter,
    ) -> Result<impl Stream<Item = Result<Session>> + '_> {
        let query = filter.into_query()?;
        let request = ApiRequest::get(format!("/players/{}/relationships/sessions", player_id))
            .params(query.params);
        Ok(paginate(
            &self.http,
            request,
            query.page_size,
            query.limit,
            sessions_of_page,
        ))
    }

    /// Get the BattleMetrics ids of players matching the given identifiers.
    ///
    /// Requires a token with RCON permissions. At most
    /// [`MAX_MATCH_IDENTIFIERS`] identifiers per call; the endpoint itself
    /// allows one request per second, which the client paces for you.
    ///
    /// Returns a map from each requested identifier to the matched player
    /// id. Unmatched identifiers map to `None`.
    pub async fn match_players(
        &self,
        identifiers: &[String],
        kind: IdentifierType,
    ) -> Result<BTreeMap<String, Option<i64>>> {
        if identifiers.is_empty() {
            return Err(Error::InvalidQuery(
                "at least one identifier must be given".to_string(),
            ));
        }
        if identifiers.len() > MAX_MATCH_IDENTIFIERS {
            return Err(Error::InvalidQuery(format!(
                "at most {} identifiers can be matched at once",
                MAX_MATCH_IDENTIFIERS
            )));
        }

        let kind = serde_json::to_value(kind)?;
        let body = serde_json::json!({
            "data": identifiers
                .iter()
                .map(|identifier| {
                    serde_json::json!({
                        "type": "identifier",
                        "attributes": {
                            "type": kind.clone(),
                            "identifier": identifier,
                        }
                    })
                })
                .collect::<Vec<_>>(),
        });
        let request = ApiRequest::post("/players/match")
            .json(body)
            .with_bucket("players/match", 1, Duration::from_secs(1));
        let doc = self.http.request(request).await?;

        let mut results: BTreeMap<String, Option<i64>> = identifiers
            .iter()
            .map(|identifier| (identifier.clone(), None))
            .collect();
        for resource in doc.many() {
            let matched = resource
                .attributes
                .get("identifier")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    Error::MalformedResponse("match result without an identifier".to_string())
                })?;
            results.insert(matched.to_string(), Some(resource.related_id("player")?));
        }
        Ok(results)
    }

    /// Get a server's player count history, sorted by timestamp.
    pub async fn get_player_count_history(
        &self,
        server_id: i64,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        resolution: Resolution,
    ) -> Result<Vec<DataPoint>> {
        let request = ApiRequest::get(format!("/servers/{}/player-count-history", server_id))
            .param("start", datetime_param(&start))
            .param("stop", datetime_param(&stop))
            .param("resolution", resolution.as_param());
        let doc = self.http.request(request).await?;
        datapoints_of_page(&doc)
    }

    /// Get a player's time played history on a server, one data point per
    /// day, sorted by timestamp.
    pub async fn get_player_time_played_history(
        &self,
        player_id: i64,
        server_id: i64,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>> {
        let request = ApiRequest::get(format!(
            "/players/{}/time-played-history/{}",
            player_id, server_id
        ))
        .param("start", datetime_param(&start))
        .param("stop", datetime_param(&stop));
        let doc = self.http.request(request).await?;
        datapoints_of_page(&doc)
    }
}

/// Build the players of one page, attaching side-loaded identifiers to
/// their owners.
fn players_of_page(doc: &Document) -> Result<Vec<Player>> {
    let mut identifiers: BTreeMap<i64, Vec<Identifier>> = BTreeMap::new();
    for resource in doc.included_of("identifier") {
        let identifier = Identifier::from_resource(resource)?;
        identifiers
            .entry(identifier.player_id)
            .or_default()
            .push(identifier);
    }

    doc.many()
        .iter()
        .map(|resource| {
            let own = resource
                .id_i64()
                .ok()
                .and_then(|id| identifiers.remove(&id))
                .unwrap_or_default();
            Player::from_resource(resource, own)
        })
        .collect()
}

/// Build the sessions of one page, wiring in side-loaded servers.
fn sessions_of_page(doc: &Document) -> Result<Vec<Session>> {
    let mut servers: BTreeMap<i64, Server> = BTreeMap::new();
    for resource in doc.included_of("server") {
        let server = Server::from_resource(resource)?;
        servers.insert(server.id, server);
    }

    doc.many()
        .iter()
        .map(|resource| {
            let server = resource
                .related_id("server")
                .ok()
                .and_then(|id| servers.get(&id).cloned());
            Session::from_resource(resource, server)
        })
        .collect()
}

fn datapoints_of_page(doc: &Document) -> Result<Vec<DataPoint>> {
    let mut points: Vec<DataPoint> = doc
        .many()
        .iter()
        .map(|resource| resource.attributes_as::<DataPoint>())
        .collect::<Result<_>>()?;
    points.sort_by_key(|point| point.timestamp);
    Ok(points)
}
