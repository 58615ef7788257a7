//! Query Filters
//!
//! Builders translating typed filter options into the query pairs the API
//! expects. Combinations the server would reject (or quietly mishandle) are
//! caught here, before any request goes out.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Largest page the API will serve.
pub(crate) const MAX_PAGE_SIZE: usize = 100;

/// Format a datetime the way the API expects query parameters: UTC,
/// seconds precision, `Z` suffix.
pub(crate) fn datetime_param(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Filters for the server listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct ServerFilter {
    search: Option<String>,
    game: Option<String>,
    countries: Vec<String>,
    limit: Option<usize>,
    page_size: Option<usize>,
}

impl ServerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search term to match servers against.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Filter by game name.
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    /// Filter by ISO 3166-1 alpha-2 country codes.
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum number of servers to yield. Defaults to 10.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of servers fetched per page. Defaults to the limit, capped at
    /// the API maximum of 100.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub(crate) fn into_query(self) -> Result<FilterQuery> {
        let limit = validate_limit(self.limit)?;
        let mut params = Vec::new();
        if let Some(search) = self.search {
            params.push(("filter[search]".to_string(), search));
        }
        if let Some(game) = self.game {
            params.push(("filter[game]".to_string(), game));
        }
        for country in self.countries {
            params.push(("filter[countries][]".to_string(), country));
        }
        Ok(FilterQuery {
            params,
            limit,
            page_size: effective_page_size(self.page_size, limit),
        })
    }
}

/// Filters for the player listing endpoint.
///
/// Some filters are only honored for authenticated requests; those are
/// rejected with [`Error::InvalidQuery`] when the client has no token, the
/// same way the API itself would refuse them.
#[derive(Debug, Clone)]
pub struct PlayerFilter {
    countries: Vec<String>,
    max_distance: Option<u32>,
    first_seen_after: Option<DateTime<Utc>>,
    first_seen_before: Option<DateTime<Utc>>,
    game: Option<String>,
    include_identifiers: bool,
    is_online: bool,
    last_seen_after: Option<DateTime<Utc>>,
    last_seen_before: Option<DateTime<Utc>>,
    online_at: Option<DateTime<Utc>>,
    organization_id: Option<i64>,
    public: bool,
    search: Option<String>,
    server_ids: Vec<i64>,
    limit: Option<usize>,
    page_size: Option<usize>,
}

impl Default for PlayerFilter {
    fn default() -> Self {
        Self {
            countries: Vec::new(),
            max_distance: None,
            first_seen_after: None,
            first_seen_before: None,
            game: None,
            include_identifiers: false,
            is_online: false,
            last_seen_after: None,
            last_seen_before: None,
            online_at: None,
            organization_id: None,
            public: true,
            search: None,
            server_ids: Vec::new(),
            limit: None,
            page_size: None,
        }
    }
}

impl PlayerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by the countries the players' servers are hosted in.
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Filter by maximum server distance to the client, in kilometres.
    pub fn with_max_distance(mut self, kilometres: u32) -> Self {
        self.max_distance = Some(kilometres);
        self
    }

    /// Filter by players first seen after this time. Requires a token with
    /// RCON permissions and `with_server_ids`.
    pub fn with_first_seen_after(mut self, dt: DateTime<Utc>) -> Self {
        self.first_seen_after = Some(dt);
        self
    }

    /// Filter by players first seen before this time. Requires a token with
    /// RCON permissions and `with_server_ids`.
    pub fn with_first_seen_before(mut self, dt: DateTime<Utc>) -> Self {
        self.first_seen_before = Some(dt);
        self
    }

    /// Filter by game name.
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    /// Also fetch each player's identifiers. Public results only carry
    /// name identifiers.
    pub fn include_identifiers(mut self) -> Self {
        self.include_identifiers = true;
        self
    }

    /// Only return players that are currently online.
    pub fn online_only(mut self) -> Self {
        self.is_online = true;
        self
    }

    /// Filter by players last seen after this time.
    pub fn with_last_seen_after(mut self, dt: DateTime<Utc>) -> Self {
        self.last_seen_after = Some(dt);
        self
    }

    /// Filter by players last seen before this time.
    pub fn with_last_seen_before(mut self, dt: DateTime<Utc>) -> Self {
        self.last_seen_before = Some(dt);
        self
    }

    /// Filter by players online at this time. Requires `private_only`.
    pub fn with_online_at(mut self, dt: DateTime<Utc>) -> Self {
        self.online_at = Some(dt);
        self
    }

    /// Filter by organization. Requires authentication.
    pub fn with_organization_id(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Exclude public records, returning only players seen on your own
    /// servers. Requires authentication.
    pub fn private_only(mut self) -> Self {
        self.public = false;
        self
    }

    /// Search term to match players against. Public results only match
    /// names.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Filter by server ids.
    pub fn with_server_ids<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.server_ids = ids.into_iter().collect();
        self
    }

    /// Maximum number of players to yield. Defaults to 10.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of players fetched per page. Defaults to the limit, capped at
    /// the API maximum of 100.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub(crate) fn into_query(self, authenticated: bool) -> Result<FilterQuery> {
        let limit = validate_limit(self.limit)?;

        if self.first_seen_after.is_some() || self.first_seen_before.is_some() {
            if !authenticated {
                return Err(Error::InvalidQuery(
                    "first seen filters require authentication".to_string(),
                ));
            }
            if self.server_ids.is_empty() {
                // The API answers these with a 500 instead of an error.
                return Err(Error::InvalidQuery(
                    "first seen filters require server ids".to_string(),
                ));
            }
        }
        if self.online_at.is_some() && self.public {
            return Err(Error::InvalidQuery(
                "online_at requires private_only".to_string(),
            ));
        }
        if (self.organization_id.is_some() || !self.public) && !authenticated {
            return Err(Error::InvalidQuery(
                "organization and private filters require authentication".to_string(),
            ));
        }

        let mut params = vec![("sort".to_string(), "-lastSeen".to_string())];
        for country in self.countries {
            params.push(("filter[server][countries][]".to_string(), country));
        }
        if let Some(distance) = self.max_distance {
            params.push(("filter[server][maxDistance]".to_string(), distance.to_string()));
        }
        if self.first_seen_after.is_some() || self.first_seen_before.is_some() {
            let window = format!(
                "{}:{}",
                self.first_seen_after.map(|d| datetime_param(&d)).unwrap_or_default(),
                self.first_seen_before.map(|d| datetime_param(&d)).unwrap_or_default(),
            );
            params.push(("filter[firstSeen]".to_string(), window));
        }
        if let Some(game) = self.game {
            params.push(("filter[server][game]".to_string(), game));
        }
        if self.include_identifiers {
            params.push(("include".to_string(), "identifier".to_string()));
        }
        if self.is_online {
            params.push(("filter[online]".to_string(), "true".to_string()));
        }
        if let Some(after) = self.last_seen_after {
            params.push(("filter[after]".to_string(), datetime_param(&after)));
        }
        if let Some(before) = self.last_seen_before {
            params.push(("filter[before]".to_string(), datetime_param(&before)));
        }
        if let Some(at) = self.online_at {
            params.push(("filter[sessions][at]".to_string(), datetime_param(&at)));
        }
        if let Some(org) = self.organization_id {
            params.push(("filter[organization]".to_string(), org.to_string()));
        }
        if !self.public {
            // The API defaults to public results.
            params.push(("filter[public]".to_string(), "false".to_string()));
        }
        if let Some(search) = self.search {
            params.push(("filter[search]".to_string(), search));
        }
        if !self.server_ids.is_empty() {
            params.push(("filter[servers]".to_string(), join_ids(&self.server_ids)));
        }

        Ok(FilterQuery {
            params,
            limit,
            page_size: effective_page_size(self.page_size, limit),
        })
    }
}

/// Filters for a player's session history.
#[derive(Debug, Clone)]
pub struct SessionFilter {
    organization_ids: Vec<i64>,
    server_ids: Vec<i64>,
    include_servers: bool,
    limit: Option<usize>,
    page_size: Option<usize>,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            organization_ids: Vec::new(),
            server_ids: Vec::new(),
            include_servers: true,
            limit: None,
            page_size: None,
        }
    }
}

impl SessionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter sessions by organization ids.
    pub fn with_organization_ids<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.organization_ids = ids.into_iter().collect();
        self
    }

    /// Filter sessions by server ids.
    pub fn with_server_ids<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.server_ids = ids.into_iter().collect();
        self
    }

    /// Skip fetching server data; sessions then carry only the server id.
    pub fn without_servers(mut self) -> Self {
        self.include_servers = false;
        self
    }

    /// Maximum number of sessions to yield. Defaults to 10.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of sessions fetched per page. Defaults to the limit, capped at
    /// the API maximum of 100.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub(crate) fn into_query(self) -> Result<FilterQuery> {
        let limit = validate_limit(self.limit)?;
        let mut params = Vec::new();
        if !self.organization_ids.is_empty() {
            params.push((
                "filter[organizations]".to_string(),
                join_ids(&self.organization_ids),
            ));
        }
        if !self.server_ids.is_empty() {
            params.push(("filter[servers]".to_string(), join_ids(&self.server_ids)));
        }
        if self.include_servers {
            params.push(("include".to_string(), "server".to_string()));
        }
        Ok(FilterQuery {
            params,
            limit,
            page_size: effective_page_size(self.page_size, limit),
        })
    }
}

/// A validated filter, ready to paginate with.
#[derive(Debug, Clone)]
pub(crate) struct FilterQuery {
    pub params: Vec<(String, String)>,
    pub limit: usize,
    pub page_size: usize,
}

fn validate_limit(limit: Option<usize>) -> Result<usize> {
    let limit = limit.unwrap_or(10);
    if limit < 1 {
        return Err(Error::InvalidQuery("limit must be at least 1".to_string()));
    }
    Ok(limit)
}

fn effective_page_size(page_size: Option<usize>, limit: usize) -> usize {
    // limit has already been validated to be at least 1.
    page_size.unwrap_or(limit).min(limit).clamp(1, MAX_PAGE_SIZE)
}
