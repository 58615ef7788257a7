//! Session Records

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::document::Resource;
use crate::api::server::Server;
use crate::error::Result;

/// One stretch of time a player spent on a server.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The session identifier.
    pub id: String,

    /// The player's id.
    pub player_id: i64,

    /// The player's name at the time of the session.
    pub player_name: String,

    /// The id of the server the session took place on.
    pub server_id: i64,

    /// Whether this was the player's first time on the server.
    pub first_time: bool,

    /// When the session started. BattleMetrics occasionally omits this.
    pub start: Option<DateTime<Utc>>,

    /// When the session ended. BattleMetrics occasionally omits this.
    pub stop: Option<DateTime<Utc>>,

    /// The server the session took place on, when server data was included.
    pub server: Option<Server>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionAttributes {
    name: String,
    #[serde(default)]
    first_time: bool,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    stop: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn from_resource(resource: &Resource, server: Option<Server>) -> Result<Self> {
        let attrs: SessionAttributes = resource.attributes_as()?;
        Ok(Self {
            id: resource.id.clone(),
            player_id: resource.related_id("player")?,
            player_name: attrs.name,
            server_id: resource.related_id("server")?,
            first_time: attrs.first_time,
            start: attrs.start,
            stop: attrs.stop,
            server,
        })
    }

    /// How long the session lasted, in seconds. Zero when either endpoint
    /// of the session is unknown.
    pub fn playtime(&self) -> f64 {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => (stop - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }
}
