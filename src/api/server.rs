//! Server Records
//!
//! Typed view of one game server as returned by the server endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::document::{Document, Resource};
use crate::api::player::Player;
use crate::error::Result;

/// A game server tracked by BattleMetrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    /// The server's id.
    pub id: i64,

    /// The server name.
    pub name: String,

    /// The server address, e.g. `play.example.com`, when one is set.
    pub address: Option<String>,

    /// The IPv4 address of the server.
    pub ip: String,

    /// The server's game port.
    pub port: u16,

    /// The server's query port.
    pub query_port: u16,

    /// The number of players currently on the server.
    pub player_count: i64,

    /// The maximum number of players the server allows.
    pub max_players: i64,

    /// The server's rank on the BattleMetrics leaderboards, when listed.
    pub rank: Option<i64>,

    /// ISO 3166-1 alpha-2 code of the hosting country.
    pub country: String,

    /// `"online"` or `"offline"`.
    pub status: String,

    /// Game-specific settings such as difficulty, map, or version.
    pub details: serde_json::Value,

    /// Whether the server is private.
    pub private: bool,

    /// When the server was created on BattleMetrics.
    pub created_at: DateTime<Utc>,

    /// When the server was last updated on BattleMetrics.
    pub updated_at: DateTime<Utc>,

    /// Players on the server. Empty unless player data was requested.
    pub players: Vec<Player>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerAttributes {
    name: String,
    #[serde(default)]
    address: Option<String>,
    ip: String,
    port: u16,
    port_query: u16,
    players: i64,
    max_players: i64,
    #[serde(default)]
    rank: Option<i64>,
    country: String,
    status: String,
    #[serde(default)]
    details: serde_json::Value,
    #[serde(default)]
    private: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Server {
    /// Build a server from a detail document, picking up any players
    /// side-loaded via `include=player`.
    pub(crate) fn from_document(doc: &Document) -> Result<Self> {
        let mut server = Self::from_resource(doc.one()?)?;
        server.players = doc
            .included_of("player")
            .map(|r| Player::from_resource(r, Vec::new()))
            .collect::<Result<Vec<_>>>()?;
        Ok(server)
    }

    /// Build a server from a bare resource, e.g. a list entry or an
    /// `included` record on a session page.
    pub(crate) fn from_resource(resource: &Resource) -> Result<Self> {
        let attrs: ServerAttributes = resource.attributes_as()?;
        Ok(Self {
            id: resource.id_i64()?,
            name: attrs.name,
            address: attrs.address,
            ip: attrs.ip,
            port: attrs.port,
            query_port: attrs.port_query,
            player_count: attrs.players,
            max_players: attrs.max_players,
            rank: attrs.rank,
            country: attrs.country,
            status: attrs.status,
            details: attrs.details,
            private: attrs.private,
            created_at: attrs.created_at,
            updated_at: attrs.updated_at,
            players: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "type": "server",
                "id": "12345",
                "attributes": {
                    "name": "Test Server",
                    "address": null,
                    "ip": "192.0.2.10",
                    "port": 2302,
                    "portQuery": 2303,
                    "players": 37,
                    "maxPlayers": 60,
                    "rank": 12,
                    "country": "US",
                    "status": "online",
                    "details": {"map": "Altis", "version": "2.04"},
                    "private": false,
                    "createdAt": "2020-05-01T10:30:00.000Z",
                    "updatedAt": "2021-06-15T08:00:00.000Z"
                }
            },
            "included": []
        })
    }

    #[test]
    fn test_server_round_trip() {
        let doc: Document = serde_json::from_value(fixture()).unwrap();
        let server = Server::from_document(&doc).unwrap();

        assert_eq!(server.id, 12345);
        assert_eq!(server.name, "Test Server");
        assert_eq!(server.address, None);
        assert_eq!(server.ip, "192.0.2.10");
        assert_eq!(server.port, 2302);
        assert_eq!(server.query_port, 2303);
        assert_eq!(server.player_count, 37);
        assert_eq!(server.max_players, 60);
        assert_eq!(server.rank, Some(12));
        assert_eq!(server.country, "US");
        assert_eq!(server.status, "online");
        assert_eq!(server.details["map"], "Altis");
        assert!(!server.private);
        assert_eq!(server.created_at.to_rfc3339(), "2020-05-01T10:30:00+00:00");
        assert!(server.players.is_empty());
    }

    #[test]
    fn test_identical_payloads_compare_equal() {
        let a: Document = serde_json::from_value(fixture()).unwrap();
        let b: Document = serde_json::from_value(fixture()).unwrap();
        assert_eq!(
            Server::from_document(&a).unwrap(),
            Server::from_document(&b).unwrap()
        );
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let mut payload = fixture();
        payload["data"]["attributes"]
            .as_object_mut()
            .unwrap()
            .remove("ip");
        let doc: Document = serde_json::from_value(payload).unwrap();
        let err = Server::from_document(&doc).unwrap_err();
        assert!(matches!(err, crate::error::Error::MalformedResponse(_)));
    }
}
