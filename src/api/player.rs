//! Player Records
//!
//! Typed views of players and their identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::document::Resource;
use crate::error::{Error, Result};

/// The kind of identifier a player record can be matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierType {
    #[serde(rename = "BEGUID")]
    BeGuid,
    #[serde(rename = "legacyBEGUID")]
    BeLegacyGuid,
    #[serde(rename = "conanCharName")]
    ConanCharName,
    #[serde(rename = "egsID")]
    EgsId,
    #[serde(rename = "funcomID")]
    FuncomId,
    #[serde(rename = "ip")]
    Ip,
    #[serde(rename = "mcUUID")]
    McUuid,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "playFabID")]
    PlayFabId,
    #[serde(rename = "steamFamilyShareOwner")]
    SteamFamilyShareOwner,
    #[serde(rename = "steamID")]
    SteamId,
    #[serde(rename = "survivorName")]
    SurvivorName,
}

/// A player identifier, e.g. a Steam id or an in-game name.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The identifier record's id. Not the player identifier itself.
    pub id: i64,

    /// What kind of identifier this is.
    pub kind: IdentifierType,

    /// The identifier value. May be absent for private kinds such as IPs.
    pub name: Option<String>,

    /// When this identifier was last seen.
    pub last_seen: DateTime<Utc>,

    /// The player this identifier belongs to.
    pub player_id: i64,

    /// Whether the identifier should be considered private.
    pub private: bool,

    /// Extra metadata supplied for certain kinds, e.g. IP geolocation.
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifierAttributes {
    #[serde(rename = "type")]
    kind: IdentifierType,
    #[serde(default)]
    identifier: Option<String>,
    last_seen: DateTime<Utc>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl Identifier {
    pub(crate) fn from_resource(resource: &Resource) -> Result<Self> {
        let attrs: IdentifierAttributes = resource.attributes_as()?;
        Ok(Self {
            id: resource.id_i64()?,
            kind: attrs.kind,
            name: attrs.identifier,
            last_seen: attrs.last_seen,
            player_id: resource.related_id("player")?,
            private: attrs.private,
            metadata: attrs.metadata,
        })
    }
}

/// A player tracked by BattleMetrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// The player's id.
    pub id: i64,

    /// The player's name.
    pub name: String,

    /// Whether the profile is private. Private profiles are excluded from
    /// search and player lists.
    pub private: bool,

    /// Set when the record was retrieved from an identifier search and one
    /// of the identifiers matched exactly.
    pub positive_match: bool,

    /// When the player was first created on BattleMetrics.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,

    /// Whether this is the player's first time on the server. Only present
    /// on server-scoped results.
    pub first_time: Option<bool>,

    /// The player's in-game score, when provided.
    pub score: Option<i64>,

    /// Length of the player's current session in seconds, when provided.
    pub playtime: Option<f64>,

    /// Identifiers for this player. Only populated by the player listing
    /// endpoint when identifiers were requested.
    pub identifiers: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerAttributes {
    name: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    positive_match: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    key: String,
    value: serde_json::Value,
}

impl Player {
    pub(crate) fn from_resource(
        resource: &Resource,
        identifiers: Vec<Identifier>,
    ) -> Result<Self> {
        let attrs: PlayerAttributes = resource.attributes_as()?;

        let mut first_time = None;
        let mut score = None;
        let mut playtime = None;
        // Server-scoped metadata rides along as a key/value list under meta.
        if let Some(metadata) = resource.meta.get("metadata") {
            let entries: Vec<MetadataEntry> = serde_json::from_value(metadata.clone())
                .map_err(|e| Error::MalformedResponse(format!("player metadata: {}", e)))?;
            for entry in entries {
                match entry.key.as_str() {
                    "firstTime" => first_time = entry.value.as_bool(),
                    "score" => score = entry.value.as_i64(),
                    "time" => playtime = entry.value.as_f64(),
                    _ => {}
                }
            }
        }

        Ok(Self {
            id: resource.id_i64()?,
            name: attrs.name,
            private: attrs.private,
            positive_match: attrs.positive_match,
            created_at: attrs.created_at,
            updated_at: attrs.updated_at,
            first_time,
            score,
            playtime,
            identifiers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> serde_json::Value {
        serde_json::json!({
            "type": "player",
            "id": "1001",
            "attributes": {
                "name": "survivor",
                "private": false,
                "positiveMatch": false,
                "createdAt": "2019-03-10T00:00:00.000Z",
                "updatedAt": "2021-07-01T12:00:00.000Z"
            },
            "meta": {
                "metadata": [
                    {"key": "firstTime", "value": false},
                    {"key": "score", "value": 250},
                    {"key": "time", "value": 3600.5}
                ]
            }
        })
    }

    #[test]
    fn test_player_round_trip() {
        let resource: Resource = serde_json::from_value(fixture()).unwrap();
        let player = Player::from_resource(&resource, Vec::new()).unwrap();

        assert_eq!(player.id, 1001);
        assert_eq!(player.name, "survivor");
        assert!(!player.private);
        assert_eq!(player.first_time, Some(false));
        assert_eq!(player.score, Some(250));
        assert_eq!(player.playtime, Some(3600.5));
        assert_eq!(player.created_at.to_rfc3339(), "2019-03-10T00:00:00+00:00");
        assert!(player.identifiers.is_empty());
    }

    #[test]
    fn test_player_without_metadata() {
        let mut payload = fixture();
        payload.as_object_mut().unwrap().remove("meta");
        let resource: Resource = serde_json::from_value(payload).unwrap();
        let player = Player::from_resource(&resource, Vec::new()).unwrap();

        assert_eq!(player.first_time, None);
        assert_eq!(player.score, None);
        assert_eq!(player.playtime, None);
    }

    #[test]
    fn test_identifier_from_resource() {
        let json = serde_json::json!({
            "type": "identifier",
            "id": "777",
            "attributes": {
                "type": "steamID",
                "identifier": "76561198000000000",
                "lastSeen": "2021-06-30T09:15:00.000Z",
                "private": false,
                "metadata": null
            },
            "relationships": {
                "player": {"data": {"type": "player", "id": "1001"}}
            }
        });

        let resource: Resource = serde_json::from_value(json).unwrap();
        let identifier = Identifier::from_resource(&resource).unwrap();
        assert_eq!(identifier.id, 777);
        assert_eq!(identifier.kind, IdentifierType::SteamId);
        assert_eq!(identifier.name.as_deref(), Some("76561198000000000"));
        assert_eq!(identifier.player_id, 1001);
    }

    #[test]
    fn test_identifier_type_wire_names() {
        let kind: IdentifierType = serde_json::from_str("\"legacyBEGUID\"").unwrap();
        assert_eq!(kind, IdentifierType::BeLegacyGuid);
        assert_eq!(
            serde_json::to_string(&IdentifierType::SteamId).unwrap(),
            "\"steamID\""
        );
    }
}
