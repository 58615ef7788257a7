//! JSON:API Envelope
//!
//! BattleMetrics responses follow the JSON:API convention: a `data` member
//! holding one resource or a list of them, an optional `included` list of
//! side-loaded resources, and pagination `links`. Result objects are built
//! from this envelope, validating shape as they go instead of trusting the
//! payload blindly.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A full response document.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub data: DocumentData,

    /// Side-loaded resources requested via the `include` parameter.
    #[serde(default)]
    pub included: Vec<Resource>,

    /// Pagination links for list endpoints.
    #[serde(default)]
    pub links: Links,
}

/// The `data` member: a single resource or a page of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentData {
    Many(Vec<Resource>),
    One(Resource),
}

impl Document {
    /// The single resource of a detail response.
    pub fn one(&self) -> Result<&Resource> {
        match &self.data {
            DocumentData::One(resource) => Ok(resource),
            DocumentData::Many(_) => Err(Error::MalformedResponse(
                "expected a single resource, got a list".to_string(),
            )),
        }
    }

    /// The resources of a list response. A detail response is treated as a
    /// one-element list.
    pub fn many(&self) -> &[Resource] {
        match &self.data {
            DocumentData::Many(resources) => resources,
            DocumentData::One(resource) => std::slice::from_ref(resource),
        }
    }

    /// Side-loaded resources of the given type.
    pub fn included_of(&self, kind: &str) -> impl Iterator<Item = &Resource> {
        let kind = kind.to_string();
        self.included.iter().filter(move |r| r.kind == kind)
    }
}

/// One JSON:API resource object.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,

    /// Resource identifier. JSON:API ids are strings even when numeric.
    /// Empty for the few resource types served without one, e.g. the
    /// `dataPoint` entries of the history endpoints.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub attributes: serde_json::Value,

    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,

    /// Endpoint-specific metadata, e.g. the per-player `metadata` key/value
    /// list on player listings.
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl Resource {
    /// The resource id parsed as an integer.
    pub fn id_i64(&self) -> Result<i64> {
        self.id.parse().map_err(|_| {
            Error::MalformedResponse(format!(
                "non-numeric id {:?} on {} resource",
                self.id, self.kind
            ))
        })
    }

    /// Deserialize the attributes into a typed struct.
    pub fn attributes_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.attributes.clone()).map_err(|e| {
            Error::MalformedResponse(format!("{} attributes: {}", self.kind, e))
        })
    }

    /// The id of a named to-one relationship, parsed as an integer.
    pub fn related_id(&self, name: &str) -> Result<i64> {
        let related = self
            .relationships
            .get(name)
            .and_then(|rel| rel.data.as_ref())
            .ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "{} resource is missing the {:?} relationship",
                    self.kind, name
                ))
            })?;
        related.id.parse().map_err(|_| {
            Error::MalformedResponse(format!(
                "non-numeric id {:?} in {:?} relationship",
                related.id, name
            ))
        })
    }
}

/// A to-one relationship.
#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<ResourceIdentifier>,
}

/// A bare resource pointer inside a relationship.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// Pagination links.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub prev: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_resource_document() {
        let json = r#"{
            "data": {
                "type": "server",
                "id": "42",
                "attributes": {"name": "Test"},
                "relationships": {}
            }
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        let resource = doc.one().unwrap();
        assert_eq!(resource.kind, "server");
        assert_eq!(resource.id_i64().unwrap(), 42);
        assert_eq!(doc.many().len(), 1);
        assert!(doc.links.next.is_none());
    }

    #[test]
    fn test_list_document_with_links() {
        let json = r#"{
            "data": [
                {"type": "player", "id": "1", "attributes": {}},
                {"type": "player", "id": "2", "attributes": {}}
            ],
            "links": {"next": "https://api.example.com/players?page%5Bsize%5D=2"}
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.many().len(), 2);
        assert!(doc.one().is_err());
        assert!(doc.links.next.is_some());
    }

    #[test]
    fn test_related_id() {
        let json = r#"{
            "type": "session",
            "id": "abc",
            "attributes": {},
            "relationships": {
                "server": {"data": {"type": "server", "id": "99"}}
            }
        }"#;

        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.related_id("server").unwrap(), 99);
        assert!(resource.related_id("player").is_err());
        assert!(resource.id_i64().is_err());
    }

    #[test]
    fn test_included_of_filters_by_type() {
        let json = r#"{
            "data": [],
            "included": [
                {"type": "server", "id": "1", "attributes": {}},
                {"type": "identifier", "id": "2", "attributes": {}}
            ]
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.included_of("server").count(), 1);
        assert_eq!(doc.included_of("identifier").count(), 1);
        assert_eq!(doc.included_of("player").count(), 0);
    }
}
