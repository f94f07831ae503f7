//! JSON:API response types
//!
//! Wire-level shapes only. Nothing outside `jsonapi` reads these; records and
//! included resources are converted into typed values by [`super::decode`]
//! before any lookup is built.

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level document returned for one page of a collection
#[derive(Debug, Clone, Deserialize)]
pub struct JsonApiDocument {
    pub data: Vec<ResourceObject>,
    #[serde(default)]
    pub included: Option<Vec<ResourceObject>>,
    #[serde(default)]
    pub links: Option<DocumentLinks>,
}

impl JsonApiDocument {
    /// URL of the following page, if any
    pub fn next_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_ref())
            .map(Link::href)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentLinks {
    #[serde(default)]
    pub next: Option<Link>,
}

/// A link is either a bare URL or a link object (Drupal emits the latter)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Href(String),
    Object { href: String },
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Href(href) | Link::Object { href } => href,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceObject {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(ResourceIdentifier),
}

impl Relationship {
    /// All linked identifiers, in order; empty for a null relationship
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match &self.data {
            None => Vec::new(),
            Some(RelationshipData::ToOne(one)) => vec![one],
            Some(RelationshipData::ToMany(many)) => many.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub meta: Option<IdentifierMeta>,
}

/// Image dimensions Drupal attaches to file references
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifierMeta {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}
