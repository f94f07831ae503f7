//! Strict decode of JSON:API resources into typed records
//!
//! Every primary record and every included resource is validated here. An
//! unexpected resource type or a malformed attribute bag fails the run with
//! [`ExportError::Decode`]; resolution code downstream never sees raw JSON.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::query::fields;
use super::types::{ResourceIdentifier, ResourceObject};
use crate::error::{ExportError, Result};

static REGION_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^field_region_(\d+)_water_use$").expect("region field pattern is valid")
});

/// Reference to a file with the dimensions carried on the relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&ResourceIdentifier> for MediaRef {
    fn from(ident: &ResourceIdentifier) -> Self {
        let meta = ident.meta.clone().unwrap_or_default();
        Self {
            id: ident.id.clone(),
            width: meta.width,
            height: meta.height,
        }
    }
}

/// One plant database item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryRecord {
    pub id: String,
    pub botanical_name: String,
    pub common_name: String,
    pub cultural_information: Option<String>,
    /// Water-use term id by 1-based region number; absent slots are not listed
    pub water_use: BTreeMap<usize, String>,
    pub plant_types: Vec<String>,
    pub images: Vec<MediaRef>,
    pub thumbnail: Option<MediaRef>,
}

/// Side-loaded resources the pipeline understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludedResource {
    WaterUseTerm { id: String, name: String },
    PlantTypeTerm { id: String, name: String },
    File { id: String, path: String },
}

impl IncludedResource {
    pub fn id(&self) -> &str {
        match self {
            IncludedResource::WaterUseTerm { id, .. }
            | IncludedResource::PlantTypeTerm { id, .. }
            | IncludedResource::File { id, .. } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlantAttributes {
    #[serde(rename = "field_botanical_name")]
    botanical_name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "field_cultural_information", default)]
    cultural_information: Option<FormattedText>,
}

#[derive(Debug, Deserialize)]
struct FormattedText {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TermAttributes {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileAttributes {
    uri: FileUri,
}

#[derive(Debug, Deserialize)]
struct FileUri {
    url: String,
}

fn attributes<T: for<'de> Deserialize<'de>>(resource: &ResourceObject) -> Result<T> {
    serde_json::from_value(resource.attributes.clone()).map_err(|e| {
        ExportError::Decode(format!(
            "{} {}: invalid attributes: {}",
            resource.resource_type, resource.id, e
        ))
    })
}

impl TryFrom<&ResourceObject> for PrimaryRecord {
    type Error = ExportError;

    fn try_from(resource: &ResourceObject) -> Result<Self> {
        if resource.resource_type != fields::PLANT_RESOURCE {
            return Err(ExportError::Decode(format!(
                "expected {} but got {} for {}",
                fields::PLANT_RESOURCE,
                resource.resource_type,
                resource.id
            )));
        }

        let attrs: PlantAttributes = attributes(resource)?;
        let mut water_use = BTreeMap::new();
        let mut plant_types = Vec::new();
        let mut images = Vec::new();
        let mut thumbnail = None;

        for (name, rel) in &resource.relationships {
            let targets = rel.identifiers();
            if let Some(caps) = REGION_FIELD_RE.captures(name) {
                let region: usize = caps[1].parse().map_err(|_| {
                    ExportError::Decode(format!("{}: bad region field {}", resource.id, name))
                })?;
                match targets.as_slice() {
                    [] => {}
                    [one] => {
                        water_use.insert(region, one.id.clone());
                    }
                    _ => {
                        return Err(ExportError::Decode(format!(
                            "{}: {} links {} terms, expected at most one",
                            resource.id,
                            name,
                            targets.len()
                        )))
                    }
                }
                continue;
            }

            match name.as_str() {
                fields::PLANT_TYPE => {
                    plant_types = targets.iter().map(|t| t.id.clone()).collect();
                }
                fields::IMAGES => {
                    images = targets.into_iter().map(MediaRef::from).collect();
                }
                fields::THUMBNAIL => {
                    thumbnail = targets.first().map(|t| MediaRef::from(*t));
                }
                _ => {}
            }
        }

        Ok(Self {
            id: resource.id.clone(),
            botanical_name: attrs.botanical_name,
            common_name: attrs.title.unwrap_or_default(),
            cultural_information: attrs.cultural_information.and_then(|t| t.value),
            water_use,
            plant_types,
            images,
            thumbnail,
        })
    }
}

impl TryFrom<&ResourceObject> for IncludedResource {
    type Error = ExportError;

    fn try_from(resource: &ResourceObject) -> Result<Self> {
        let id = resource.id.clone();
        match resource.resource_type.as_str() {
            fields::WATER_USE_RESOURCE => {
                let attrs: TermAttributes = attributes(resource)?;
                Ok(IncludedResource::WaterUseTerm {
                    id,
                    name: attrs.name,
                })
            }
            fields::PLANT_TYPE_RESOURCE => {
                let attrs: TermAttributes = attributes(resource)?;
                Ok(IncludedResource::PlantTypeTerm {
                    id,
                    name: attrs.name,
                })
            }
            fields::FILE_RESOURCE => {
                let attrs: FileAttributes = attributes(resource)?;
                Ok(IncludedResource::File {
                    id,
                    path: attrs.uri.url,
                })
            }
            other => Err(ExportError::Decode(format!(
                "unsupported included resource type {} ({})",
                other, id
            ))),
        }
    }
}
