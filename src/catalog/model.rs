//! Exported dataset shapes
//!
//! Field names follow the JSON consumed by the public WUCOLS application, so
//! most structs carry camelCase renames.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// Water-use classification of a plant in one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterUseCode {
    #[serde(rename = "VL")]
    VeryLow,
    #[serde(rename = "LO")]
    Low,
    #[serde(rename = "M")]
    Moderate,
    #[serde(rename = "H")]
    High,
    /// Linked term could not be resolved
    #[serde(rename = "U")]
    Unknown,
    /// No term linked for the region
    #[serde(rename = "NA")]
    NotApplicable,
}

impl WaterUseCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterUseCode::VeryLow => "VL",
            WaterUseCode::Low => "LO",
            WaterUseCode::Moderate => "M",
            WaterUseCode::High => "H",
            WaterUseCode::Unknown => "U",
            WaterUseCode::NotApplicable => "NA",
        }
    }
}

impl fmt::Display for WaterUseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoReference {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub small: PhotoReference,
    pub filename: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Position in fetch order; not stable across runs
    pub id: usize,
    pub url_keyword: String,
    #[serde(rename = "botanicalName")]
    pub botanical_name: String,
    pub photos: Vec<Photo>,
    #[serde(rename = "commonName")]
    pub common_name: String,
    pub types: Vec<String>,
    #[serde(rename = "culturalInformation")]
    pub cultural_information: String,
    #[serde(rename = "waterUseByRegion")]
    pub water_use_by_region: Vec<WaterUseCode>,
}

// ---------------------------------------------------------------------------
// Static reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantType {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterUseClassification {
    pub code: WaterUseCode,
    pub name: String,
    #[serde(rename = "plantFactor")]
    pub plant_factor: String,
    #[serde(rename = "percentageET0")]
    pub percentage_et0: String,
}

/// City region id; older gazetteer exports store it as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionRef {
    Id(u32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub region: RegionRef,
    pub name: String,
    pub id: u32,
    pub position: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchCardTemplate {
    pub name: String,
    pub id: String,
    #[serde(rename = "sizeInInches")]
    pub size_in_inches: Point,
}

/// Lookup collections shipped with every dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(rename = "plantTypes", default)]
    pub plant_types: Vec<PlantType>,
    #[serde(rename = "waterUseClassifications", default)]
    pub water_use_classifications: Vec<WaterUseClassification>,
    #[serde(default)]
    pub cities: Vec<City>,
    #[serde(rename = "benchCardTemplates", default)]
    pub bench_card_templates: Vec<BenchCardTemplate>,
}

impl ReferenceData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| ExportError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ExportError::Configuration(format!("invalid reference data: {}", e)))
    }
}

/// The complete exported dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub reference: ReferenceData,
    pub plants: Vec<Plant>,
    /// Thumbnail per botanical name
    pub photos: BTreeMap<String, Photo>,
}

impl Dataset {
    /// Serialized form used both for storage and for change detection
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
