//! JSON:API fixtures shared by the integration suites

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use wucols_export::catalog::{DatasetAssembler, ReferenceData};
use wucols_export::jsonapi::ScriptedPageSource;
use wucols_export::ExportConfig;

pub const ORIGIN: &str = "https://plants.test";

pub fn config() -> ExportConfig {
    ExportConfig {
        origin: ORIGIN.to_string(),
        region_count: 6,
        ..ExportConfig::default()
    }
}

pub fn reference() -> ReferenceData {
    ReferenceData::from_json(include_str!("../../config/data-lookups.json"))
        .expect("bundled reference data parses")
}

pub fn assembler(source: Arc<ScriptedPageSource>) -> DatasetAssembler {
    DatasetAssembler::new(source, &config(), reference()).expect("assembler builds")
}

/// URL the assembler requests first
pub fn first_page_url() -> String {
    assembler(Arc::new(ScriptedPageSource::new()))
        .start_url()
        .to_string()
}

pub fn page_url(n: usize) -> String {
    format!(
        "{}/jsonapi/node/plant_database_item?page%5Boffset%5D={}",
        ORIGIN,
        n * 50
    )
}

pub struct PlantFixture {
    pub id: String,
    pub botanical_name: String,
    pub common_name: String,
    pub regions: Vec<(usize, Option<String>)>,
    pub types: Vec<String>,
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
}

impl PlantFixture {
    pub fn new(id: &str, botanical_name: &str) -> Self {
        Self {
            id: id.to_string(),
            botanical_name: botanical_name.to_string(),
            common_name: format!("common {}", botanical_name),
            regions: Vec::new(),
            types: Vec::new(),
            images: Vec::new(),
            thumbnail: None,
        }
    }

    pub fn region(mut self, k: usize, term: &str) -> Self {
        self.regions.push((k, Some(term.to_string())));
        self
    }

    /// Region relationship present but with `data: null`
    pub fn null_region(mut self, k: usize) -> Self {
        self.regions.push((k, None));
        self
    }

    pub fn plant_type(mut self, term: &str) -> Self {
        self.types.push(term.to_string());
        self
    }

    pub fn image(mut self, file: &str) -> Self {
        self.images.push(file.to_string());
        self
    }

    pub fn thumbnail(mut self, file: &str) -> Self {
        self.thumbnail = Some(file.to_string());
        self
    }

    pub fn common_name(mut self, name: &str) -> Self {
        self.common_name = name.to_string();
        self
    }

    pub fn to_json(&self) -> Value {
        let mut relationships = serde_json::Map::new();
        for (k, term) in &self.regions {
            let data = match term {
                Some(id) => json!({ "id": id, "type": "taxonomy_term--water_use" }),
                None => Value::Null,
            };
            relationships.insert(
                format!("field_region_{}_water_use", k),
                json!({ "data": data }),
            );
        }
        relationships.insert(
            "field_plant_type".into(),
            json!({ "data": self.types.iter().map(|id| json!({
                "id": id, "type": "taxonomy_term--plant_type"
            })).collect::<Vec<_>>() }),
        );
        relationships.insert(
            "field_image_s_".into(),
            json!({ "data": self.images.iter().map(|id| json!({
                "id": id, "type": "file--file", "meta": { "width": 640, "height": 480 }
            })).collect::<Vec<_>>() }),
        );
        relationships.insert(
            "field_thumbnail".into(),
            json!({ "data": self.thumbnail.as_ref().map(|id| json!({
                "id": id, "type": "file--file", "meta": { "width": 120, "height": 90 }
            })) }),
        );

        json!({
            "id": self.id,
            "type": "node--plant_database_item",
            "attributes": {
                "title": self.common_name,
                "field_botanical_name": self.botanical_name,
                "field_cultural_information": { "value": format!("Notes on {}", self.botanical_name) }
            },
            "relationships": relationships
        })
    }
}

pub fn water_use(id: &str, name: &str) -> Value {
    json!({ "id": id, "type": "taxonomy_term--water_use", "attributes": { "name": name } })
}

pub fn plant_type(id: &str, name: &str) -> Value {
    json!({ "id": id, "type": "taxonomy_term--plant_type", "attributes": { "name": name } })
}

pub fn file(id: &str, path: &str) -> Value {
    json!({
        "id": id,
        "type": "file--file",
        "attributes": { "uri": { "value": format!("public:/{}", path), "url": path } }
    })
}

pub fn page(plants: &[PlantFixture], included: Vec<Value>, next: Option<&str>) -> Value {
    let mut doc = json!({
        "data": plants.iter().map(PlantFixture::to_json).collect::<Vec<_>>(),
        "included": included,
        "links": { "self": { "href": "ignored" } }
    });
    if let Some(next) = next {
        doc["links"]["next"] = json!({ "href": next });
    }
    doc
}

/// Standard terms used by most scenarios
pub fn terms() -> Vec<Value> {
    vec![
        water_use("w-vl", "Very Low"),
        water_use("w-lo", "Low"),
        water_use("w-m", "Moderate"),
        water_use("w-h", "High"),
        water_use("w-na", "Not Appropriate for this Region"),
        plant_type("t-tree", "Tree"),
        plant_type("t-shrub", "Shrub"),
        plant_type("t-native", "California Native"),
    ]
}

/// Two pages, three plants; the second page repeats one term
pub fn two_page_catalog() -> ScriptedPageSource {
    let first = page(
        &[
            PlantFixture::new("p1", "Quercus agrifolia")
                .region(1, "w-lo")
                .region(2, "w-lo")
                .region(3, "w-vl")
                .plant_type("t-tree")
                .plant_type("t-native")
                .image("f1")
                .image("f2")
                .thumbnail("f0"),
            PlantFixture::new("p2", "Salvia leucophylla")
                .region(1, "w-lo")
                .plant_type("t-shrub"),
        ],
        {
            let mut included = terms();
            included.extend([
                file("f0", "/sites/files/oak-thumb.jpg"),
                file("f1", "/sites/files/oak-1.jpg"),
                file("f2", "/sites/files/oak-2.png"),
            ]);
            included
        },
        Some(&page_url(1)),
    );
    let second = page(
        &[PlantFixture::new("p3", "Acer macrophyllum")
            .region(1, "w-m")
            .region(6, "w-na")
            .plant_type("t-tree")],
        vec![water_use("w-m", "Moderate"), plant_type("t-tree", "Tree")],
        None,
    );

    ScriptedPageSource::new()
        .with_page(first_page_url(), first)
        .with_page(page_url(1), second)
}
