//! Collection query for the plant database
//!
//! Builds the sparse-fieldset + include URL for the first page. Later pages
//! come from the server's `links.next`.

use url::Url;

use crate::error::{ExportError, Result};

/// Drupal resource and field names
pub mod fields {
    pub const PLANT_RESOURCE: &str = "node--plant_database_item";
    pub const PLANT_COLLECTION_PATH: &str = "/jsonapi/node/plant_database_item";
    pub const WATER_USE_RESOURCE: &str = "taxonomy_term--water_use";
    pub const PLANT_TYPE_RESOURCE: &str = "taxonomy_term--plant_type";
    pub const FILE_RESOURCE: &str = "file--file";

    pub const TITLE: &str = "title";
    pub const BOTANICAL_NAME: &str = "field_botanical_name";
    pub const CULTURAL_INFORMATION: &str = "field_cultural_information";
    pub const PLANT_TYPE: &str = "field_plant_type";
    pub const THUMBNAIL: &str = "field_thumbnail";
    pub const IMAGES: &str = "field_image_s_";

    /// Relationship field holding the water use for 1-based region `k`
    pub fn region_water_use(k: usize) -> String {
        format!("field_region_{}_water_use", k)
    }
}

#[derive(Debug, Clone)]
pub struct PlantQuery {
    origin: String,
    region_count: usize,
}

impl PlantQuery {
    pub fn new(origin: impl Into<String>, region_count: usize) -> Self {
        Self {
            origin: origin.into(),
            region_count,
        }
    }

    fn region_fields(&self) -> Vec<String> {
        (1..=self.region_count).map(fields::region_water_use).collect()
    }

    /// URL of the first page
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.origin)
            .and_then(|base| base.join(fields::PLANT_COLLECTION_PATH))
            .map_err(|e| ExportError::Configuration(format!("origin '{}': {}", self.origin, e)))?;

        let regions = self.region_fields();

        let mut plant_fields = vec![
            fields::BOTANICAL_NAME.to_string(),
            fields::TITLE.to_string(),
            fields::PLANT_TYPE.to_string(),
            fields::THUMBNAIL.to_string(),
            fields::IMAGES.to_string(),
            fields::CULTURAL_INFORMATION.to_string(),
        ];
        plant_fields.extend(regions.iter().cloned());

        let mut includes = regions;
        includes.extend([
            fields::PLANT_TYPE.to_string(),
            fields::THUMBNAIL.to_string(),
            fields::IMAGES.to_string(),
        ]);

        url.query_pairs_mut()
            .append_pair(
                &format!("fields[{}]", fields::PLANT_RESOURCE),
                &plant_fields.join(","),
            )
            .append_pair("include", &includes.join(","))
            .append_pair(&format!("fields[{}]", fields::WATER_USE_RESOURCE), "name")
            .append_pair(&format!("fields[{}]", fields::PLANT_TYPE_RESOURCE), "name")
            .append_pair(&format!("fields[{}]", fields::FILE_RESOURCE), "uri");

        Ok(url)
    }
}
