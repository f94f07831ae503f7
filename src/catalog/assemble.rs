//! Dataset assembly
//!
//! Fetches the collection, resolves relationships, normalizes every record in
//! fetch order and merges the static reference data. The legends are built
//! here from the injected reference data and passed down explicitly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::lookups::{ClassificationLegend, Lookups, PlantTypeLegend};
use super::model::{Dataset, ReferenceData};
use super::normalize::RecordNormalizer;
use crate::config::ExportConfig;
use crate::error::{DataIntegrityWarning, IntegrityIssue, Result};
use crate::jsonapi::{FetchedCollection, PageSource, PlantQuery, ResourceFetcher};

/// A freshly built dataset and what was found while building it
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    pub dataset: Dataset,
    pub warnings: Vec<DataIntegrityWarning>,
    pub pages: usize,
}

/// Anything that can produce a complete dataset for one run
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn assemble(&self) -> Result<AssembledDataset>;
}

pub struct DatasetAssembler {
    fetcher: ResourceFetcher,
    start_url: String,
    origin: String,
    region_count: usize,
    reference: ReferenceData,
    classification_legend: ClassificationLegend,
    plant_type_legend: PlantTypeLegend,
}

impl DatasetAssembler {
    pub fn new(
        source: Arc<dyn PageSource>,
        config: &ExportConfig,
        reference: ReferenceData,
    ) -> Result<Self> {
        let start_url = PlantQuery::new(&config.origin, config.region_count)
            .url()?
            .to_string();
        let classification_legend =
            ClassificationLegend::with_classifications(&reference.water_use_classifications);
        let plant_type_legend =
            PlantTypeLegend::new(&reference.plant_types, config.default_plant_type.clone());

        Ok(Self {
            fetcher: ResourceFetcher::new(source),
            start_url,
            origin: config.origin.clone(),
            region_count: config.region_count,
            reference,
            classification_legend,
            plant_type_legend,
        })
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Build the dataset from an already fetched collection
    pub fn build(&self, collection: &FetchedCollection) -> Result<AssembledDataset> {
        let lookups = Lookups::resolve(
            &collection.included,
            &self.classification_legend,
            &self.origin,
        )?;
        let normalizer =
            RecordNormalizer::new(&lookups, &self.plant_type_legend, self.region_count);

        let mut plants = Vec::with_capacity(collection.records.len());
        let mut photos = BTreeMap::new();
        let mut thumbnail_owner: HashMap<String, &str> = HashMap::new();
        let mut warnings = Vec::new();

        for (id, record) in collection.records.iter().enumerate() {
            let normalized = normalizer.normalize(id, record);
            if let Some(thumbnail) = normalized.thumbnail {
                let name = &normalized.plant.botanical_name;
                photos.insert(name.clone(), thumbnail);
                if let Some(replaced) = thumbnail_owner.insert(name.clone(), &record.id) {
                    let warning = DataIntegrityWarning {
                        record_id: record.id.clone(),
                        botanical_name: name.clone(),
                        issue: IntegrityIssue::DuplicateThumbnail {
                            replaced_record: replaced.to_string(),
                        },
                    };
                    warn!(%warning, "Duplicate botanical name");
                    warnings.push(warning);
                }
            }
            warnings.extend(normalized.warnings);
            plants.push(normalized.plant);
        }

        info!(
            plants = plants.len(),
            thumbnails = photos.len(),
            warnings = warnings.len(),
            "Dataset assembled"
        );

        Ok(AssembledDataset {
            dataset: Dataset {
                reference: self.reference.clone(),
                plants,
                photos,
            },
            warnings,
            pages: collection.pages,
        })
    }
}

#[async_trait]
impl DatasetSource for DatasetAssembler {
    async fn assemble(&self) -> Result<AssembledDataset> {
        let collection = self.fetcher.fetch_all(&self.start_url).await?;
        self.build(&collection)
    }
}
