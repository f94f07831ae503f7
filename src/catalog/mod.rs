//! Plant catalog aggregation
//!
//! Resolves the relationships of a fetched collection, normalizes every
//! record into a [`Plant`] and assembles the exported [`Dataset`].

pub mod assemble;
pub mod lookups;
pub mod model;
pub mod normalize;

pub use assemble::{AssembledDataset, DatasetAssembler, DatasetSource};
pub use lookups::{ClassificationLegend, LookupTable, Lookups, PlantTypeLegend};
pub use model::{Dataset, Photo, PhotoReference, Plant, ReferenceData, WaterUseCode};
pub use normalize::{NormalizedRecord, RecordNormalizer};
