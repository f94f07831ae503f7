//! Error handling for the export pipeline
//!
//! Fatal failures abort a run before anything is written to the cache.
//! Missing relationship data is not an error: it is reported as a
//! [`DataIntegrityWarning`] and replaced by a sentinel value.

use std::fmt;

use thiserror::Error;

/// Main error type for a catalog export run
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Snapshot already exists: {0}")]
    SnapshotExists(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        ExportError::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// True for errors raised before the cache was consulted.
    pub fn is_pipeline_error(&self) -> bool {
        matches!(
            self,
            ExportError::Transport { .. } | ExportError::Decode(_) | ExportError::Configuration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// What kind of relationship could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Region slot references a water-use term that was not included
    MissingWaterUse { region: usize, target: String },
    /// Plant-type reference whose term was not included
    MissingPlantType { target: String },
    /// Plant-type name with no code in the legend
    UnmappedPlantType { name: String },
    /// Image or thumbnail references a file that was not included
    MissingFile { target: String },
    /// Thumbnail replaced the one of an earlier record with the same botanical name
    DuplicateThumbnail { replaced_record: String },
}

/// Non-fatal data problem found while normalizing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIntegrityWarning {
    pub record_id: String,
    pub botanical_name: String,
    pub issue: IntegrityIssue,
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.botanical_name, self.record_id)?;
        match &self.issue {
            IntegrityIssue::MissingWaterUse { region, target } => {
                write!(f, "region {} water use {} not found", region, target)
            }
            IntegrityIssue::MissingPlantType { target } => {
                write!(f, "plant type {} not found", target)
            }
            IntegrityIssue::UnmappedPlantType { name } => {
                write!(f, "plant type '{}' has no code", name)
            }
            IntegrityIssue::MissingFile { target } => write!(f, "file {} not found", target),
            IntegrityIssue::DuplicateThumbnail { replaced_record } => write!(
                f,
                "thumbnail replaces the one of record {}",
                replaced_record
            ),
        }
    }
}
