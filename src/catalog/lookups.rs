//! Relationship resolution
//!
//! Turns the included resources of a fetch into read-only lookup tables keyed
//! by remote id, and holds the two legends that map display names to codes.

use std::collections::HashMap;

use super::model::{PlantType, WaterUseClassification, WaterUseCode};
use crate::error::{ExportError, Result};
use crate::jsonapi::{IncludedResource, IncludedSet};

/// Remote id → resolved value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for LookupTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> LookupTable<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, id: &str, value: T) {
        self.entries.insert(id.to_string(), value);
    }
}

impl<T> FromIterator<(String, T)> for LookupTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Legends
// ---------------------------------------------------------------------------

/// Water-use display name → code, matched case-insensitively
#[derive(Debug, Clone)]
pub struct ClassificationLegend {
    by_name: HashMap<String, WaterUseCode>,
}

impl Default for ClassificationLegend {
    fn default() -> Self {
        let by_name = [
            ("very low", WaterUseCode::VeryLow),
            ("low", WaterUseCode::Low),
            ("moderate", WaterUseCode::Moderate),
            ("high", WaterUseCode::High),
            ("unknown", WaterUseCode::Unknown),
            ("not appropriate for this region", WaterUseCode::NotApplicable),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code))
        .collect();
        Self { by_name }
    }
}

impl ClassificationLegend {
    /// Built-in names extended by the names of the published classifications
    pub fn with_classifications(classifications: &[WaterUseClassification]) -> Self {
        let mut legend = Self::default();
        for c in classifications {
            legend.by_name.insert(c.name.trim().to_lowercase(), c.code);
        }
        legend
    }

    pub fn code_for(&self, name: &str) -> Option<WaterUseCode> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }
}

/// Plant-type name → code, with the code used for unknown names
#[derive(Debug, Clone)]
pub struct PlantTypeLegend {
    code_by_name: HashMap<String, String>,
    default_code: String,
}

impl PlantTypeLegend {
    pub fn new(plant_types: &[PlantType], default_code: impl Into<String>) -> Self {
        Self {
            code_by_name: plant_types
                .iter()
                .map(|t| (t.name.clone(), t.code.clone()))
                .collect(),
            default_code: default_code.into(),
        }
    }

    pub fn code_for(&self, name: &str) -> Option<&str> {
        self.code_by_name.get(name).map(String::as_str)
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Per-run lookup tables, one per related resource type
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub water_use: LookupTable<WaterUseCode>,
    pub plant_type_names: LookupTable<String>,
    pub file_urls: LookupTable<String>,
}

impl Lookups {
    /// Resolve every included resource.
    ///
    /// # Errors
    /// [`ExportError::Configuration`] when a water-use term's name is not in
    /// the legend.
    pub fn resolve(
        included: &IncludedSet,
        legend: &ClassificationLegend,
        origin: &str,
    ) -> Result<Self> {
        let origin = origin.trim_end_matches('/');
        let mut lookups = Lookups::default();

        for resource in included.iter() {
            match resource {
                IncludedResource::WaterUseTerm { id, name } => {
                    let code = legend.code_for(name).ok_or_else(|| {
                        ExportError::Configuration(format!(
                            "water use '{}' (term {}) is not in the classification legend",
                            name, id
                        ))
                    })?;
                    lookups.water_use.insert(id, code);
                }
                IncludedResource::PlantTypeTerm { id, name } => {
                    lookups.plant_type_names.insert(id, name.clone());
                }
                IncludedResource::File { id, path } => {
                    lookups.file_urls.insert(id, file_url(origin, path));
                }
            }
        }

        Ok(lookups)
    }
}

fn file_url(origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", origin, path)
    } else {
        format!("{}/{}", origin, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn included() -> IncludedSet {
        [
            IncludedResource::WaterUseTerm {
                id: "w1".into(),
                name: "Very Low".into(),
            },
            IncludedResource::WaterUseTerm {
                id: "w2".into(),
                name: "Not Appropriate for this Region".into(),
            },
            IncludedResource::PlantTypeTerm {
                id: "t1".into(),
                name: "Tree".into(),
            },
            IncludedResource::File {
                id: "f1".into(),
                path: "/sites/default/files/oak.jpg".into(),
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn resolves_each_resource_type() {
        let lookups = Lookups::resolve(
            &included(),
            &ClassificationLegend::default(),
            "https://plants.example.org/",
        )
        .unwrap();

        assert_eq!(lookups.water_use.get("w1"), Some(&WaterUseCode::VeryLow));
        assert_eq!(lookups.water_use.get("w2"), Some(&WaterUseCode::NotApplicable));
        assert_eq!(lookups.plant_type_names.get("t1").map(String::as_str), Some("Tree"));
        assert_eq!(
            lookups.file_urls.get("f1").map(String::as_str),
            Some("https://plants.example.org/sites/default/files/oak.jpg")
        );
    }

    #[test]
    fn unknown_water_use_name_is_fatal() {
        let included: IncludedSet = [IncludedResource::WaterUseTerm {
            id: "w9".into(),
            name: "Extreme".into(),
        }]
        .into_iter()
        .collect();

        let err = Lookups::resolve(&included, &ClassificationLegend::default(), "https://x")
            .unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
        assert!(err.to_string().contains("Extreme"));
    }

    #[test]
    fn legend_extended_by_classifications() {
        let legend = ClassificationLegend::with_classifications(&[WaterUseClassification {
            code: WaterUseCode::NotApplicable,
            name: "Not Appropriate".into(),
            plant_factor: "/".into(),
            percentage_et0: "/".into(),
        }]);
        assert_eq!(legend.code_for("not appropriate"), Some(WaterUseCode::NotApplicable));
        assert_eq!(legend.code_for("  HIGH "), Some(WaterUseCode::High));
    }

    #[test]
    fn resolution_is_deterministic() {
        let legend = ClassificationLegend::default();
        let a = Lookups::resolve(&included(), &legend, "https://x").unwrap();
        let b = Lookups::resolve(&included(), &legend, "https://x").unwrap();
        assert_eq!(a.water_use, b.water_use);
        assert_eq!(a.plant_type_names, b.plant_type_names);
        assert_eq!(a.file_urls, b.file_urls);
    }
}
