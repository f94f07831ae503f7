//! Export configuration
//!
//! Loaded from an optional YAML file and then overridden by `WUCOLS_*`
//! environment variables. Every field has a default so an empty file (or no
//! file at all) yields a usable configuration for the public catalog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExportError, Result};

pub const DEFAULT_ORIGIN: &str = "https://wucolsplants.sf.ucdavis.edu";
pub const DEFAULT_DATASET_NAME: &str = "wucols";
pub const DEFAULT_REGION_COUNT: usize = 6;

/// Root configuration for an export run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Origin of the catalog backend; also prefixes relative file paths
    pub origin: String,
    /// Dataset name used in snapshot and pointer object names
    pub dataset_name: String,
    /// Number of water-use regions every plant carries a code for
    pub region_count: usize,
    /// Root directory of the filesystem object store
    pub store_dir: PathBuf,
    /// Public URL under which the store's objects are served
    pub public_base_url: String,
    /// JSON file with regions, plant types, classifications, cities and templates
    pub reference_data: PathBuf,
    /// Plant-type code used when a plant type cannot be resolved
    pub default_plant_type: String,
    pub http: HttpConfig,
}

/// Page fetch transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Extra attempts after a failed page fetch (0 = fail on first error)
    pub max_retries: usize,
    /// Delay between attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,
    /// Per-request timeout; unset means wait indefinitely
    pub request_timeout_secs: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            region_count: DEFAULT_REGION_COUNT,
            store_dir: PathBuf::from("cache"),
            public_base_url: "file://cache".to_string(),
            reference_data: PathBuf::from("config/data-lookups.json"),
            default_plant_type: "U".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 1000,
            request_timeout_secs: None,
        }
    }
}

impl HttpConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl ExportConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| ExportError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ExportConfig = serde_yaml::from_str(content)
            .map_err(|e| ExportError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WUCOLS_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WUCOLS_ORIGIN") {
            self.origin = v;
        }
        if let Some(v) = lookup("WUCOLS_DATASET_NAME") {
            self.dataset_name = v;
        }
        if let Some(v) = lookup("WUCOLS_REGION_COUNT") {
            self.region_count = parse_var("WUCOLS_REGION_COUNT", &v)?;
        }
        if let Some(v) = lookup("WUCOLS_STORE_DIR") {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("WUCOLS_PUBLIC_BASE_URL") {
            self.public_base_url = v;
        }
        if let Some(v) = lookup("WUCOLS_REFERENCE_DATA") {
            self.reference_data = PathBuf::from(v);
        }
        if let Some(v) = lookup("WUCOLS_DEFAULT_PLANT_TYPE") {
            self.default_plant_type = v;
        }
        if let Some(v) = lookup("WUCOLS_MAX_RETRIES") {
            self.http.max_retries = parse_var("WUCOLS_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("WUCOLS_RETRY_DELAY_MS") {
            self.http.retry_delay_ms = parse_var("WUCOLS_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("WUCOLS_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = Some(parse_var("WUCOLS_REQUEST_TIMEOUT_SECS", &v)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.region_count == 0 {
            return Err(ExportError::Configuration(
                "region_count must be at least 1".into(),
            ));
        }
        if self.dataset_name.is_empty() || self.dataset_name.contains('/') {
            return Err(ExportError::Configuration(format!(
                "invalid dataset name '{}'",
                self.dataset_name
            )));
        }
        url::Url::parse(&self.origin)
            .map_err(|e| ExportError::Configuration(format!("origin '{}': {}", self.origin, e)))?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ExportError::Configuration(format!("{}={}: {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = ExportConfig::from_yaml("{}").unwrap();
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert_eq!(config.region_count, 6);
        assert_eq!(config.http.max_retries, 0);
        assert!(config.http.request_timeout().is_none());
    }

    #[test]
    fn yaml_overrides_nested_fields() {
        let config = ExportConfig::from_yaml(
            r#"
dataset_name: plants
region_count: 4
http:
  max_retries: 2
  request_timeout_secs: 30
"#,
        )
        .unwrap();
        assert_eq!(config.dataset_name, "plants");
        assert_eq!(config.region_count, 4);
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.http.retry_delay_ms, 1000);
        assert_eq!(config.http.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("WUCOLS_DATASET_NAME", "staging"),
            ("WUCOLS_MAX_RETRIES", "3"),
            ("WUCOLS_REQUEST_TIMEOUT_SECS", "10"),
        ]
        .into_iter()
        .collect();

        let mut config = ExportConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.dataset_name, "staging");
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.request_timeout_secs, Some(10));
    }

    #[test]
    fn bad_numeric_override_is_configuration_error() {
        let mut config = ExportConfig::default();
        let err = config
            .apply_overrides(|k| (k == "WUCOLS_REGION_COUNT").then(|| "six".to_string()))
            .unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
    }

    #[test]
    fn zero_regions_rejected() {
        let err = ExportConfig::from_yaml("region_count: 0").unwrap_err();
        assert!(err.to_string().contains("region_count"));
    }
}
