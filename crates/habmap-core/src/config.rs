use crate::error::{HabmapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The only display projection served to clients (WGS 84 geographic degrees)
pub const CANONICAL_EPSG: u32 = 4326;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Server-side cache sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of normalized layer tables held in memory
    pub max_entries: usize,
    /// Number of least-recently-used tables dropped once the ceiling is hit
    pub evict_batch: usize,
    /// Maximum number of serialized documents held in memory
    pub document_max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_entries: 50, evict_batch: 10, document_max_entries: 50 }
    }
}

/// Client-side zoom switching parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSettings {
    /// Zoom level at and above which the full-resolution tier is displayed
    pub threshold: f64,
    /// Tolerance (degrees) requested for the simplified tier
    pub simplify_tolerance: f64,
    /// Quiet period collapsing bursts of zoom events
    pub debounce: Duration,
    /// How long a programmatic zoom suppresses automatic switching
    pub settle: Duration,
    /// Maximum number of documents kept by the client
    pub cache_max_entries: usize,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            threshold: 12.0,
            simplify_tolerance: 0.001,
            debounce: Duration::from_millis(300),
            settle: Duration::from_millis(1000),
            cache_max_entries: 10,
        }
    }
}

/// Layered configuration for habmap
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub data_dir: ConfigValue<PathBuf>,
    pub canonical_crs: ConfigValue<u32>,
    pub vector_enabled: ConfigValue<bool>,
    pub zoom_threshold: ConfigValue<f64>,
    pub simplify_tolerance: ConfigValue<f64>,
    pub cache_max_entries: ConfigValue<usize>,
    pub cache_evict_batch: ConfigValue<usize>,
    pub document_cache_max_entries: ConfigValue<usize>,
    pub client_cache_max_entries: ConfigValue<usize>,
    pub debounce_ms: ConfigValue<u64>,
    pub zoom_settle_ms: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let cache = CacheSettings::default();
        let zoom = ZoomSettings::default();
        Self {
            data_dir: ConfigValue::new(PathBuf::from("data/vector"), ConfigSource::Default),
            canonical_crs: ConfigValue::new(CANONICAL_EPSG, ConfigSource::Default),
            vector_enabled: ConfigValue::new(true, ConfigSource::Default),
            zoom_threshold: ConfigValue::new(zoom.threshold, ConfigSource::Default),
            simplify_tolerance: ConfigValue::new(zoom.simplify_tolerance, ConfigSource::Default),
            cache_max_entries: ConfigValue::new(cache.max_entries, ConfigSource::Default),
            cache_evict_batch: ConfigValue::new(cache.evict_batch, ConfigSource::Default),
            document_cache_max_entries: ConfigValue::new(
                cache.document_max_entries,
                ConfigSource::Default,
            ),
            client_cache_max_entries: ConfigValue::new(
                zoom.cache_max_entries,
                ConfigSource::Default,
            ),
            debounce_ms: ConfigValue::new(
                zoom.debounce.as_millis() as u64,
                ConfigSource::Default,
            ),
            zoom_settle_ms: ConfigValue::new(zoom.settle.as_millis() as u64, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| HabmapError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| HabmapError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(data_dir) = file_config.data_dir {
            self.data_dir.update(data_dir, ConfigSource::File);
        }
        if let Some(crs) = file_config.canonical_crs {
            self.canonical_crs.update(crs, ConfigSource::File);
        }
        if let Some(enabled) = file_config.vector_enabled {
            self.vector_enabled.update(enabled, ConfigSource::File);
        }
        if let Some(threshold) = file_config.zoom_threshold {
            self.zoom_threshold.update(threshold, ConfigSource::File);
        }
        if let Some(tolerance) = file_config.simplify_tolerance {
            self.simplify_tolerance.update(tolerance, ConfigSource::File);
        }
        if let Some(max) = file_config.cache_max_entries {
            self.cache_max_entries.update(max, ConfigSource::File);
        }
        if let Some(batch) = file_config.cache_evict_batch {
            self.cache_evict_batch.update(batch, ConfigSource::File);
        }
        if let Some(max) = file_config.document_cache_max_entries {
            self.document_cache_max_entries.update(max, ConfigSource::File);
        }
        if let Some(max) = file_config.client_cache_max_entries {
            self.client_cache_max_entries.update(max, ConfigSource::File);
        }
        if let Some(ms) = file_config.debounce_ms {
            self.debounce_ms.update(ms, ConfigSource::File);
        }
        if let Some(ms) = file_config.zoom_settle_ms {
            self.zoom_settle_ms.update(ms, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // HABMAP_DATA_DIR
        if let Ok(dir) = env::var("HABMAP_DATA_DIR") {
            self.data_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        if let Some(crs) = env_parsed::<u32>("HABMAP_CANONICAL_CRS", "integer EPSG code") {
            self.canonical_crs.update(crs, ConfigSource::Environment);
        }

        // HABMAP_VECTOR_ENABLED
        if let Ok(flag) = env::var("HABMAP_VECTOR_ENABLED") {
            match parse_bool(&flag) {
                Ok(enabled) => self.vector_enabled.update(enabled, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid HABMAP_VECTOR_ENABLED value '{}': expected true or false",
                    flag
                ),
            }
        }

        if let Some(threshold) = env_parsed::<f64>("HABMAP_ZOOM_THRESHOLD", "zoom level") {
            self.zoom_threshold.update(threshold, ConfigSource::Environment);
        }
        if let Some(tolerance) =
            env_parsed::<f64>("HABMAP_SIMPLIFY_TOLERANCE", "tolerance in degrees")
        {
            self.simplify_tolerance.update(tolerance, ConfigSource::Environment);
        }
        if let Some(max) = env_parsed::<usize>("HABMAP_CACHE_MAX_ENTRIES", "entry count") {
            self.cache_max_entries.update(max, ConfigSource::Environment);
        }
        if let Some(batch) = env_parsed::<usize>("HABMAP_CACHE_EVICT_BATCH", "entry count") {
            self.cache_evict_batch.update(batch, ConfigSource::Environment);
        }
        if let Some(max) = env_parsed::<usize>("HABMAP_DOCUMENT_CACHE_MAX_ENTRIES", "entry count")
        {
            self.document_cache_max_entries.update(max, ConfigSource::Environment);
        }
        if let Some(max) = env_parsed::<usize>("HABMAP_CLIENT_CACHE_MAX_ENTRIES", "entry count") {
            self.client_cache_max_entries.update(max, ConfigSource::Environment);
        }
        if let Some(ms) = env_parsed::<u64>("HABMAP_DEBOUNCE_MS", "milliseconds") {
            self.debounce_ms.update(ms, ConfigSource::Environment);
        }
        if let Some(ms) = env_parsed::<u64>("HABMAP_ZOOM_SETTLE_MS", "milliseconds") {
            self.zoom_settle_ms.update(ms, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir.update(data_dir, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.zoom_threshold {
            self.zoom_threshold.update(threshold, ConfigSource::Cli);
        }

        if let Some(tolerance) = overrides.simplify_tolerance {
            self.simplify_tolerance.update(tolerance, ConfigSource::Cli);
        }

        if let Some(max) = overrides.cache_max_entries {
            self.cache_max_entries.update(max, ConfigSource::Cli);
        }
    }

    /// Reject values the caches and the switcher cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.canonical_crs.value != CANONICAL_EPSG {
            return Err(HabmapError::ConfigInvalid {
                key: "canonical_crs".to_string(),
                reason: format!(
                    "EPSG:{} requested, but the display projection is fixed to EPSG:{}",
                    self.canonical_crs.value, CANONICAL_EPSG
                ),
            });
        }

        for (key, value) in [
            ("cache_max_entries", self.cache_max_entries.value),
            ("cache_evict_batch", self.cache_evict_batch.value),
            ("document_cache_max_entries", self.document_cache_max_entries.value),
            ("client_cache_max_entries", self.client_cache_max_entries.value),
        ] {
            if value == 0 {
                return Err(HabmapError::ConfigInvalid {
                    key: key.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        let tolerance = self.simplify_tolerance.value;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(HabmapError::ConfigInvalid {
                key: "simplify_tolerance".to_string(),
                reason: format!("{} is not a positive distance", tolerance),
            });
        }

        if !self.zoom_threshold.value.is_finite() {
            return Err(HabmapError::ConfigInvalid {
                key: "zoom_threshold".to_string(),
                reason: "must be a finite zoom level".to_string(),
            });
        }

        Ok(())
    }

    /// Cache sizing for the server-side caches
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_entries: self.cache_max_entries.value,
            evict_batch: self.cache_evict_batch.value,
            document_max_entries: self.document_cache_max_entries.value,
        }
    }

    /// Zoom switching parameters for the client
    pub fn zoom_settings(&self) -> ZoomSettings {
        ZoomSettings {
            threshold: self.zoom_threshold.value,
            simplify_tolerance: self.simplify_tolerance.value,
            debounce: Duration::from_millis(self.debounce_ms.value),
            settle: Duration::from_millis(self.zoom_settle_ms.value),
            cache_max_entries: self.client_cache_max_entries.value,
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "data_dir".to_string(),
            (self.data_dir.value.display().to_string(), self.data_dir.source),
        );
        map.insert(
            "canonical_crs".to_string(),
            (format!("EPSG:{}", self.canonical_crs.value), self.canonical_crs.source),
        );
        map.insert(
            "vector_enabled".to_string(),
            (self.vector_enabled.value.to_string(), self.vector_enabled.source),
        );
        map.insert(
            "zoom_threshold".to_string(),
            (self.zoom_threshold.value.to_string(), self.zoom_threshold.source),
        );
        map.insert(
            "simplify_tolerance".to_string(),
            (self.simplify_tolerance.value.to_string(), self.simplify_tolerance.source),
        );
        map.insert(
            "cache_max_entries".to_string(),
            (self.cache_max_entries.value.to_string(), self.cache_max_entries.source),
        );
        map.insert(
            "cache_evict_batch".to_string(),
            (self.cache_evict_batch.value.to_string(), self.cache_evict_batch.source),
        );
        map.insert(
            "document_cache_max_entries".to_string(),
            (
                self.document_cache_max_entries.value.to_string(),
                self.document_cache_max_entries.source,
            ),
        );
        map.insert(
            "client_cache_max_entries".to_string(),
            (
                self.client_cache_max_entries.value.to_string(),
                self.client_cache_max_entries.source,
            ),
        );
        map.insert(
            "debounce_ms".to_string(),
            (self.debounce_ms.value.to_string(), self.debounce_ms.source),
        );
        map.insert(
            "zoom_settle_ms".to_string(),
            (self.zoom_settle_ms.value.to_string(), self.zoom_settle_ms.source),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    canonical_crs: Option<u32>,
    vector_enabled: Option<bool>,
    zoom_threshold: Option<f64>,
    simplify_tolerance: Option<f64>,
    cache_max_entries: Option<usize>,
    cache_evict_batch: Option<usize>,
    document_cache_max_entries: Option<usize>,
    client_cache_max_entries: Option<usize>,
    debounce_ms: Option<u64>,
    zoom_settle_ms: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub zoom_threshold: Option<f64>,
    pub simplify_tolerance: Option<f64>,
    pub cache_max_entries: Option<usize>,
}

/// Read and parse an environment variable, warning when it is malformed
fn env_parsed<T: std::str::FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}

/// Parse a boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(HabmapError::ConfigInvalid {
            key: "vector_enabled".to_string(),
            reason: format!("Invalid flag: {}. Use true or false", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.canonical_crs.value, 4326);
        assert_eq!(config.zoom_threshold.value, 12.0);
        assert_eq!(config.cache_max_entries.value, 50);
        assert_eq!(config.cache_evict_batch.value, 10);
        assert_eq!(config.debounce_ms.value, 300);
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data_dir = "/srv/habitats"
zoom_threshold = 10.0
cache_max_entries = 8
cache_evict_batch = 2
debounce_ms = 150
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.data_dir.value, PathBuf::from("/srv/habitats"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.zoom_threshold.value, 10.0);
        assert_eq!(config.cache_settings().max_entries, 8);
        assert_eq!(config.cache_settings().evict_batch, 2);
        assert_eq!(config.zoom_settings().debounce, Duration::from_millis(150));
        // Untouched keys keep their defaults
        assert_eq!(config.simplify_tolerance.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            data_dir: Some(PathBuf::from("fixtures")),
            zoom_threshold: Some(9.0),
            ..Default::default()
        });

        assert_eq!(config.data_dir.value, PathBuf::from("fixtures"));
        assert_eq!(config.data_dir.source, ConfigSource::Cli);
        assert_eq!(config.zoom_threshold.value, 9.0);
        assert_eq!(config.cache_max_entries.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_other_display_crs() {
        let mut config = LayeredConfig::with_defaults();
        config.canonical_crs.update(3857, ConfigSource::File);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HabmapError::ConfigInvalid { ref key, .. } if key == "canonical_crs"));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = LayeredConfig::with_defaults();
        config.cache_evict_batch.update(0, ConfigSource::Cli);
        assert!(config.validate().is_err());

        let mut config = LayeredConfig::with_defaults();
        config.simplify_tolerance.update(-0.5, ConfigSource::Cli);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("YES").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert_eq!(map.len(), 11);
        let (crs_value, crs_source) = &map["canonical_crs"];
        assert_eq!(crs_value, "EPSG:4326");
        assert_eq!(*crs_source, ConfigSource::Default);
    }
}
