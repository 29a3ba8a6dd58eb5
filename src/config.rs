// src/config.rs
//! Cache configuration with TOML file support, environment variable
//! overrides and defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

const DAY_MS: u64 = 1000 * 60 * 60 * 24;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// How long misses accumulate before a batch is sent
    #[serde(default = "default_load_delay_ms")]
    pub load_delay_ms: u64,

    /// Period of the pruning pass
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,

    /// Entries not accessed for this long are pruned
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,

    /// Entry count above which the least recently accessed are pruned
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL handed to the persistent store on every write
    #[serde(default = "default_persist_ttl_secs")]
    pub persist_ttl_secs: u64,

    /// Key the mapping is persisted under
    #[serde(default = "default_cache_key")]
    pub cache_key: String,

    /// Maximum identifiers per grouped query
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_load_delay_ms() -> u64 {
    100
}

fn default_prune_interval_ms() -> u64 {
    30_000
}

fn default_max_age_ms() -> u64 {
    7 * DAY_MS
}

fn default_max_entries() -> usize {
    2500
}

fn default_persist_ttl_secs() -> u64 {
    60 * 60 * 24 * 7
}

fn default_cache_key() -> String {
    "collection-name-cache".to_string()
}

fn default_batch_size() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            load_delay_ms: default_load_delay_ms(),
            prune_interval_ms: default_prune_interval_ms(),
            max_age_ms: default_max_age_ms(),
            max_entries: default_max_entries(),
            persist_ttl_secs: default_persist_ttl_secs(),
            cache_key: default_cache_key(),
            batch_size: default_batch_size(),
        }
    }
}

impl CacheConfig {
    /// Parse configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `COLLECTION_NAME_CACHE_*` environment variable overrides.
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok().and_then(|v| v.parse().ok())
        }

        if let Some(v) = parsed("COLLECTION_NAME_CACHE_LOAD_DELAY_MS") {
            self.load_delay_ms = v;
        }
        if let Some(v) = parsed("COLLECTION_NAME_CACHE_PRUNE_INTERVAL_MS") {
            self.prune_interval_ms = v;
        }
        if let Some(v) = parsed("COLLECTION_NAME_CACHE_MAX_AGE_MS") {
            self.max_age_ms = v;
        }
        if let Some(v) = parsed("COLLECTION_NAME_CACHE_MAX_ENTRIES") {
            self.max_entries = v;
        }
        if let Some(v) = parsed("COLLECTION_NAME_CACHE_PERSIST_TTL_SECS") {
            self.persist_ttl_secs = v;
        }
        if let Ok(key) = std::env::var("COLLECTION_NAME_CACHE_KEY") {
            self.cache_key = key;
        }
        if let Some(v) = parsed("COLLECTION_NAME_CACHE_BATCH_SIZE") {
            self.batch_size = v;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Configuration("Batch size must be > 0".to_string()));
        }
        if self.prune_interval_ms == 0 {
            return Err(Error::Configuration(
                "Prune interval must be > 0".to_string(),
            ));
        }
        if self.cache_key.is_empty() {
            return Err(Error::Configuration("Cache key cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval_ms)
    }

    pub fn persist_ttl(&self) -> Duration {
        Duration::from_secs(self.persist_ttl_secs)
    }

    pub(crate) fn max_age_ms_i64(&self) -> i64 {
        i64::try_from(self.max_age_ms).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.load_delay(), Duration::from_millis(100));
        assert_eq!(config.prune_interval(), Duration::from_secs(30));
        assert_eq!(config.max_age_ms, 604_800_000);
        assert_eq!(config.max_entries, 2500);
        assert_eq!(config.cache_key, "collection-name-cache");
        assert_eq!(config.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CacheConfig::from_toml_str("load_delay_ms = 25\nmax_entries = 2\n").unwrap();
        assert_eq!(config.load_delay_ms, 25);
        assert_eq!(config.max_entries, 2);
        assert_eq!(config.prune_interval_ms, 30_000);
    }

    #[test]
    fn bad_toml_is_configuration_error() {
        let err = CacheConfig::from_toml_str("load_delay_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = CacheConfig {
            batch_size: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.toml");
        std::fs::write(&path, "cache_key = \"names\"\nbatch_size = 10\n").unwrap();
        let config = CacheConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.batch_size, 10);
    }
}
