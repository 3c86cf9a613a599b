//! # Configuration
//!
//! Layered configuration for the aggregator: built-in defaults, an optional
//! TOML file, then `HOTEL_AGG__*` environment variables
//! (e.g. `HOTEL_AGG__PROVIDERS__RAPIDAPI_KEY`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "HOTEL_AGG";

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub http: HttpConfig,
    pub fetch: FetchConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
}

/// Provider credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// RapidAPI key shared by all hosted provider APIs; empty disables them
    pub rapidapi_key: String,
    pub booking_base_url: String,
    pub hotels_com_base_url: String,
    pub priceline_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            rapidapi_key: String::new(),
            booking_base_url: "https://booking-com.p.rapidapi.com".to_string(),
            hotels_com_base_url: "https://hotels-com-provider.p.rapidapi.com".to_string(),
            priceline_base_url: "https://priceline-com-provider.p.rapidapi.com".to_string(),
        }
    }
}

/// Outbound HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("hotel-aggregator/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Pacing and retry behaviour of the resilient fetch primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Delay applied before every outbound attempt
    pub request_delay_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 1000,
            max_attempts: 3,
            initial_backoff_ms: 2000,
            max_backoff_ms: 10_000,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum adapters searched at the same time within one batch
    pub max_concurrent_requests: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 3,
        }
    }
}

/// Which store backs the cache layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Sled,
    Memory,
    Disabled,
}

/// Cache layer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Location of the sled database; defaults to the user cache directory
    pub path: Option<PathBuf>,
    /// TTL for city → destination id mappings (rarely change)
    pub destination_ttl_secs: u64,
    /// TTL for search results (prices change frequently)
    pub search_ttl_secs: u64,
    /// Whether adapters consult the search-result cache
    pub cache_search_results: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sled,
            path: None,
            destination_ttl_secs: 86_400,
            search_ttl_secs: 300,
            cache_search_results: false,
        }
    }
}

impl CacheConfig {
    /// Resolved sled database location
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("hotel-aggregator")
                .join("cache.sled")
        })
    }

    #[must_use]
    pub const fn destination_ttl(&self) -> Duration {
        Duration::from_secs(self.destination_ttl_secs)
    }

    #[must_use]
    pub const fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            http: HttpConfig::default(),
            fetch: FetchConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rapidapi_key: Option<String>,
    pub max_concurrent_requests: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub cache_backend: Option<CacheBackend>,
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(key) = &overrides.rapidapi_key {
            self.providers.rapidapi_key.clone_from(key);
        }
        if let Some(max) = overrides.max_concurrent_requests {
            self.search.max_concurrent_requests = max;
        }
        if let Some(delay) = overrides.request_delay_ms {
            self.fetch.request_delay_ms = delay;
        }
        if let Some(backend) = overrides.cache_backend {
            self.cache.backend = backend;
        }
        if let Some(path) = &overrides.cache_path {
            self.cache.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.search.max_concurrent_requests == 0 {
            return Err(invalid(
                "search.max_concurrent_requests",
                "must be at least 1",
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs", "must be greater than 0"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(invalid("fetch.max_attempts", "must be at least 1"));
        }
        if self.fetch.max_backoff_ms < self.fetch.initial_backoff_ms {
            return Err(invalid(
                "fetch.max_backoff_ms",
                "must not be smaller than fetch.initial_backoff_ms",
            ));
        }
        if self.cache.destination_ttl_secs == 0 {
            return Err(invalid("cache.destination_ttl_secs", "must be greater than 0"));
        }
        if self.cache.search_ttl_secs == 0 {
            return Err(invalid("cache.search_ttl_secs", "must be greater than 0"));
        }
        for (field, url) in [
            ("providers.booking_base_url", &self.providers.booking_base_url),
            ("providers.hotels_com_base_url", &self.providers.hotels_com_base_url),
            ("providers.priceline_base_url", &self.providers.priceline_base_url),
        ] {
            if url::Url::parse(url).is_err() {
                return Err(invalid(field, "must be an absolute URL"));
            }
        }
        Ok(())
    }

    /// Whether hosted provider APIs can be used
    #[must_use]
    pub fn has_rapidapi_key(&self) -> bool {
        !self.providers.rapidapi_key.trim().is_empty()
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
