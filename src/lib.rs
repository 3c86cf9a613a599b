pub mod client;
pub mod config;
pub mod error;
pub mod repositories;
pub mod resilience;

pub use client::providers::{PlatformAdapter, ProviderError};
pub use client::{
    DestinationRecord, HotelResult, MetaSearchClient, MetaSearchConfig, ResilientFetcher,
    ScraperRegistry, SearchCriteria, SearchResponse,
};
pub use crate::config::{CacheBackend, Config, ConfigOverrides};
pub use error::{Error, Result};
pub use repositories::{Cache, CacheStore, InMemoryCacheStore, SledCacheStore};
pub use resilience::{retry_with_config, RetryConfig, Retryable};
