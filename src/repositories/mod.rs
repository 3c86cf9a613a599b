//! # Repository Pattern Implementation
//!
//! Storage abstractions behind the aggregator's cache layer. Backends
//! implement [`CacheStore`]; callers only ever see the [`Cache`] facade,
//! which turns every storage failure into a miss.
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hotel_aggregator::repositories::{Cache, InMemoryCacheStore};
//!
//! # async fn example() {
//! let cache = Cache::connect(Arc::new(InMemoryCacheStore::new())).await;
//! cache.set("dest:booking:paris", &"-1456928", Duration::from_secs(60)).await;
//! let id: Option<String> = cache.get("dest:booking:paris").await;
//! assert_eq!(id.as_deref(), Some("-1456928"));
//! # }
//! ```

pub mod cache;

pub use cache::{
    make_key, Cache, CacheEntry, CacheStore, CacheTtls, InMemoryCacheStore, SledCacheStore,
    DESTINATION_DOMAIN, MAX_KEY_LENGTH, SEARCH_DOMAIN,
};

/// Common repository error types
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<sled::Error> for RepositoryError {
    fn from(err: sled::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Repository result type
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
