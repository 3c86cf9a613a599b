//! # Cache Repository
//!
//! Best-effort key/value caching with TTL support. Destination lookups are
//! cached for a long time, search results only briefly. The layer never
//! fails a request: an unreachable store turns [`Cache`] into its no-op
//! variant and per-call errors are logged and treated as misses.

use super::{RepositoryError, RepositoryResult};
use crate::client::{DestinationRecord, HotelResult};
use crate::config::{CacheBackend, CacheConfig};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Namespace for city → destination id mappings
pub const DESTINATION_DOMAIN: &str = "dest";
/// Namespace for search result lists
pub const SEARCH_DOMAIN: &str = "search";
/// Composed keys with more characters than this are replaced by a hash
pub const MAX_KEY_LENGTH: usize = 100;

const PROBE_KEY: &str = "__probe__";

/// Build a cache key `<domain>:<platform>:<city>[:<extra>...]`.
///
/// The city is lowercased. Keys longer than [`MAX_KEY_LENGTH`] collapse to
/// `<domain>:<first 16 hex chars of sha256(key)>`.
#[must_use]
pub fn make_key(domain: &str, platform: &str, city: &str, extra: &[&str]) -> String {
    let mut key = format!("{domain}:{platform}:{}", city.to_lowercase());
    for arg in extra {
        key.push(':');
        key.push_str(arg);
    }

    if key.chars().count() > MAX_KEY_LENGTH {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        return format!("{domain}:{}", &digest[..16]);
    }
    key
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// A cache entry with expiration support
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached JSON value
    pub value: serde_json::Value,
    /// When this entry expires (Unix timestamp)
    pub expires_at: u64,
}

impl CacheEntry {
    /// Create a new cache entry with TTL
    #[must_use]
    pub fn new(value: serde_json::Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now_secs().saturating_add(ttl.as_secs()),
        }
    }

    /// Check if this entry has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }

    /// Get remaining TTL
    #[must_use]
    pub fn remaining_ttl(&self) -> Duration {
        Duration::from_secs(self.expires_at.saturating_sub(now_secs()))
    }
}

/// Storage backend for the cache layer
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Returns the name of the store for logging
    fn name(&self) -> &'static str;

    /// Connectivity probe run once at startup
    async fn ping(&self) -> RepositoryResult<()>;

    /// Get a live entry's value; expired entries are misses
    async fn get(&self, key: &str) -> RepositoryResult<Option<serde_json::Value>>;

    /// Store a value with TTL
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration)
        -> RepositoryResult<()>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> RepositoryResult<bool>;

    /// Persist pending writes before shutdown
    async fn flush(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// In-memory implementation of [`CacheStore`]
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Raw entry lookup, for inspecting TTLs
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> RepositoryResult<Option<serde_json::Value>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> RepositoryResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> RepositoryResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Embedded sled database implementation of [`CacheStore`]
#[derive(Debug)]
pub struct SledCacheStore {
    db: sled::Db,
}

impl SledCacheStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn decode(bytes: &[u8]) -> RepositoryResult<CacheEntry> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Run a sled operation on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&sled::Db) -> RepositoryResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking({
            let db = self.db.clone();
            move || op(&db)
        })
        .await
        .map_err(|e| RepositoryError::Storage {
            message: format!("sled task failed: {e}"),
        })?
    }
}

#[async_trait]
impl CacheStore for SledCacheStore {
    fn name(&self) -> &'static str {
        "sled"
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.blocking(|db| {
            db.insert(PROBE_KEY, b"1".as_slice())?;
            let read_back = db.get(PROBE_KEY)?;
            db.remove(PROBE_KEY)?;
            if read_back.is_none() {
                return Err(RepositoryError::Storage {
                    message: "probe key not readable".to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> RepositoryResult<Option<serde_json::Value>> {
        let key = key.to_string();
        self.blocking(move |db| {
            let Some(bytes) = db.get(&key)? else {
                return Ok(None);
            };
            let entry = Self::decode(&bytes)?;
            if entry.is_expired() {
                db.remove(&key)?;
                return Ok(None);
            }
            Ok(Some(entry.value))
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> RepositoryResult<()> {
        let key = key.to_string();
        let bytes = serde_json::to_vec(&CacheEntry::new(value, ttl))?;
        self.blocking(move |db| {
            db.insert(key, bytes)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> RepositoryResult<bool> {
        let key = key.to_string();
        self.blocking(move |db| Ok(db.remove(key)?.is_some())).await
    }

    async fn flush(&self) -> RepositoryResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

/// TTLs of the two cache domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub destination: Duration,
    pub search: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            destination: Duration::from_secs(86_400),
            search: Duration::from_secs(300),
        }
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            destination: config.destination_ttl(),
            search: config.search_ttl(),
        }
    }
}

/// Cache facade: either backed by a reachable store or a no-op
#[derive(Debug, Clone)]
pub enum Cache {
    Connected {
        store: Arc<dyn CacheStore>,
        ttls: CacheTtls,
    },
    Disabled,
}

impl Cache {
    /// Probe `store` and connect with default TTLs
    pub async fn connect(store: Arc<dyn CacheStore>) -> Self {
        Self::connect_with_ttls(store, CacheTtls::default()).await
    }

    /// Probe `store` once; an unreachable store yields [`Cache::Disabled`]
    pub async fn connect_with_ttls(store: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        match store.ping().await {
            Ok(()) => {
                info!("Connected to {} cache", store.name());
                Self::Connected { store, ttls }
            }
            Err(e) => {
                warn!(
                    "Failed to connect to {} cache, caching disabled: {}",
                    store.name(),
                    e
                );
                Self::Disabled
            }
        }
    }

    /// Build the cache described by the configuration
    pub async fn from_config(config: &CacheConfig) -> Self {
        let ttls = CacheTtls::from(config);
        match config.backend {
            CacheBackend::Disabled => {
                warn!("Cache backend disabled by configuration");
                Self::Disabled
            }
            CacheBackend::Memory => {
                Self::connect_with_ttls(Arc::new(InMemoryCacheStore::new()), ttls).await
            }
            CacheBackend::Sled => {
                let path = config.resolved_path();
                match SledCacheStore::open(&path) {
                    Ok(store) => Self::connect_with_ttls(Arc::new(store), ttls).await,
                    Err(e) => {
                        warn!(
                            "Failed to open cache at {}, caching disabled: {}",
                            path.display(),
                            e
                        );
                        Self::Disabled
                    }
                }
            }
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    #[must_use]
    pub fn ttls(&self) -> CacheTtls {
        match self {
            Self::Connected { ttls, .. } => *ttls,
            Self::Disabled => CacheTtls::default(),
        }
    }

    /// Get a cached value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Self::Connected { store, .. } = self else {
            return None;
        };

        match store.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => {
                    debug!("Cache HIT: {}", key);
                    Some(decoded)
                }
                Err(e) => {
                    warn!("Cache get error: {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                warn!("Cache get error: {}", e);
                None
            }
        }
    }

    /// Set a cached value with TTL
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Self::Connected { store, .. } = self else {
            return false;
        };

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache set error: {}: {}", key, e);
                return false;
            }
        };

        match store.set(key, value, ttl).await {
            Ok(()) => {
                debug!("Cache SET: {} (TTL: {}s)", key, ttl.as_secs());
                true
            }
            Err(e) => {
                warn!("Cache set error: {}", e);
                false
            }
        }
    }

    /// Delete a cached value
    pub async fn delete(&self, key: &str) -> bool {
        let Self::Connected { store, .. } = self else {
            return false;
        };

        match store.delete(key).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Cache delete error: {}", e);
                false
            }
        }
    }

    /// Flush the store before shutdown
    pub async fn disconnect(&self) {
        if let Self::Connected { store, .. } = self {
            match store.flush().await {
                Ok(()) => info!("Disconnected from {} cache", store.name()),
                Err(e) => warn!("Failed to flush {} cache: {}", store.name(), e),
            }
        }
    }

    /// Get cached destination lookup
    pub async fn get_destination(&self, platform: &str, city: &str) -> Option<DestinationRecord> {
        self.get(&make_key(DESTINATION_DOMAIN, platform, city, &[]))
            .await
    }

    /// Cache destination lookup (long TTL)
    pub async fn set_destination(
        &self,
        platform: &str,
        city: &str,
        record: &DestinationRecord,
    ) -> bool {
        let key = make_key(DESTINATION_DOMAIN, platform, city, &[]);
        self.set(&key, record, self.ttls().destination).await
    }

    /// Get cached search results
    pub async fn get_search_results(
        &self,
        platform: &str,
        city: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
    ) -> Option<Vec<HotelResult>> {
        let key = search_key(platform, city, check_in, check_out, guests);
        self.get(&key).await
    }

    /// Cache search results (short TTL)
    pub async fn set_search_results(
        &self,
        platform: &str,
        city: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        results: &[HotelResult],
    ) -> bool {
        let key = search_key(platform, city, check_in, check_out, guests);
        self.set(&key, results, self.ttls().search).await
    }
}

fn search_key(
    platform: &str,
    city: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
) -> String {
    let check_in = check_in.to_string();
    let check_out = check_out.to_string();
    let guests = guests.to_string();
    make_key(
        SEARCH_DOMAIN,
        platform,
        city,
        &[&check_in, &check_out, &guests],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[derive(Debug)]
    struct BrokenStore {
        ping_ok: bool,
    }

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn ping(&self) -> RepositoryResult<()> {
            if self.ping_ok {
                Ok(())
            } else {
                Err(RepositoryError::Storage {
                    message: "connection refused".to_string(),
                })
            }
        }

        async fn get(&self, _key: &str) -> RepositoryResult<Option<serde_json::Value>> {
            Err(RepositoryError::Storage {
                message: "read failed".to_string(),
            })
        }

        async fn set(
            &self,
            _key: &str,
            _value: serde_json::Value,
            _ttl: Duration,
        ) -> RepositoryResult<()> {
            Err(RepositoryError::Storage {
                message: "write failed".to_string(),
            })
        }

        async fn delete(&self, _key: &str) -> RepositoryResult<bool> {
            Err(RepositoryError::Storage {
                message: "delete failed".to_string(),
            })
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_key_lowercases_city() {
        assert_eq!(
            make_key(DESTINATION_DOMAIN, "booking", "New York", &[]),
            "dest:booking:new york"
        );
        assert_eq!(
            make_key(DESTINATION_DOMAIN, "booking", "NEW YORK", &[]),
            make_key(DESTINATION_DOMAIN, "booking", "new york", &[])
        );
        assert_eq!(
            make_key(SEARCH_DOMAIN, "priceline", "Rome", &["2026-01-01", "2026-01-03", "2"]),
            "search:priceline:rome:2026-01-01:2026-01-03:2"
        );
    }

    #[test]
    fn test_long_key_is_hashed() {
        let city = "x".repeat(120);
        let key = make_key(SEARCH_DOMAIN, "booking", &city, &["2026-01-01"]);
        let (domain, hash) = key.split_once(':').unwrap();

        assert_eq!(domain, SEARCH_DOMAIN);
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, make_key(SEARCH_DOMAIN, "booking", &city.to_uppercase(), &["2026-01-01"]));
        assert_ne!(key, make_key(SEARCH_DOMAIN, "booking", &city, &["2026-01-02"]));
    }

    #[test]
    fn test_key_at_limit_is_kept() {
        let prefix = "dest:booking:";
        let city = "a".repeat(MAX_KEY_LENGTH - prefix.len());
        let key = make_key(DESTINATION_DOMAIN, "booking", &city, &[]);
        assert_eq!(key.len(), MAX_KEY_LENGTH);
        assert!(key.starts_with(prefix));
    }

    #[test]
    fn test_key_limit_counts_characters() {
        let city = "東".repeat(30);
        let key = make_key(DESTINATION_DOMAIN, "booking", &city, &[]);
        assert_eq!(key, format!("dest:booking:{city}"));
        assert!(key.len() > MAX_KEY_LENGTH);

        let city = "東".repeat(MAX_KEY_LENGTH);
        let key = make_key(DESTINATION_DOMAIN, "booking", &city, &[]);
        assert_eq!(key.chars().count(), "dest:".len() + 16);
    }

    #[tokio::test]
    async fn test_memory_roundtrip_and_delete() {
        let cache = Cache::connect(Arc::new(InMemoryCacheStore::new())).await;
        assert!(cache.is_connected());

        assert!(cache.set("k", &vec![1, 2, 3], Duration::from_secs(60)).await);
        assert_eq!(cache.get::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));
        assert!(cache.delete("k").await);
        assert_eq!(cache.get::<Vec<i32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = Cache::connect(store.clone()).await;

        assert!(cache.set("gone", &"value", Duration::ZERO).await);
        assert_eq!(cache.get::<String>("gone").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_probe_disables_cache() {
        let cache = Cache::connect(Arc::new(BrokenStore { ping_ok: false })).await;
        assert!(!cache.is_connected());
        assert_eq!(cache.get::<String>("k").await, None);
        assert!(!cache.set("k", &"v", Duration::from_secs(1)).await);
        assert!(!cache.delete("k").await);
    }

    #[tokio::test]
    async fn test_operational_errors_are_contained() {
        let cache = Cache::connect(Arc::new(BrokenStore { ping_ok: true })).await;
        assert!(cache.is_connected());
        assert_eq!(cache.get::<String>("k").await, None);
        assert!(!cache.set("k", &"v", Duration::from_secs(1)).await);
        assert!(!cache.delete("k").await);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_miss() {
        let cache = Cache::connect(Arc::new(InMemoryCacheStore::new())).await;
        assert!(cache.set("k", &"not a number", Duration::from_secs(60)).await);
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn test_destination_uses_long_ttl() {
        let store = Arc::new(InMemoryCacheStore::new());
        let ttls = CacheTtls {
            destination: Duration::from_secs(86_400),
            search: Duration::from_secs(300),
        };
        let cache = Cache::connect_with_ttls(store.clone(), ttls).await;

        let record = DestinationRecord::new("-1456928");
        assert!(cache.set_destination("booking", "Paris", &record).await);
        assert_eq!(cache.get_destination("booking", "PARIS").await, Some(record));

        let entry = store.entry("dest:booking:paris").await.unwrap();
        assert!(entry.remaining_ttl() > Duration::from_secs(86_000));
    }

    #[tokio::test]
    async fn test_search_results_use_short_ttl() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = Cache::connect(store.clone()).await;
        let hotels = vec![HotelResult::new("booking", "1".to_string(), "Hotel".to_string())];

        assert!(
            cache
                .set_search_results("booking", "Rome", date("2026-01-01"), date("2026-01-03"), 2, &hotels)
                .await
        );
        let cached = cache
            .get_search_results("booking", "rome", date("2026-01-01"), date("2026-01-03"), 2)
            .await;
        assert_eq!(cached, Some(hotels));
        // different guest count is a different key
        assert!(cache
            .get_search_results("booking", "rome", date("2026-01-01"), date("2026-01-03"), 3)
            .await
            .is_none());

        let entry = store
            .entry("search:booking:rome:2026-01-01:2026-01-03:2")
            .await
            .unwrap();
        assert!(entry.remaining_ttl() <= Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_sled_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCacheStore::open(&dir.path().join("cache")).unwrap();
        assert_ok!(store.ping().await);

        let cache = Cache::connect(Arc::new(store)).await;
        assert!(cache.is_connected());
        assert!(cache.set("k", &serde_json::json!({"id": 7}), Duration::from_secs(60)).await);
        assert_eq!(
            cache.get::<serde_json::Value>("k").await,
            Some(serde_json::json!({"id": 7}))
        );
        assert!(cache.set("old", &1, Duration::ZERO).await);
        assert_eq!(cache.get::<i32>("old").await, None);
        cache.disconnect().await;
    }

    #[tokio::test]
    async fn test_disabled_backend_from_config() {
        let config = CacheConfig {
            backend: CacheBackend::Disabled,
            ..CacheConfig::default()
        };
        assert!(!Cache::from_config(&config).await.is_connected());
    }
}
