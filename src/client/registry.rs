use crate::client::providers::{
    BookingAdapter, HotelsComAdapter, PlatformAdapter, PricelineAdapter, ProviderError,
};
use crate::config::Config;
use crate::repositories::Cache;
use std::sync::Arc;
use tracing::{info, warn};

/// Named set of platform adapters, in registration order
#[derive(Default)]
pub struct ScraperRegistry {
    adapters: Vec<Arc<dyn PlatformAdapter>>,
}

impl std::fmt::Debug for ScraperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperRegistry")
            .field("platforms", &self.get_platforms())
            .finish()
    }
}

impl ScraperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for every provider whose credentials are configured
    pub fn from_config(config: &Config, cache: Cache) -> Result<Self, ProviderError> {
        let mut registry = Self::new();

        if config.has_rapidapi_key() {
            registry.register(Arc::new(BookingAdapter::new(config, cache.clone())?));
            registry.register(Arc::new(HotelsComAdapter::new(config, cache.clone())?));
            registry.register(Arc::new(PricelineAdapter::new(config, cache)?));
        } else {
            warn!("No RapidAPI key configured; no hotel platforms are available");
        }

        info!(
            "Initialized registry with {} platforms: {:?}",
            registry.len(),
            registry.get_platforms()
        );
        Ok(registry)
    }

    /// Register an adapter; an adapter with the same name is replaced in place
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        let name = adapter.name().to_string();
        match self.adapters.iter_mut().find(|a| a.name() == name) {
            Some(slot) => {
                info!("Replacing platform adapter: {}", name);
                *slot = adapter;
            }
            None => {
                info!("Registered platform adapter: {}", name);
                self.adapters.push(adapter);
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<dyn PlatformAdapter>> {
        self.adapters.clone()
    }

    #[must_use]
    pub fn get_platforms(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Release every adapter, continuing past failures.
    ///
    /// Returns the names of adapters whose release failed.
    pub async fn close_all(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for adapter in &self.adapters {
            if let Err(e) = adapter.release().await {
                warn!("Failed to release {}: {}", adapter.name(), e);
                failed.push(adapter.name().to_string());
            }
        }
        info!(
            "Closed {} platform adapters ({} failed)",
            self.adapters.len(),
            failed.len()
        );
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubAdapter {
        name: &'static str,
        description: &'static str,
        fail_release: bool,
        releases: Arc<AtomicUsize>,
    }

    impl StubAdapter {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                description: "stub",
                fail_release: false,
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for StubAdapter {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        async fn resolve_destination(&self, _city: &str) -> Option<DestinationRecord> {
            None
        }

        async fn search(
            &self,
            _criteria: &SearchCriteria,
        ) -> Result<Vec<HotelResult>, ProviderError> {
            Ok(Vec::new())
        }

        async fn release(&self) -> Result<(), ProviderError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                Err(ProviderError::Other("socket already closed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = ScraperRegistry::new();
        registry.register(Arc::new(StubAdapter::new("booking")));
        registry.register(Arc::new(StubAdapter::new("priceline")));

        let mut replacement = StubAdapter::new("booking");
        replacement.description = "replacement";
        registry.register(Arc::new(replacement));

        assert_eq!(registry.get_platforms(), ["booking", "priceline"]);
        assert_eq!(registry.get("booking").unwrap().description(), "replacement");
        assert!(registry.get("expedia").is_none());
    }

    #[tokio::test]
    async fn test_close_all_is_best_effort() {
        let mut failing = StubAdapter::new("booking");
        failing.fail_release = true;
        let healthy = StubAdapter::new("priceline");
        let healthy_releases = healthy.releases.clone();

        let mut registry = ScraperRegistry::new();
        registry.register(Arc::new(failing));
        registry.register(Arc::new(healthy));

        let failed = registry.close_all().await;
        assert_eq!(failed, ["booking"]);
        assert_eq!(healthy_releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_from_config_requires_key() {
        let registry = ScraperRegistry::from_config(&Config::default(), Cache::Disabled).unwrap();
        assert!(registry.is_empty());

        let mut config = Config::default();
        config.providers.rapidapi_key = "test-key".to_string();
        let registry = ScraperRegistry::from_config(&config, Cache::Disabled).unwrap();
        assert_eq!(registry.get_platforms(), ["booking", "hotels_com", "priceline"]);
    }
}
