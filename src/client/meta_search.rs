use crate::client::providers::{PlatformAdapter, ProviderError};
use crate::client::registry::ScraperRegistry;
use crate::client::{HotelResult, SearchCriteria, SearchResponse};
use crate::config::SearchConfig;
use crate::{Error, Result};
use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Configuration for meta-search behavior
#[derive(Debug, Clone)]
pub struct MetaSearchConfig {
    /// Maximum number of platform searches in flight at once; zero is treated as one
    pub max_concurrent_requests: usize,
}

impl Default for MetaSearchConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for MetaSearchConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }
}

/// Outcome of one platform task
struct PlatformOutcome {
    platform: String,
    hotels: Vec<HotelResult>,
    error: Option<String>,
}

impl PlatformOutcome {
    fn failed(platform: String, error: String) -> Self {
        Self {
            platform,
            hotels: Vec::new(),
            error: Some(error),
        }
    }
}

/// Fans one search out to the registered platforms and merges the results
#[derive(Debug, Clone)]
pub struct MetaSearchClient {
    registry: Arc<ScraperRegistry>,
    config: MetaSearchConfig,
}

impl MetaSearchClient {
    #[must_use]
    pub fn new(registry: Arc<ScraperRegistry>, config: MetaSearchConfig) -> Self {
        Self { registry, config }
    }

    /// Names of the platforms this client can dispatch to
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        self.registry.get_platforms()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ScraperRegistry> {
        &self.registry
    }

    /// Search every selected platform concurrently.
    ///
    /// `criteria.platforms` restricts the search to the named platforms;
    /// unknown names are ignored, and a filter that leaves nothing is an
    /// [`Error::NoValidPlatforms`] before any platform is contacted.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResponse> {
        let adapters = self.select_adapters(criteria.platforms.as_deref())?;
        Ok(self.dispatch(adapters, criteria).await)
    }

    /// Search a single named platform
    pub async fn search_platform(
        &self,
        platform: &str,
        criteria: &SearchCriteria,
    ) -> Result<SearchResponse> {
        let adapter = self
            .registry
            .get(platform)
            .ok_or_else(|| Error::UnknownPlatform {
                platform: platform.to_string(),
                available: self.registry.get_platforms(),
            })?;
        Ok(self.dispatch(vec![adapter], criteria).await)
    }

    fn select_adapters(&self, requested: Option<&[String]>) -> Result<Vec<Arc<dyn PlatformAdapter>>> {
        let Some(requested) = requested.filter(|names| !names.is_empty()) else {
            return Ok(self.registry.get_all());
        };

        let adapters: Vec<_> = requested
            .iter()
            .filter_map(|name| {
                let adapter = self.registry.get(name);
                if adapter.is_none() {
                    warn!("Ignoring unknown platform: {}", name);
                }
                adapter
            })
            .collect();

        if adapters.is_empty() {
            return Err(Error::NoValidPlatforms {
                available: self.registry.get_platforms(),
            });
        }
        Ok(adapters)
    }

    async fn dispatch(
        &self,
        adapters: Vec<Arc<dyn PlatformAdapter>>,
        criteria: &SearchCriteria,
    ) -> SearchResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("search", %request_id, city = %criteria.city);

        async {
            let start_time = Instant::now();
            let platforms: Vec<String> = adapters.iter().map(|a| a.name().to_string()).collect();
            info!(
                "Searching {} platforms: {:?}",
                platforms.len(),
                platforms
            );

            let outcomes = self.run_tasks(adapters, criteria).await;
            let response = merge(platforms, outcomes);

            info!(
                "Search completed: {} hotels, success={} in {:?}",
                response.total_results,
                response.success,
                start_time.elapsed()
            );
            response
        }
        .instrument(span)
        .await
    }

    /// One task per adapter behind a counting gate; results come back in
    /// dispatch order
    async fn run_tasks(
        &self,
        adapters: Vec<Arc<dyn PlatformAdapter>>,
        criteria: &SearchCriteria,
    ) -> Vec<PlatformOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));

        let mut tasks = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let platform = adapter.name().to_string();
            let criteria = criteria.clone();
            let semaphore = semaphore.clone();

            let task = tokio::spawn(
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| ProviderError::Other(format!("Concurrency gate closed: {e}")))?;
                    adapter.search(&criteria).await
                }
                .in_current_span(),
            );
            tasks.push((platform, task));
        }

        let (platforms, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(platforms)
            .map(|(joined, platform)| match joined {
                Ok(Ok(hotels)) => {
                    info!("Platform {} returned {} hotels", platform, hotels.len());
                    PlatformOutcome {
                        platform,
                        hotels,
                        error: None,
                    }
                }
                Ok(Err(e)) => {
                    warn!("Platform {} failed: {}", platform, e);
                    PlatformOutcome::failed(platform, e.to_string())
                }
                Err(e) => {
                    error!("Platform {} task failed: {}", platform, e);
                    PlatformOutcome::failed(platform, e.to_string())
                }
            })
            .collect()
    }
}

/// Ascending price with unpriced records last
fn price_order(a: &HotelResult, b: &HotelResult) -> Ordering {
    let key = |h: &HotelResult| (h.price.is_none(), h.price.unwrap_or(f64::MAX));
    let (a_missing, a_price) = key(a);
    let (b_missing, b_price) = key(b);
    a_missing
        .cmp(&b_missing)
        .then_with(|| a_price.total_cmp(&b_price))
}

/// Concatenate in dispatch order, sort stably by price and derive success
fn merge(platforms: Vec<String>, outcomes: Vec<PlatformOutcome>) -> SearchResponse {
    let mut hotels = Vec::new();
    let mut errors = Vec::new();

    for outcome in outcomes {
        if let Some(error) = outcome.error {
            errors.push(format!("{}: {}", outcome.platform, error));
        }
        hotels.extend(outcome.hotels);
    }
    hotels.sort_by(price_order);

    let all_failed = !errors.is_empty() && errors.len() == platforms.len();
    SearchResponse {
        success: !(all_failed && hotels.is_empty()),
        total_results: hotels.len(),
        hotels,
        platforms_searched: platforms,
        error_message: (!errors.is_empty()).then(|| errors.join("; ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel(platform: &str, id: &str, price: Option<f64>) -> HotelResult {
        let mut hotel = HotelResult::new(platform, id.to_string(), format!("Hotel {id}"));
        hotel.price = price;
        hotel
    }

    fn outcome(platform: &str, hotels: Vec<HotelResult>, error: Option<&str>) -> PlatformOutcome {
        PlatformOutcome {
            platform: platform.to_string(),
            hotels,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_merge_sorts_unpriced_last() {
        let response = merge(
            vec!["a".to_string(), "b".to_string()],
            vec![
                outcome("a", vec![hotel("a", "1", None), hotel("a", "2", Some(50.0))], None),
                outcome("b", vec![hotel("b", "3", Some(10.0))], None),
            ],
        );

        let prices: Vec<_> = response.hotels.iter().map(|h| h.price).collect();
        assert_eq!(prices, [Some(10.0), Some(50.0), None]);
        assert!(response.success);
        assert_eq!(response.total_results, 3);
        assert!(response.error_message.is_none());
    }

    #[test]
    fn test_merge_is_stable_for_equal_prices() {
        let response = merge(
            vec!["a".to_string(), "b".to_string()],
            vec![
                outcome("a", vec![hotel("a", "first", Some(80.0))], None),
                outcome("b", vec![hotel("b", "second", Some(80.0))], None),
            ],
        );
        let ids: Vec<_> = response.hotels.iter().map(|h| h.hotel_id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[test]
    fn test_merge_success_rule() {
        let total_failure = merge(
            vec!["a".to_string(), "b".to_string()],
            vec![
                outcome("a", Vec::new(), Some("boom")),
                outcome("b", Vec::new(), Some("bang")),
            ],
        );
        assert!(!total_failure.success);
        assert_eq!(total_failure.error_message.as_deref(), Some("a: boom; b: bang"));

        let partial = merge(
            vec!["a".to_string(), "b".to_string()],
            vec![outcome("a", Vec::new(), Some("boom")), outcome("b", Vec::new(), None)],
        );
        assert!(partial.success);
        assert_eq!(partial.error_message.as_deref(), Some("a: boom"));
    }

    #[test]
    fn test_empty_platform_list_is_unfiltered() {
        let client = MetaSearchClient::new(Arc::new(ScraperRegistry::new()), MetaSearchConfig::default());
        let none: &[String] = &[];
        assert!(client.select_adapters(Some(none)).unwrap().is_empty());
        let unknown = ["expedia".to_string()];
        assert!(matches!(
            client.select_adapters(Some(&unknown[..])),
            Err(Error::NoValidPlatforms { .. })
        ));
    }
}
