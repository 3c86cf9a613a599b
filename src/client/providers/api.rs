//! Shared search flow for the RapidAPI-hosted providers.
//!
//! [`ApiAdapter`] owns the HTTP client, the cache handle, and the
//! resolve → fetch → map → filter pipeline; a [`ProviderApi`] implementation
//! only describes one provider's endpoints and JSON layout.

use super::extract::apply_filters;
use super::traits::{PlatformAdapter, ProviderError};
use crate::client::fetch::ResilientFetcher;
use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
use crate::config::{Config, FetchConfig, HttpConfig, ProvidersConfig};
use crate::repositories::Cache;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Endpoint and payload description of one hosted provider API
pub trait ProviderApi: Send + Sync + 'static {
    /// Platform name used for registration, cache keys and result tagging
    const PLATFORM: &'static str;
    const DESCRIPTION: &'static str;
    /// Value of the `X-RapidAPI-Host` header
    const HOST: &'static str;
    /// Maximum of the provider's rating scale
    const RATING_SCALE: f64 = 10.0;

    /// Configured base URL for this provider
    fn base_url(config: &ProvidersConfig) -> &str;

    /// Location lookup request for a city
    fn location_url(base: &Url, city: &str) -> Url;

    /// Pick the destination out of a location lookup response
    fn parse_destination(body: &Value, city: &str) -> Option<DestinationRecord>;

    /// Hotel search request for a resolved destination
    fn search_url(base: &Url, destination: &DestinationRecord, criteria: &SearchCriteria) -> Url;

    /// The result array inside a search response
    fn hotel_items(body: &Value) -> &[Value];

    /// Map one result item; `None` when the id or name is missing
    fn parse_hotel(item: &Value, city: &str) -> Option<HotelResult>;
}

/// Build `base` + `path` + query parameters
#[must_use]
pub fn endpoint(base: &Url, path: &str, params: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(None);
    url.query_pairs_mut().extend_pairs(params);
    url
}

/// [`PlatformAdapter`] for a RapidAPI-hosted provider
pub struct ApiAdapter<P: ProviderApi> {
    base_url: Url,
    fetcher: ResilientFetcher,
    cache: Cache,
    cache_search_results: bool,
    provider: PhantomData<fn() -> P>,
}

impl<P: ProviderApi> std::fmt::Debug for ApiAdapter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAdapter")
            .field("platform", &P::PLATFORM)
            .field("base_url", &self.base_url.as_str())
            .field("cache_connected", &self.cache.is_connected())
            .finish()
    }
}

impl<P: ProviderApi> ApiAdapter<P> {
    /// Create an adapter from the application configuration
    pub fn new(config: &Config, cache: Cache) -> Result<Self, ProviderError> {
        Ok(Self::with_settings(
            P::base_url(&config.providers),
            &config.providers.rapidapi_key,
            &config.http,
            &config.fetch,
            cache,
        )?
        .cache_search_results(config.cache.cache_search_results))
    }

    /// Create an adapter against an explicit base URL
    pub fn with_settings(
        base_url: &str,
        api_key: &str,
        http: &HttpConfig,
        fetch: &FetchConfig,
        cache: Cache,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;
        let fetcher = ResilientFetcher::new(P::PLATFORM, Self::headers(api_key)?, http, fetch)?;

        Ok(Self {
            base_url,
            fetcher,
            cache,
            cache_search_results: false,
            provider: PhantomData,
        })
    }

    /// Enable or disable the search-result cache for this adapter
    #[must_use]
    pub fn cache_search_results(mut self, enabled: bool) -> Self {
        self.cache_search_results = enabled;
        self
    }

    fn headers(api_key: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| ProviderError::Other(format!("Invalid API key header: {e}")))?;
        headers.insert("X-RapidAPI-Key", key);
        headers.insert("X-RapidAPI-Host", HeaderValue::from_static(P::HOST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Map every item of a search response, dropping malformed ones
    fn parse_candidates(body: &Value, city: &str) -> Vec<HotelResult> {
        let items = P::hotel_items(body);
        info!("{} API returned {} hotels", P::PLATFORM, items.len());

        items
            .iter()
            .filter_map(|item| {
                let parsed = P::parse_hotel(item, city);
                if parsed.is_none() {
                    debug!("Dropping {} item without id or name", P::PLATFORM);
                }
                parsed
            })
            .collect()
    }

    /// Unfiltered candidates, from the search cache or the provider
    async fn candidates(
        &self,
        destination: &DestinationRecord,
        criteria: &SearchCriteria,
    ) -> Vec<HotelResult> {
        if self.cache_search_results {
            if let Some(cached) = self
                .cache
                .get_search_results(
                    P::PLATFORM,
                    &criteria.city,
                    criteria.check_in,
                    criteria.check_out,
                    criteria.guests,
                )
                .await
            {
                info!("Cache HIT for {} search: {}", P::PLATFORM, criteria.city);
                return cached;
            }
        }

        let url = P::search_url(&self.base_url, destination, criteria);
        info!(
            "Searching {} hotels in {} ({})",
            P::PLATFORM,
            criteria.city,
            destination.dest_id
        );

        let candidates = match self.fetcher.fetch_json(&url).await {
            Ok(body) => Self::parse_candidates(&body, &criteria.city),
            Err(e) => {
                log_search_failure(P::PLATFORM, &e);
                return Vec::new();
            }
        };

        if self.cache_search_results {
            self.cache
                .set_search_results(
                    P::PLATFORM,
                    &criteria.city,
                    criteria.check_in,
                    criteria.check_out,
                    criteria.guests,
                    &candidates,
                )
                .await;
        }
        candidates
    }
}

fn log_search_failure(platform: &str, err: &ProviderError) {
    match err {
        ProviderError::RateLimit => error!("Rate limit exceeded for {}", platform),
        ProviderError::Forbidden => {
            error!("API key invalid or subscription issue for {}", platform);
        }
        ProviderError::Status { status, body } => {
            error!("HTTP error searching {}: {}", platform, status);
            debug!("Response body: {}", body);
        }
        other => error!("Error searching {}: {}", platform, other),
    }
}

#[async_trait]
impl<P: ProviderApi> PlatformAdapter for ApiAdapter<P> {
    fn name(&self) -> &str {
        P::PLATFORM
    }

    fn description(&self) -> &str {
        P::DESCRIPTION
    }

    #[instrument(skip(self), fields(platform = P::PLATFORM))]
    async fn resolve_destination(&self, city: &str) -> Option<DestinationRecord> {
        if let Some(cached) = self.cache.get_destination(P::PLATFORM, city).await {
            info!("Cache HIT for {} destination: {}", P::PLATFORM, city);
            return Some(cached);
        }

        let url = P::location_url(&self.base_url, city);
        info!("Searching {} destination for: {}", P::PLATFORM, city);

        match self.fetcher.fetch_json(&url).await {
            Ok(body) => {
                let Some(record) = P::parse_destination(&body, city) else {
                    warn!("No {} destination found for: {}", P::PLATFORM, city);
                    return None;
                };
                info!(
                    "Found {} destination: {} (type: {})",
                    P::PLATFORM,
                    record.dest_id,
                    record.dest_type.as_deref().unwrap_or("-")
                );
                self.cache.set_destination(P::PLATFORM, city, &record).await;
                Some(record)
            }
            Err(e) => {
                error!("Error searching {} destination: {}", P::PLATFORM, e);
                None
            }
        }
    }

    #[instrument(skip(self, criteria), fields(platform = P::PLATFORM, city = %criteria.city))]
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<HotelResult>, ProviderError> {
        let Some(destination) = self.resolve_destination(&criteria.city).await else {
            warn!(
                "Could not find {} destination for {}",
                P::PLATFORM,
                criteria.city
            );
            return Ok(Vec::new());
        };

        let candidates = self.candidates(&destination, criteria).await;
        let results = apply_filters(candidates, criteria);

        info!(
            "Returning {} {} hotels after filtering",
            results.len(),
            P::PLATFORM
        );
        Ok(results)
    }

    async fn release(&self) -> Result<(), ProviderError> {
        self.fetcher.release().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_replaces_path_and_encodes_query() {
        let base = Url::parse("https://example.com/ignored?x=1").unwrap();
        let url = endpoint(&base, "/v1/hotels/locations", &[("name", "New York"), ("locale", "en-gb")]);
        assert_eq!(
            url.as_str(),
            "https://example.com/v1/hotels/locations?name=New+York&locale=en-gb"
        );
    }
}
