use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
use crate::resilience::Retryable;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden: API key invalid or subscription issue")]
    Forbidden,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Map a non-success HTTP status into the matching variant
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => Self::RateLimit,
            403 => Self::Forbidden,
            _ => Self::Status { status, body },
        }
    }

    /// HTTP status behind the error, if any
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimit => Some(429),
            Self::Forbidden => Some(403),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(format!("Request failed: {e}"))
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        // every failed HTTP exchange is retried; bad payloads and local faults are not
        !matches!(self, Self::Parse(_) | Self::Other(_))
    }
}

/// A hotel data provider mapped onto the canonical result shape
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Unique platform name used for registration and result tagging
    fn name(&self) -> &str;

    /// Human-readable description of the provider
    fn description(&self) -> &str;

    /// Resolve a free-text city to the provider's destination id.
    ///
    /// Returns `None` when nothing matches or the lookup fails.
    async fn resolve_destination(&self, city: &str) -> Option<DestinationRecord>;

    /// Search hotels matching the criteria.
    ///
    /// Implementations contain their own network failures and return the
    /// partial or empty result set; an `Err` marks the whole platform as failed.
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<HotelResult>, ProviderError>;

    /// Release outbound connection resources
    async fn release(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
