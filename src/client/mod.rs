pub mod fetch;
pub mod meta_search;
pub mod providers;
pub mod registry;

pub use fetch::ResilientFetcher;
pub use meta_search::{MetaSearchClient, MetaSearchConfig};
pub use registry::ScraperRegistry;

use crate::{Error, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Guests allowed per search
pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 10;

const fn default_guests() -> u32 {
    2
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Criteria for one hotel availability search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchCriteria {
    /// City to search in
    pub city: String,
    /// Check-in date
    pub check_in: NaiveDate,
    /// Check-out date, strictly after check-in
    pub check_out: NaiveDate,
    /// Number of guests (1-10)
    #[serde(default = "default_guests")]
    pub guests: u32,
    /// Case-insensitive hotel name substring
    #[serde(default)]
    pub hotel_name: Option<String>,
    /// Maximum price per night
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Minimum rating on the 0-5 scale
    #[serde(default)]
    pub min_rating: Option<f64>,
    /// Only keep hotels offering free cancellation
    #[serde(default)]
    pub free_cancellation: bool,
    /// Platforms to search (default: all registered)
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
}

impl SearchCriteria {
    /// Create criteria with defaults for every optional field
    #[must_use]
    pub fn new(city: impl Into<String>, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            city: city.into(),
            check_in,
            check_out,
            guests: default_guests(),
            hotel_name: None,
            max_price: None,
            min_rating: None,
            free_cancellation: false,
            platforms: None,
        }
    }

    /// Boundary validation of the request invariants
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(invalid("city", "city cannot be empty"));
        }
        if self.check_out <= self.check_in {
            return Err(invalid("check_out", "check_out must be after check_in"));
        }
        if !(MIN_GUESTS..=MAX_GUESTS).contains(&self.guests) {
            return Err(invalid("guests", "guests must be between 1 and 10"));
        }
        if let Some(rating) = self.min_rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(invalid("min_rating", "min_rating must be between 0 and 5"));
            }
        }
        if let Some(price) = self.max_price {
            if price < 0.0 {
                return Err(invalid("max_price", "max_price cannot be negative"));
            }
        }
        Ok(())
    }

    /// Number of nights between check-in and check-out
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// A single hotel offer normalized from any platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HotelResult {
    /// Source platform (e.g. "booking")
    pub platform: String,
    /// Platform-specific hotel ID
    pub hotel_id: String,
    pub name: String,
    /// Price per night, never negative
    pub price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Total price for the stay
    pub total_price: Option<f64>,
    /// Rating on the 0-5 scale
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub room_type: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub breakfast_included: bool,
    pub booking_url: Option<String>,
    pub image_url: Option<String>,
}

impl HotelResult {
    /// Canonical cancellation policy for offers with free cancellation
    pub const FREE_CANCELLATION: &'static str = "Free cancellation";

    /// Create a result with only the required fields set
    #[must_use]
    pub fn new(platform: &str, hotel_id: String, name: String) -> Self {
        Self {
            platform: platform.to_string(),
            hotel_id,
            name,
            price: None,
            currency: default_currency(),
            total_price: None,
            rating: None,
            review_count: None,
            address: None,
            city: None,
            room_type: None,
            amenities: None,
            cancellation_policy: None,
            breakfast_included: false,
            booking_url: None,
            image_url: None,
        }
    }

    #[must_use]
    pub fn has_free_cancellation(&self) -> bool {
        self.cancellation_policy.as_deref() == Some(Self::FREE_CANCELLATION)
    }
}

/// Provider-internal location identifier for a city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub dest_id: String,
    /// Provider-specific kind, e.g. "city" or "region"
    pub dest_type: Option<String>,
    /// Display name reported by the provider
    pub name: Option<String>,
}

impl DestinationRecord {
    #[must_use]
    pub fn new(dest_id: impl Into<String>) -> Self {
        Self {
            dest_id: dest_id.into(),
            dest_type: None,
            name: None,
        }
    }
}

/// Aggregated result of a multi-platform search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    pub success: bool,
    /// Hotels ordered by ascending price, unpriced last
    pub hotels: Vec<HotelResult>,
    pub total_results: usize,
    pub platforms_searched: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
