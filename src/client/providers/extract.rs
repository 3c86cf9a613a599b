//! Tolerant field extraction from loosely specified provider JSON.
//!
//! Paths are JSON pointers (`/price/lead/amount`). Each accessor walks its
//! candidate paths in order and returns the first non-null value of the
//! expected type; nothing found is `None`, never an error.

use crate::client::{HotelResult, SearchCriteria};
use serde_json::Value;

/// Upper bound of the canonical rating scale
pub const RATING_SCALE: f64 = 5.0;

/// First non-null value at any of `paths`
#[must_use]
pub fn first_value<'a>(item: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| item.pointer(path))
        .find(|value| !value.is_null())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// First numeric value (JSON number or numeric string)
#[must_use]
pub fn first_f64(item: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .filter_map(|path| item.pointer(path))
        .find_map(as_f64)
}

/// First non-negative integer value
#[must_use]
pub fn first_u64(item: &Value, paths: &[&str]) -> Option<u64> {
    first_f64(item, paths)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64)
}

/// First non-empty string; numbers are rendered, so numeric ids work too
#[must_use]
pub fn first_string(item: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| item.pointer(path))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Truthiness of the first non-null value
#[must_use]
pub fn first_flag(item: &Value, paths: &[&str]) -> bool {
    first_value(item, paths).is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// First non-empty array at any of `paths`
#[must_use]
pub fn first_array<'a>(body: &'a Value, paths: &[&str]) -> &'a [Value] {
    paths
        .iter()
        .filter_map(|path| body.pointer(path))
        .filter_map(Value::as_array)
        .find(|items| !items.is_empty())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Rescale a provider rating onto 0-5, rounded to one decimal
#[must_use]
pub fn normalize_rating(raw: Option<f64>, scale: f64) -> Option<f64> {
    let raw = raw?;
    if scale <= 0.0 {
        return None;
    }
    Some(clamp_rating(round_one_decimal(raw * RATING_SCALE / scale)))
}

/// Keep an already 0-5 rating inside the canonical range
#[must_use]
pub fn clamp_rating(rating: f64) -> f64 {
    rating.clamp(0.0, RATING_SCALE)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Prices are never negative; anything else is treated as unknown
#[must_use]
pub fn non_negative(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p >= 0.0)
}

/// Prefix scheme-relative or site-relative URLs
#[must_use]
pub fn absolute_url(url: &str, origin: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else if url.starts_with("//") {
        format!("https:{url}")
    } else {
        format!("{origin}{url}")
    }
}

/// Whether a candidate passes the user filters.
///
/// Order: max price, min rating, free cancellation, name substring. Unknown
/// prices and ratings are not filtered out.
#[must_use]
pub fn passes_filters(hotel: &HotelResult, criteria: &SearchCriteria) -> bool {
    if let (Some(max_price), Some(price)) = (criteria.max_price, hotel.price) {
        if price > max_price {
            return false;
        }
    }
    if let (Some(min_rating), Some(rating)) = (criteria.min_rating, hotel.rating) {
        if rating < min_rating {
            return false;
        }
    }
    if criteria.free_cancellation && !hotel.has_free_cancellation() {
        return false;
    }
    if let Some(name) = criteria.hotel_name.as_deref() {
        if !hotel.name.to_lowercase().contains(&name.to_lowercase()) {
            return false;
        }
    }
    true
}

/// Apply [`passes_filters`] to a candidate list
#[must_use]
pub fn apply_filters(candidates: Vec<HotelResult>, criteria: &SearchCriteria) -> Vec<HotelResult> {
    candidates
        .into_iter()
        .filter(|hotel| passes_filters(hotel, criteria))
        .collect()
}
