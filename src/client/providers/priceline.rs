use super::api::{endpoint, ApiAdapter, ProviderApi};
use super::extract::{
    clamp_rating, first_array, first_f64, first_flag, first_string, first_u64, non_negative,
    normalize_rating,
};
use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
use crate::config::ProvidersConfig;
use serde_json::Value;
use url::Url;

/// Location kinds preferred over airports, hotels and landmarks
const CITY_LIKE_TYPES: [&str; 3] = ["city", "neighborhood", "area"];

/// Priceline through the `priceline-com-provider` RapidAPI
pub type PricelineAdapter = ApiAdapter<PricelineApi>;

/// Endpoint and payload layout of the Priceline API
#[derive(Debug, Clone, Copy, Default)]
pub struct PricelineApi;

impl PricelineApi {
    fn is_city_like(location: &Value) -> bool {
        first_string(location, &["/type"]).is_some_and(|kind| {
            CITY_LIKE_TYPES
                .iter()
                .any(|city_like| kind.eq_ignore_ascii_case(city_like))
        })
    }

    /// Guest rating on a 0-10 scale, else a star rating already on 0-5
    fn rating(item: &Value) -> Option<f64> {
        normalize_rating(
            first_f64(item, &["/overallGuestRating", "/guestRating"]).filter(|r| *r > 0.0),
            Self::RATING_SCALE,
        )
        .or_else(|| first_f64(item, &["/starRating", "/stars"]).map(clamp_rating))
    }
}

impl ProviderApi for PricelineApi {
    const PLATFORM: &'static str = "priceline";
    const DESCRIPTION: &'static str = "Priceline hotel search via RapidAPI";
    const HOST: &'static str = "priceline-com-provider.p.rapidapi.com";

    fn base_url(config: &ProvidersConfig) -> &str {
        &config.priceline_base_url
    }

    fn location_url(base: &Url, city: &str) -> Url {
        endpoint(
            base,
            "/v1/hotels/locations",
            &[("name", city), ("search_type", "ALL")],
        )
    }

    fn parse_destination(body: &Value, city: &str) -> Option<DestinationRecord> {
        let locations = first_array(body, &["", "/data"]);
        let location = locations
            .iter()
            .find(|location| Self::is_city_like(location))
            .or_else(|| locations.first())?;

        Some(DestinationRecord {
            dest_id: first_string(location, &["/id", "/cityId", "/itemId"])?,
            dest_type: first_string(location, &["/type"]),
            name: first_string(location, &["/cityName", "/name"]).or_else(|| Some(city.to_string())),
        })
    }

    fn search_url(base: &Url, destination: &DestinationRecord, criteria: &SearchCriteria) -> Url {
        let check_in = criteria.check_in.to_string();
        let check_out = criteria.check_out.to_string();
        let adults = criteria.guests.to_string();

        endpoint(
            base,
            "/v1/hotels/search",
            &[
                ("location_id", destination.dest_id.as_str()),
                ("date_checkin", &check_in),
                ("date_checkout", &check_out),
                ("rooms_number", "1"),
                ("adults_number", &adults),
                ("sort_order", "PRICE"),
            ],
        )
    }

    fn hotel_items(body: &Value) -> &[Value] {
        first_array(body, &["", "/hotels", "/data/hotels", "/results"])
    }

    fn parse_hotel(item: &Value, city: &str) -> Option<HotelResult> {
        let hotel_id = first_string(item, &["/hotelId", "/id"])?;
        let name = first_string(item, &["/name", "/hotelName"])?;

        let mut hotel = HotelResult::new(Self::PLATFORM, hotel_id, name);
        hotel.price = non_negative(first_f64(
            item,
            &[
                "/ratesSummary/minPrice",
                "/ratesSummary/minRate",
                "/price",
                "/avgNightlyRate",
            ],
        ));
        if let Some(currency) = first_string(item, &["/currency"]) {
            hotel.currency = currency;
        }
        hotel.rating = Self::rating(item);
        hotel.review_count = first_u64(item, &["/reviewCount", "/totalReviews"]);
        hotel.address = first_string(item, &["/location/address/line1", "/address"]);
        hotel.city = Some(city.to_string());
        hotel.image_url = first_string(
            item,
            &["/images/0/url", "/images/0", "/thumbnail", "/thumbnailUrl"],
        );
        hotel.booking_url = Some(format!(
            "https://www.priceline.com/r-cityhotelid/{}",
            hotel.hotel_id
        ));
        if first_flag(item, &["/freeCancel", "/freeCancellation"]) {
            hotel.cancellation_policy = Some(HotelResult::FREE_CANCELLATION.to_string());
        }

        Some(hotel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_destination_prefers_city_like_locations() {
        let body = json!([
            {"id": "AIR-1", "type": "AIRPORT"},
            {"cityId": 3000035827_u64, "type": "CITY", "cityName": "Paris"}
        ]);
        let record = PricelineApi::parse_destination(&body, "paris").unwrap();
        assert_eq!(record.dest_id, "3000035827");
        assert_eq!(record.name.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_destination_falls_back_to_first() {
        let body = json!({"data": [{"itemId": "42", "type": "HOTEL"}]});
        let record = PricelineApi::parse_destination(&body, "Nowhere").unwrap();
        assert_eq!(record.dest_id, "42");
        assert_eq!(record.name.as_deref(), Some("Nowhere"));

        assert!(PricelineApi::parse_destination(&json!([]), "Nowhere").is_none());
    }

    #[test]
    fn test_hotel_items_top_level_or_nested() {
        assert_eq!(PricelineApi::hotel_items(&json!([{"id": 1}])).len(), 1);
        assert_eq!(
            PricelineApi::hotel_items(&json!({"data": {"hotels": [{"id": 1}, {"id": 2}]}})).len(),
            2
        );
    }

    #[test]
    fn test_parse_hotel_maps_fields() {
        let item = json!({
            "hotelId": "700",
            "name": "Pullman Paris",
            "ratesSummary": {"minPrice": "142.00"},
            "overallGuestRating": 8.0,
            "totalReviews": 77,
            "location": {"address": {"line1": "18 Avenue de Suffren"}},
            "images": ["https://images.example/p.jpg"],
            "freeCancellation": true
        });

        let hotel = PricelineApi::parse_hotel(&item, "Paris").unwrap();
        assert_eq!(hotel.price, Some(142.0));
        assert_eq!(hotel.rating, Some(4.0));
        assert_eq!(hotel.review_count, Some(77));
        assert_eq!(hotel.address.as_deref(), Some("18 Avenue de Suffren"));
        assert_eq!(hotel.image_url.as_deref(), Some("https://images.example/p.jpg"));
        assert_eq!(
            hotel.booking_url.as_deref(),
            Some("https://www.priceline.com/r-cityhotelid/700")
        );
        assert!(hotel.has_free_cancellation());
    }

    #[test]
    fn test_star_rating_fallback_is_clamped() {
        let item = json!({"id": 1, "hotelName": "Stars", "starRating": 4.5, "avgNightlyRate": 90});
        let hotel = PricelineApi::parse_hotel(&item, "Paris").unwrap();
        assert_eq!(hotel.rating, Some(4.5));
        assert_eq!(hotel.price, Some(90.0));

        let item = json!({"id": 2, "name": "Odd", "stars": 7});
        assert_eq!(PricelineApi::parse_hotel(&item, "Paris").unwrap().rating, Some(5.0));
    }
}
