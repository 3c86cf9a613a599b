use super::api::{endpoint, ApiAdapter, ProviderApi};
use super::extract::{
    absolute_url, first_array, first_f64, first_flag, first_string, first_u64, non_negative,
    normalize_rating,
};
use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
use crate::config::ProvidersConfig;
use serde_json::Value;
use url::Url;

const SITE: &str = "https://www.hotels.com";

/// Hotels.com through the `hotels-com-provider` RapidAPI
pub type HotelsComAdapter = ApiAdapter<HotelsComApi>;

/// Endpoint and payload layout of the Hotels.com API
#[derive(Debug, Clone, Copy, Default)]
pub struct HotelsComApi;

impl HotelsComApi {
    /// Free cancellation is offered by any rate option or flagged on the property
    fn has_free_cancellation(item: &Value) -> bool {
        let any_option = item
            .pointer("/price/options")
            .and_then(Value::as_array)
            .is_some_and(|options| options.iter().any(|opt| first_flag(opt, &["/freeCancel"])));

        any_option || first_flag(item, &["/freeCancellation"])
    }
}

impl ProviderApi for HotelsComApi {
    const PLATFORM: &'static str = "hotels_com";
    const DESCRIPTION: &'static str = "Hotels.com hotel search via RapidAPI";
    const HOST: &'static str = "hotels-com-provider.p.rapidapi.com";

    fn base_url(config: &ProvidersConfig) -> &str {
        &config.hotels_com_base_url
    }

    fn location_url(base: &Url, city: &str) -> Url {
        endpoint(
            base,
            "/v2/regions",
            &[("query", city), ("domain", "US"), ("locale", "en_US")],
        )
    }

    fn parse_destination(body: &Value, _city: &str) -> Option<DestinationRecord> {
        let region = first_array(body, &["/data"]).first()?;

        Some(DestinationRecord {
            dest_id: first_string(region, &["/gaiaId", "/regionId"])?,
            dest_type: first_string(region, &["/type"]),
            name: first_string(region, &["/regionNames/shortName", "/regionNames/fullName"]),
        })
    }

    fn search_url(base: &Url, destination: &DestinationRecord, criteria: &SearchCriteria) -> Url {
        let check_in = criteria.check_in.to_string();
        let check_out = criteria.check_out.to_string();
        let adults = criteria.guests.to_string();

        endpoint(
            base,
            "/v3/hotels/search",
            &[
                ("region_id", destination.dest_id.as_str()),
                ("checkin_date", &check_in),
                ("checkout_date", &check_out),
                ("adults_number", &adults),
                ("domain", "US"),
                ("locale", "en_US"),
                ("sort_order", "REVIEW"),
                ("page_number", "1"),
            ],
        )
    }

    fn hotel_items(body: &Value) -> &[Value] {
        first_array(
            body,
            &[
                "/data/properties",
                "/data/hotels",
                "/data/propertySearch/properties",
                "/properties",
                "/hotels",
                "/results",
            ],
        )
    }

    fn parse_hotel(item: &Value, city: &str) -> Option<HotelResult> {
        let hotel_id = first_string(item, &["/id"])?;
        let name = first_string(item, &["/name"])?;

        let mut hotel = HotelResult::new(Self::PLATFORM, hotel_id, name);
        hotel.price = non_negative(first_f64(
            item,
            &["/price/lead/amount", "/price/strikeOut/amount"],
        ));
        if let Some(currency) = first_string(item, &["/price/lead/currencyInfo/code"]) {
            hotel.currency = currency;
        }
        hotel.rating = normalize_rating(
            first_f64(item, &["/guestRating/rating"]),
            Self::RATING_SCALE,
        );
        hotel.review_count = first_u64(item, &["/guestRating/totalCount"]);
        hotel.city = Some(city.to_string());
        hotel.image_url = first_string(item, &["/mediaSection/gallery/media/0/url"]);
        hotel.booking_url = Some(
            first_string(item, &["/link/uri"])
                .map(|uri| absolute_url(&uri, SITE))
                .unwrap_or_else(|| format!("{SITE}/ho{}", hotel.hotel_id)),
        );
        if Self::has_free_cancellation(item) {
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
    fn test_destination_prefers_gaia_id() {
        let body = json!({"data": [
            {"gaiaId": "2734", "regionId": "99", "type": "CITY"},
            {"gaiaId": "1"}
        ]});
        let record = HotelsComApi::parse_destination(&body, "Paris").unwrap();
        assert_eq!(record.dest_id, "2734");
        assert_eq!(record.dest_type.as_deref(), Some("CITY"));

        let body = json!({"data": [{"regionId": 553248635}]});
        assert_eq!(
            HotelsComApi::parse_destination(&body, "Paris").unwrap().dest_id,
            "553248635"
        );
        assert!(HotelsComApi::parse_destination(&json!({"data": []}), "Paris").is_none());
    }

    #[test]
    fn test_hotel_items_probe_order() {
        let nested = json!({"data": {"properties": [], "propertySearch": {"properties": [{"id": 1}]}}});
        assert_eq!(HotelsComApi::hotel_items(&nested).len(), 1);

        let flat = json!({"results": [{"id": 1}, {"id": 2}]});
        assert_eq!(HotelsComApi::hotel_items(&flat).len(), 2);

        assert!(HotelsComApi::hotel_items(&json!({"data": {}})).is_empty());
    }

    #[test]
    fn test_parse_hotel_maps_fields() {
        let item = json!({
            "id": "118925",
            "name": "Hotel Le Six",
            "price": {
                "lead": {"amount": 189.0},
                "options": [{"freeCancel": false}, {"freeCancel": true}]
            },
            "guestRating": {"rating": 9.0, "totalCount": 431},
            "link": {"uri": "/ho118925/"},
            "mediaSection": {"gallery": {"media": [{"url": "https://images.example/1.jpg"}]}}
        });

        let hotel = HotelsComApi::parse_hotel(&item, "Paris").unwrap();
        assert_eq!(hotel.platform, "hotels_com");
        assert_eq!(hotel.price, Some(189.0));
        assert_eq!(hotel.rating, Some(4.5));
        assert_eq!(hotel.review_count, Some(431));
        assert_eq!(hotel.booking_url.as_deref(), Some("https://www.hotels.com/ho118925/"));
        assert_eq!(hotel.image_url.as_deref(), Some("https://images.example/1.jpg"));
        assert!(hotel.has_free_cancellation());
    }

    #[test]
    fn test_parse_hotel_fallbacks() {
        let item = json!({
            "id": 7,
            "name": "Strike",
            "price": {"lead": null, "strikeOut": {"amount": "120"}},
            "freeCancellation": false
        });

        let hotel = HotelsComApi::parse_hotel(&item, "Paris").unwrap();
        assert_eq!(hotel.price, Some(120.0));
        assert_eq!(hotel.rating, None);
        assert_eq!(hotel.booking_url.as_deref(), Some("https://www.hotels.com/ho7"));
        assert!(!hotel.has_free_cancellation());
    }
}
