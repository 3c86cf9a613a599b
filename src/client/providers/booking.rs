use super::api::{endpoint, ApiAdapter, ProviderApi};
use super::extract::{
    absolute_url, first_array, first_f64, first_flag, first_string, first_u64, non_negative,
    normalize_rating,
};
use crate::client::{DestinationRecord, HotelResult, SearchCriteria};
use crate::config::ProvidersConfig;
use serde_json::Value;
use url::Url;

/// Booking.com through the `booking-com` RapidAPI
pub type BookingAdapter = ApiAdapter<BookingApi>;

/// Endpoint and payload layout of the Booking.com API
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingApi;

impl ProviderApi for BookingApi {
    const PLATFORM: &'static str = "booking";
    const DESCRIPTION: &'static str = "Booking.com hotel search via RapidAPI";
    const HOST: &'static str = "booking-com.p.rapidapi.com";

    fn base_url(config: &ProvidersConfig) -> &str {
        &config.booking_base_url
    }

    fn location_url(base: &Url, city: &str) -> Url {
        endpoint(
            base,
            "/v1/hotels/locations",
            &[("name", city), ("locale", "en-gb")],
        )
    }

    fn parse_destination(body: &Value, _city: &str) -> Option<DestinationRecord> {
        let first = body.as_array()?.first()?;
        let dest_id = first_string(first, &["/dest_id"])?;

        Some(DestinationRecord {
            dest_id,
            dest_type: Some(first_string(first, &["/dest_type"]).unwrap_or_else(|| "city".to_string())),
            name: first_string(first, &["/name", "/label"]),
        })
    }

    fn search_url(base: &Url, destination: &DestinationRecord, criteria: &SearchCriteria) -> Url {
        let check_in = criteria.check_in.to_string();
        let check_out = criteria.check_out.to_string();
        let adults = criteria.guests.to_string();
        let dest_type = destination.dest_type.as_deref().unwrap_or("city");

        endpoint(
            base,
            "/v1/hotels/search",
            &[
                ("dest_id", destination.dest_id.as_str()),
                ("dest_type", dest_type),
                ("checkin_date", &check_in),
                ("checkout_date", &check_out),
                ("adults_number", &adults),
                ("room_number", "1"),
                ("page_number", "0"),
                ("units", "metric"),
                ("locale", "en-gb"),
                ("filter_by_currency", "USD"),
                ("order_by", "popularity"),
            ],
        )
    }

    fn hotel_items(body: &Value) -> &[Value] {
        first_array(body, &["/result"])
    }

    fn parse_hotel(item: &Value, city: &str) -> Option<HotelResult> {
        let hotel_id = first_string(item, &["/hotel_id"])?;
        let name = first_string(item, &["/hotel_name", "/name"])?;

        let mut hotel = HotelResult::new(Self::PLATFORM, hotel_id, name);
        hotel.price = non_negative(first_f64(
            item,
            &[
                "/min_total_price",
                "/price_breakdown/gross_price",
                "/composite_price_breakdown/gross_amount_per_night/value",
            ],
        ));
        if let Some(currency) = first_string(item, &["/currency_code"]) {
            hotel.currency = currency;
        }
        hotel.rating = normalize_rating(first_f64(item, &["/review_score"]), Self::RATING_SCALE);
        hotel.review_count = first_u64(item, &["/review_nr", "/review_count"]);
        hotel.address = first_string(item, &["/address", "/address_trans"]);
        hotel.city = Some(city.to_string());
        hotel.image_url = first_string(item, &["/main_photo_url", "/max_photo_url"])
            .map(|url| absolute_url(&url, "https:"));
        hotel.booking_url = Some(first_string(item, &["/url"]).unwrap_or_else(|| {
            format!("https://www.booking.com/hotel/{}.html", hotel.hotel_id)
        }));
        if first_flag(item, &["/is_free_cancellable"]) {
            hotel.cancellation_policy = Some(HotelResult::FREE_CANCELLATION.to_string());
        }

        Some(hotel)
    }
}
