pub mod api;
pub mod booking;
pub mod extract;
pub mod hotels_com;
pub mod priceline;
pub mod traits;

pub use api::{ApiAdapter, ProviderApi};
pub use booking::{BookingAdapter, BookingApi};
pub use hotels_com::{HotelsComAdapter, HotelsComApi};
pub use priceline::{PricelineAdapter, PricelineApi};
pub use traits::{PlatformAdapter, ProviderError};
