//! # tripcraft tools
//!
//! Everything an agent can call while planning a trip.
//!
//! - **registry**: the `Tool` trait and the name → tool map agents share
//! - **hotels**: booking `list-by-map` search inside a geocoded bounding box
//! - **map**: Leaflet map with hotel and airport markers
//! - **search**: Tavily web search
//! - **airports**: the static airport reference table
//! - **table**: markdown tables handed back to the model
//! - **outputs**: the files written during a run

pub mod airports;
pub mod geocode;
pub mod hotels;
pub mod map;
pub mod outputs;
pub mod registry;
pub mod search;
pub mod table;

pub use airports::{Airport, AirportDirectory, AirportMarker};
pub use geocode::{BoundingBox, Geocoder};
pub use hotels::{BookingClient, HotelListing, HotelSearch, HotelSearchArgs, ALLOWED_REVIEW_WORDS};
pub use map::{color_for, rating_colors, HotelLocation, HotelMap, MapPlotter};
pub use outputs::OutputLog;
pub use registry::{Tool, ToolRegistry};
pub use search::{TavilyClient, WebSearch};
pub use table::Table;

use std::time::Duration;
use tripcraft_error::{Error, Result};

/// Timeout applied to every tool-side HTTP call
pub const TOOL_HTTP_TIMEOUT_SECS: u64 = 60;

/// Shared HTTP client for the tool services
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(TOOL_HTTP_TIMEOUT_SECS))
        .user_agent(concat!("tripcraft/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            Error::config_invalid("failed to create HTTP client")
                .with_operation("tools::http_client")
                .set_source(e)
        })
}

/// Map a reqwest failure onto the unified error
pub(crate) fn http_error(operation: &'static str, err: reqwest::Error) -> Error {
    let message = err.to_string();
    match err.status() {
        Some(status) if status.as_u16() == 429 => {
            Error::new(tripcraft_error::ErrorKind::RateLimited, message)
        }
        Some(status) => Error::network_failed(message).with_context("status", status.as_u16().to_string()),
        None => Error::network_failed(message),
    }
    .with_operation(operation)
    .set_source(err)
}
