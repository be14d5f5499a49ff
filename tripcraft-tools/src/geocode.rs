//! Nominatim geocoding - city name to bounding box

use crate::http_error;
use serde::Deserialize;
use tracing::debug;
use tripcraft_error::{Error, Result};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Geographic bounding box in the order Nominatim reports it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// `south,north,west,east`, the form the booking `bbox` parameter takes
    pub fn to_query(&self) -> String {
        format!("{},{},{},{}", self.south, self.north, self.west, self.east)
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    boundingbox: Vec<String>,
}

/// Parse a Nominatim search response; `None` when nothing matched
pub fn parse_search_response(body: &str) -> Result<Option<BoundingBox>> {
    let places: Vec<Place> = serde_json::from_str(body).map_err(|e| {
        Error::parse_failed(format!("malformed geocoding response: {}", e))
            .with_operation("geocode::parse")
            .set_source(e)
    })?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    if place.boundingbox.len() != 4 {
        return Err(Error::parse_failed(format!(
            "expected 4 bounding box values, got {}",
            place.boundingbox.len()
        ))
        .with_operation("geocode::parse"));
    }

    let mut values = [0f64; 4];
    for (slot, raw) in values.iter_mut().zip(&place.boundingbox) {
        *slot = raw.trim().parse().map_err(|_| {
            Error::parse_failed(format!("bounding box value '{}' is not a number", raw))
                .with_operation("geocode::parse")
        })?;
    }

    Ok(Some(BoundingBox {
        south: values[0],
        north: values[1],
        west: values[2],
        east: values[3],
    }))
}

/// Client for the Nominatim search endpoint
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: NOMINATIM_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bounding box for `"{city}, {country}"`
    pub async fn city_bbox(&self, city: &str, country: &str) -> Result<BoundingBox> {
        let place = format!("{}, {}", city, country);
        debug!(%place, "geocoding");

        let body = self
            .client
            .get(&self.base_url)
            .query(&[("q", place.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("geocode::city_bbox", e))?
            .text()
            .await
            .map_err(|e| http_error("geocode::city_bbox", e))?;

        parse_search_response(&body)
            .map_err(|e| e.with_operation("geocode::city_bbox"))?
            .ok_or_else(|| Error::geocode_not_found(place).with_operation("geocode::city_bbox"))
    }
}
