//! Hotel search against the booking `list-by-map` endpoint

use crate::geocode::{BoundingBox, Geocoder};
use crate::http_error;
use crate::outputs::OutputLog;
use crate::registry::{parse_arguments, Tool};
use crate::table::Table;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use tripcraft_error::{Error, Result};
use tripcraft_llm::ToolDefinition;

pub const LIST_BY_MAP_URL: &str = "https://apidojo-booking-v1.p.rapidapi.com/properties/list-by-map";
const RAPIDAPI_HOST: &str = "apidojo-booking-v1.p.rapidapi.com";

/// Review words a listing must carry to be shown
pub const ALLOWED_REVIEW_WORDS: [&str; 5] = ["Excellent", "Good", "Pleasant", "Okay", "Fair"];

/// Columns of the table returned to the model
const TABLE_COLUMNS: [&str; 9] = [
    "latitude", "longitude", "url", "hotel_name", "address",
    "review_score_word", "checkin", "checkout", "All-Inclusive-Price",
];

/// File the unfiltered listings are written to
pub const BOOKING_OPTIONS_FILE: &str = "booking_options.csv";

/// Arguments the model passes to `get_list_of_locations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelSearchArgs {
    pub city_name: String,
    pub country_name: String,
    pub travel_purpose: String,
    pub arrival_date: String,
    pub departure_date: String,
    #[serde(default)]
    pub children_qty: u32,
    #[serde(default)]
    pub children_age: String,
    pub guest_qty: u32,
    pub room_qty: u32,
}

impl HotelSearchArgs {
    /// Query string for `list-by-map`; children fields are blank without children
    pub fn query_params(&self, bbox: &BoundingBox) -> Vec<(&'static str, String)> {
        let (children_qty, children_age) = if self.children_qty == 0 {
            (String::new(), String::new())
        } else {
            (self.children_qty.to_string(), self.children_age.clone())
        };

        vec![
            ("search_id", "none".to_string()),
            ("children_age", children_age),
            ("price_filter_currencycode", "USD".to_string()),
            ("languagecode", "en-us".to_string()),
            ("travel_purpose", self.travel_purpose.clone()),
            ("categories_filter", "class::1,class::2,class::3".to_string()),
            ("children_qty", children_qty),
            ("order_by", "popularity".to_string()),
            ("guest_qty", self.guest_qty.to_string()),
            ("room_qty", self.room_qty.to_string()),
            ("departure_date", self.departure_date.clone()),
            ("bbox", bbox.to_query()),
            ("arrival_date", self.arrival_date.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub all_inclusive_price: Option<f64>,
}

/// One property from the `result` array; any field may be absent or null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelListing {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub review_score_word: Option<String>,
    #[serde(default)]
    pub checkin: serde_json::Value,
    #[serde(default)]
    pub checkout: serde_json::Value,
    #[serde(default)]
    pub price_breakdown: Option<PriceBreakdown>,
}

impl HotelListing {
    /// `"USD 412.5"`, or empty when the listing carries no full price
    pub fn all_inclusive_price(&self) -> String {
        match &self.price_breakdown {
            Some(PriceBreakdown {
                currency: Some(currency),
                all_inclusive_price: Some(amount),
            }) => format!("{} {}", currency, amount),
            _ => String::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.review_score_word
            .as_deref()
            .is_some_and(|w| ALLOWED_REVIEW_WORDS.contains(&w))
    }

    fn cells(&self) -> Vec<String> {
        let coordinate = |c: Option<f64>| c.map(|v| v.to_string()).unwrap_or_default();
        vec![
            coordinate(self.latitude),
            coordinate(self.longitude),
            self.url.clone().unwrap_or_default(),
            self.hotel_name.clone().unwrap_or_default(),
            self.address.clone().unwrap_or_default(),
            self.review_score_word.clone().unwrap_or_default(),
            value_cell(&self.checkin),
            value_cell(&self.checkout),
            self.all_inclusive_price(),
        ]
    }
}

fn value_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull the listings out of a `list-by-map` payload
pub fn parse_listings(payload: &serde_json::Value) -> Result<Vec<HotelListing>> {
    let result = payload.get("result").cloned().ok_or_else(|| {
        Error::parse_failed("booking response has no 'result' field")
            .with_operation("hotels::parse_listings")
    })?;

    serde_json::from_value(result).map_err(|e| {
        Error::parse_failed(format!("malformed booking listings: {}", e))
            .with_operation("hotels::parse_listings")
            .set_source(e)
    })
}

/// Grid table of the listings whose review word is allowed
pub fn listings_table(listings: &[HotelListing]) -> Table {
    let mut table = Table::new(TABLE_COLUMNS);
    for listing in listings.iter().filter(|l| l.is_allowed()) {
        table.push_row(listing.cells());
    }
    table
}

/// Write every listing, filtered or not, for later inspection
pub fn save_listings(listings: &[HotelListing], path: &Path) -> Result<()> {
    let csv_error = |e: csv::Error| {
        Error::new(tripcraft_error::ErrorKind::IoFailed, format!("failed to write {}: {}", path.display(), e))
            .with_operation("hotels::save_listings")
            .set_source(e)
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    let mut header: Vec<&str> = TABLE_COLUMNS[..8].to_vec();
    header.push("price_breakdown");
    header.push("All-Inclusive-Price");
    writer.write_record(&header).map_err(csv_error)?;

    for listing in listings {
        let mut record = listing.cells();
        let price = record.pop().unwrap_or_default();
        record.push(
            listing
                .price_breakdown
                .as_ref()
                .and_then(|p| serde_json::to_string(p).ok())
                .unwrap_or_default(),
        );
        record.push(price);
        writer.write_record(&record).map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// RapidAPI client for the booking endpoint
#[derive(Debug, Clone)]
pub struct BookingClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl BookingClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            url: LIST_BY_MAP_URL.to_string(),
        }
    }

    pub async fn list_by_map(&self, params: &[(&'static str, String)]) -> Result<serde_json::Value> {
        self.client
            .get(&self.url)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .header("x-rapidapi-key", &self.api_key)
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("hotels::list_by_map", e))?
            .json()
            .await
            .map_err(|e| http_error("hotels::list_by_map", e))
    }
}

/// The `get_list_of_locations` tool
pub struct HotelSearch {
    booking: BookingClient,
    geocoder: Geocoder,
    output_dir: PathBuf,
    outputs: OutputLog,
}

impl HotelSearch {
    pub fn new(booking: BookingClient, geocoder: Geocoder, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            booking,
            geocoder,
            output_dir: output_dir.into(),
            outputs: OutputLog::new(),
        }
    }

    /// Record the saved CSV in `outputs`
    pub fn with_outputs(mut self, outputs: OutputLog) -> Self {
        self.outputs = outputs;
        self
    }

    pub async fn search(&self, args: &HotelSearchArgs) -> Result<String> {
        let bbox = self.geocoder.city_bbox(&args.city_name, &args.country_name).await?;
        let payload = self.booking.list_by_map(&args.query_params(&bbox)).await?;
        self.report(&args.city_name, &parse_listings(&payload)?)
    }

    /// Save every listing, then return the table of the allowed ones
    pub fn report(&self, city: &str, listings: &[HotelListing]) -> Result<String> {
        let csv_path = self.output_dir.join(BOOKING_OPTIONS_FILE);
        save_listings(listings, &csv_path).map_err(|e| e.with_context("city", city.to_string()))?;
        self.outputs.record(&csv_path);

        let table = listings_table(listings);
        info!(city, found = listings.len(), kept = table.len(), "hotel search finished");
        Ok(table.to_grid())
    }
}

#[async_trait]
impl Tool for HotelSearch {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_list_of_locations",
            "Retrieves a list of locations (e.g., hotels) within a city for given arrival and \
             departure dates, and returns the data as a Markdown table including latitude, \
             longitude, hotel name, address, and review score",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "city_name": { "type": "string", "description": "Name of the city" },
                "country_name": { "type": "string", "description": "Name of the country" },
                "travel_purpose": {
                    "type": "string",
                    "enum": ["leisure", "business"],
                    "description": "Travel purpose. Can be either leisure or business"
                },
                "arrival_date": { "type": "string", "description": "Arrival date (Year-Month-Day)" },
                "departure_date": { "type": "string", "description": "Departure date (Year-Month-Day)" },
                "children_qty": { "type": "integer", "description": "Quantity of children travelling" },
                "children_age": {
                    "type": "string",
                    "description": "Ages of each child separated with comma. E.g: 5,7"
                },
                "guest_qty": { "type": "integer", "description": "Quantity of guests" },
                "room_qty": { "type": "integer", "description": "Quantity of rooms" }
            },
            "required": [
                "city_name", "country_name", "travel_purpose", "arrival_date",
                "departure_date", "children_qty", "children_age", "guest_qty", "room_qty"
            ]
        }))
    }

    async fn invoke(&self, arguments: &str) -> Result<String> {
        let args: HotelSearchArgs = parse_arguments("get_list_of_locations", arguments)?;
        self.search(&args).await
    }
}
