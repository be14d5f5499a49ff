//! Leaflet map of hotel options and nearby airports

use crate::airports::{AirportDirectory, AirportMarker};
use crate::outputs::OutputLog;
use crate::registry::{parse_arguments, Tool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use tripcraft_error::{Error, Result};
use tripcraft_llm::ToolDefinition;

/// File the rendered map is written to
pub const MAP_FILE: &str = "hotels_map_run.html";
pub const DEFAULT_ZOOM: u8 = 13;

const UNKNOWN_RATING_COLOR: &str = "black";
const AIRPORT_COLOR: &str = "red";

/// Marker colour for each review word
pub fn rating_colors() -> [(&'static str, &'static str); 5] {
    [
        ("Excellent", "green"),
        ("Okay", "orange"),
        ("Pleasant", "purple"),
        ("Good", "blue"),
        ("Fair", "gray"),
    ]
}

pub fn color_for(rating: &str) -> &'static str {
    rating_colors()
        .iter()
        .find(|(word, _)| *word == rating)
        .map(|(_, color)| *color)
        .unwrap_or(UNKNOWN_RATING_COLOR)
}

/// A hotel to plot; arrives from the model as `[lat, lon, name, url, rating]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(f64, f64, String, String, String)")]
pub struct HotelLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub url: String,
    pub rating: String,
}

impl From<(f64, f64, String, String, String)> for HotelLocation {
    fn from((latitude, longitude, name, url, rating): (f64, f64, String, String, String)) -> Self {
        Self {
            latitude,
            longitude,
            name,
            url,
            rating,
        }
    }
}

#[derive(Debug, Serialize)]
struct Marker {
    lat: f64,
    lng: f64,
    color: &'static str,
    icon: &'static str,
    popup: String,
}

/// A map ready to render
#[derive(Debug, Clone)]
pub struct HotelMap {
    hotels: Vec<HotelLocation>,
    airports: Vec<AirportMarker>,
    zoom: u8,
}

impl HotelMap {
    /// Fails on an empty hotel list; the centre would be undefined
    pub fn new(hotels: Vec<HotelLocation>, airports: Vec<AirportMarker>) -> Result<Self> {
        if hotels.is_empty() {
            return Err(Error::invalid_argument("no hotel locations to plot")
                .with_operation("map::new"));
        }
        Ok(Self {
            hotels,
            airports,
            zoom: DEFAULT_ZOOM,
        })
    }

    /// Mean of the hotel coordinates
    pub fn center(&self) -> (f64, f64) {
        let n = self.hotels.len() as f64;
        let lat = self.hotels.iter().map(|h| h.latitude).sum::<f64>() / n;
        let lng = self.hotels.iter().map(|h| h.longitude).sum::<f64>() / n;
        (lat, lng)
    }

    fn markers(&self) -> Vec<Marker> {
        let hotels = self.hotels.iter().map(|h| Marker {
            lat: h.latitude,
            lng: h.longitude,
            color: color_for(&h.rating),
            icon: "hotel",
            popup: format!(
                "<b>{} - Review: {}</b><br><a href='{}' target='_blank'>Booking Link</a>",
                escape_html(&h.name),
                escape_html(&h.rating),
                escape_html(&h.url)
            ),
        });

        let airports = self.airports.iter().map(|a| Marker {
            lat: a.latitude,
            lng: a.longitude,
            color: AIRPORT_COLOR,
            icon: "plane",
            popup: format!("Airport: {} - {}", escape_html(&a.name), escape_html(&a.code)),
        });

        hotels.chain(airports).collect()
    }

    pub fn to_html(&self) -> Result<String> {
        let markers = serde_json::to_string(&self.markers()).map_err(|e| {
            Error::serialization_failed("failed to encode map markers")
                .with_operation("map::to_html")
                .set_source(e)
        })?;
        let (lat, lng) = self.center();

        Ok(TEMPLATE
            .replace("__CENTER__", &format!("[{}, {}]", lat, lng))
            .replace("__ZOOM__", &self.zoom.to_string())
            .replace("__MARKERS__", &markers.replace("</", "<\\/")))
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.2.0/css/all.min.css">
<script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map("map").setView(__CENTER__, __ZOOM__);
L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);
var markers = __MARKERS__;
markers.forEach(function (m) {
  var icon = L.AwesomeMarkers.icon({ icon: m.icon, prefix: "fa", markerColor: m.color });
  L.marker([m.lat, m.lng], { icon: icon }).bindPopup(m.popup).addTo(map);
});
</script>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
struct PlotArgs {
    city_name: String,
    country_name: String,
    locations: Vec<HotelLocation>,
}

/// The `plot_hotels_on_map` tool
#[derive(Debug, Clone)]
pub struct MapPlotter {
    airports_path: PathBuf,
    output_dir: PathBuf,
    outputs: OutputLog,
}

impl MapPlotter {
    pub fn new(airports_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            airports_path: airports_path.into(),
            output_dir: output_dir.into(),
            outputs: OutputLog::new(),
        }
    }

    /// Record written maps in `outputs`
    pub fn with_outputs(mut self, outputs: OutputLog) -> Self {
        self.outputs = outputs;
        self
    }

    /// Render the map to `hotels_map_run.html` and return the path written
    pub fn plot(&self, city: &str, country: &str, hotels: Vec<HotelLocation>) -> Result<PathBuf> {
        if hotels.is_empty() {
            return Err(Error::invalid_argument("no hotel locations to plot")
                .with_operation("map::plot")
                .with_context("city", city.to_string()));
        }

        let airports = AirportDirectory::load(&self.airports_path)?.in_city(country, city);
        let html = HotelMap::new(hotels, airports)?.to_html()?;

        let path = self.output_dir.join(MAP_FILE);
        std::fs::write(&path, html).map_err(|e| {
            Error::from(e)
                .with_operation("map::plot")
                .with_context("path", path.display().to_string())
        })?;

        info!(city, path = %path.display(), "hotel map written");
        self.outputs.record(&path);
        Ok(path)
    }
}

#[async_trait]
impl Tool for MapPlotter {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "plot_hotels_on_map",
            "Plots hotel locations and the airports of the city on an interactive map",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "city_name": { "type": "string", "description": "String with the city name" },
                "country_name": { "type": "string", "description": "String with the country name" },
                "locations": {
                    "type": "array",
                    "description": "List of tuples containing latitude, longitude, name of hotel, \
                                    hotel link, review_score_word. Example: locations = \
                                    [[9.0, -84.0, \"HOTEL NAME\", \"HOTEL_URL\", \"HOTEL_RATING\"], ...]",
                    "items": {
                        "type": "array",
                        "prefixItems": [
                            { "type": "number" },
                            { "type": "number" },
                            { "type": "string" },
                            { "type": "string" },
                            { "type": "string" }
                        ],
                        "minItems": 5,
                        "maxItems": 5
                    }
                }
            },
            "required": ["city_name", "country_name", "locations"]
        }))
    }

    async fn invoke(&self, arguments: &str) -> Result<String> {
        let args: PlotArgs = parse_arguments("plot_hotels_on_map", arguments)?;
        self.plot(&args.city_name, &args.country_name, args.locations)?;
        Ok(format!(
            "SUCCESS: Hotel options have been successfully plotted on a map. Corresponding city: {}",
            args.city_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripcraft_error::ErrorKind;

    const AIRPORTS: &str = "\
Country,City/Town,IATA Code,Latitude Decimal Degrees,Longitude Decimal Degrees,Airport Name
FRANCE,PARIS,CDG,49.0097,2.5479,Charles de Gaulle
FRANCE,PARIS,,48.9694,2.4414,Le Bourget
ITALY,ROME,FCO,41.8003,12.2389,Fiumicino
";

    fn hotel(lat: f64, lng: f64, name: &str, rating: &str) -> HotelLocation {
        (lat, lng, name.to_string(), "https://booking.example/h".to_string(), rating.to_string()).into()
    }

    #[test]
    fn test_rating_colors_are_fixed() {
        let colors = rating_colors();
        assert_eq!(colors.len(), 5);
        assert_eq!(color_for("Excellent"), "green");
        assert_eq!(color_for("Fair"), "gray");
        assert_eq!(color_for("Superb"), "black");
        assert_eq!(rating_colors(), colors);
    }

    #[test]
    fn test_locations_from_model_arrays() {
        let args: PlotArgs = parse_arguments(
            "plot_hotels_on_map",
            r#"{"city_name":"Paris","country_name":"France",
                "locations":[[48.85, 2.32, "Lutetia", "https://b/l", "Excellent"]]}"#,
        )
        .unwrap();
        assert_eq!(args.locations[0].name, "Lutetia");
        assert_eq!(args.locations[0].rating, "Excellent");
    }

    #[test]
    fn test_center_and_html() {
        let map = HotelMap::new(
            vec![hotel(48.0, 2.0, "A <b>", "Good"), hotel(50.0, 4.0, "B</script>", "Superb")],
            vec![],
        )
        .unwrap();
        assert_eq!(map.center(), (49.0, 3.0));

        let html = map.to_html().unwrap();
        assert!(html.contains("setView([49, 3], 13)"));
        assert!(html.contains("A &lt;b&gt;"));
        assert!(!html.contains("B</script>"));
        assert!(html.contains(r#""color":"blue""#));
        assert!(html.contains(r#""color":"black""#));
    }

    #[test]
    fn test_empty_locations_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = MapPlotter::new(dir.path().join("airports.csv"), dir.path());

        let outputs = OutputLog::new();
        let plotter = plotter.with_outputs(outputs.clone());

        let err = plotter.plot("Paris", "France", vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!dir.path().join(MAP_FILE).exists());
        assert!(outputs.paths().is_empty());
    }

    #[tokio::test]
    async fn test_plot_tool_writes_map() {
        let dir = tempfile::tempdir().unwrap();
        let airports = dir.path().join("airports.csv");
        std::fs::write(&airports, AIRPORTS).unwrap();
        let outputs = OutputLog::new();
        let plotter = MapPlotter::new(&airports, dir.path()).with_outputs(outputs.clone());

        let out = plotter
            .invoke(r#"{"city_name":"Paris","country_name":"France",
                        "locations":[[48.85, 2.32, "Lutetia", "https://b/l", "Excellent"]]}"#)
            .await
            .unwrap();

        assert_eq!(
            out,
            "SUCCESS: Hotel options have been successfully plotted on a map. Corresponding city: Paris"
        );
        let html = std::fs::read_to_string(dir.path().join(MAP_FILE)).unwrap();
        assert!(html.contains("Charles de Gaulle - CDG"));
        assert!(html.contains("Le Bourget - N/A 1"));
        assert!(!html.contains("Fiumicino"));
        assert!(html.contains(r#""color":"red""#));
        assert_eq!(outputs.paths(), vec![dir.path().join(MAP_FILE)]);
    }
}
