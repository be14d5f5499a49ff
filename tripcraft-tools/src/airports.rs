//! Airport reference table

use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use tripcraft_error::{Error, ErrorKind, Result};

/// Default location of the airport table, relative to the working directory
pub const DEFAULT_AIRPORTS_PATH: &str = "data/airports.csv";

/// One row of the airport table; country and city are stored upper-cased
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Airport {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "City/Town")]
    pub city: String,
    #[serde(rename = "IATA Code", default)]
    pub iata_code: Option<String>,
    #[serde(rename = "Latitude Decimal Degrees")]
    pub latitude: f64,
    #[serde(rename = "Longitude Decimal Degrees")]
    pub longitude: f64,
    #[serde(rename = "Airport Name")]
    pub name: String,
}

/// An airport ready to be drawn, with a code that is never empty
#[derive(Debug, Clone, PartialEq)]
pub struct AirportMarker {
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: Vec<Airport>,
}

impl AirportDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::from(e)
                .with_operation("airports::load")
                .with_context("path", path.display().to_string())
        })?;
        let directory = Self::from_reader(file)?;
        debug!(path = %path.display(), airports = directory.len(), "airport table loaded");
        Ok(directory)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut airports = Vec::new();

        for (line, record) in reader.deserialize::<Airport>().enumerate() {
            let airport = record.map_err(|e| {
                Error::new(ErrorKind::ParseFailed, format!("bad airport row: {}", e))
                    .with_operation("airports::from_reader")
                    .with_context("row", (line + 1).to_string())
                    .set_source(e)
            })?;
            airports.push(airport);
        }

        Ok(Self { airports })
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Sorted, de-duplicated country names
    pub fn countries(&self) -> Vec<String> {
        self.airports
            .iter()
            .map(|a| a.country.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted, de-duplicated city names in `country` (case-insensitive)
    pub fn cities(&self, country: &str) -> Vec<String> {
        let country = country.to_uppercase();
        self.airports
            .iter()
            .filter(|a| a.country == country)
            .map(|a| a.city.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Airports in a city, in file order; missing codes become `N/A 1`, `N/A 2`, ...
    pub fn in_city(&self, country: &str, city: &str) -> Vec<AirportMarker> {
        let country = country.to_uppercase();
        let city = city.to_uppercase();
        let mut missing = 0;

        self.airports
            .iter()
            .filter(|a| a.country == country && a.city == city)
            .map(|a| {
                let code = match a.iata_code.as_deref().map(str::trim) {
                    Some(code) if !code.is_empty() => code.to_string(),
                    _ => {
                        missing += 1;
                        format!("N/A {}", missing)
                    }
                };
                AirportMarker {
                    code,
                    name: a.name.clone(),
                    latitude: a.latitude,
                    longitude: a.longitude,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Country,City/Town,IATA Code,Latitude Decimal Degrees,Longitude Decimal Degrees,Airport Name
FRANCE,PARIS,CDG,49.0097,2.5479,Charles de Gaulle
FRANCE,PARIS,,48.9694,2.4414,Le Bourget
FRANCE,PARIS,ORY,48.7262,2.3652,Orly
FRANCE,PARIS,,48.6100,2.4300,Heliport
FRANCE,NICE,NCE,43.6584,7.2159,Nice Cote d'Azur
ITALY,ROME,FCO,41.8003,12.2389,Fiumicino
";

    fn directory() -> AirportDirectory {
        AirportDirectory::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_countries_and_cities() {
        let dir = directory();
        assert_eq!(dir.len(), 6);
        assert_eq!(dir.countries(), vec!["FRANCE", "ITALY"]);
        assert_eq!(dir.cities("France"), vec!["NICE", "PARIS"]);
        assert!(dir.cities("Spain").is_empty());
    }

    #[test]
    fn test_missing_codes_are_numbered_in_order() {
        let markers = directory().in_city("France", "Paris");
        let codes: Vec<&str> = markers.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["CDG", "N/A 1", "ORY", "N/A 2"]);
        assert_eq!(markers[1].name, "Le Bourget");
    }

    #[test]
    fn test_bad_row() {
        let csv = "Country,City/Town,IATA Code,Latitude Decimal Degrees,Longitude Decimal Degrees,Airport Name\n\
                   FRANCE,PARIS,CDG,north,2.5,X\n";
        let err = AirportDirectory::from_reader(csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert_eq!(err.context_value("row"), Some("1"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AirportDirectory::load("/nonexistent/airports.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }
}
