//! Nearest-airport resolution
//!
//! This module queries the AirLabs `nearby` endpoint to find the airport
//! closest to the traveler's coordinates.

use crate::config::AirLabsConfig;
use crate::{is_iata_code, Airport, Coordinates};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Airport lookup error types
#[derive(Error, Debug)]
pub enum AirportLookupError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Airport lookup API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("No airport found near ({lat}, {lng})")]
    NoAirportFound { lat: f64, lng: f64 },

    #[error("No IATA code for nearest airport: {0}")]
    MissingIataCode(String),
}

/// Resolves coordinates to the nearest airport with an IATA code
#[async_trait]
pub trait AirportResolver: Send + Sync {
    async fn nearest_airport(&self, origin: Coordinates) -> Result<Airport, AirportLookupError>;
}

/// Airport entry of a `nearby` response
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyAirport {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iata_code: Option<String>,
    /// Distance from the query point in kilometers
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    response: Option<NearbyResults>,
    #[serde(default)]
    error: Option<NearbyError>,
}

#[derive(Debug, Default, Deserialize)]
struct NearbyResults {
    #[serde(default)]
    airports: Vec<NearbyAirport>,
}

#[derive(Debug, Deserialize)]
struct NearbyError {
    #[serde(default)]
    message: String,
}

/// AirLabs nearest-airport client
pub struct AirLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    search_radius_km: u32,
}

impl AirLabsClient {
    /// Create a new airport lookup client
    pub fn new(config: &AirLabsConfig, timeout: Duration) -> Result<Self, AirportLookupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            search_radius_km: config.search_radius_km,
        })
    }

    async fn fetch_nearby(&self, origin: Coordinates) -> Result<Vec<NearbyAirport>, AirportLookupError> {
        let url = format!("{}/nearby", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", origin.lat.to_string()),
                ("lng", origin.lng.to_string()),
                ("distance", self.search_radius_km.to_string()),
                ("api_key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AirportLookupError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: NearbyResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(AirportLookupError::ApiError {
                status: status.as_u16(),
                message: error.message,
            });
        }

        Ok(body.response.unwrap_or_default().airports)
    }
}

#[async_trait]
impl AirportResolver for AirLabsClient {
    #[instrument(level = "info", skip(self))]
    async fn nearest_airport(&self, origin: Coordinates) -> Result<Airport, AirportLookupError> {
        let candidates = self.fetch_nearby(origin).await?;
        debug!(candidates = candidates.len(), "Fetched nearby airports");

        let airport = select_nearest(origin, candidates)?;
        info!(iata = %airport.iata_code, name = %airport.short_name, "Resolved departure airport");
        Ok(airport)
    }
}

/// Pick the closest candidate that carries a valid IATA code.
///
/// Candidates without a distance sort last.
pub fn select_nearest(origin: Coordinates, mut candidates: Vec<NearbyAirport>) -> Result<Airport, AirportLookupError> {
    if candidates.is_empty() {
        return Err(AirportLookupError::NoAirportFound {
            lat: origin.lat,
            lng: origin.lng,
        });
    }
    candidates.sort_by(|a, b| {
        a.distance
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance.unwrap_or(f64::INFINITY))
    });

    let nearest_name = candidates[0].name.clone();
    candidates
        .into_iter()
        .map(|c| Airport::new(c.name, c.iata_code.as_deref().unwrap_or_default()))
        .find(|airport| is_iata_code(&airport.iata_code))
        .ok_or(AirportLookupError::MissingIataCode(nearest_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coordinates = Coordinates { lat: 51.47, lng: -0.45 };

    fn candidate(name: &str, iata: Option<&str>, distance: Option<f64>) -> NearbyAirport {
        NearbyAirport {
            name: name.to_string(),
            iata_code: iata.map(str::to_string),
            distance,
        }
    }

    #[test]
    fn test_selects_closest_airport() {
        let airport = select_nearest(
            ORIGIN,
            vec![
                candidate("London Gatwick", Some("LGW"), Some(40.2)),
                candidate("London Heathrow", Some("lhr"), Some(1.3)),
                candidate("Unknown", Some("XXX"), None),
            ],
        )
        .unwrap();
        assert_eq!(airport, Airport::new("London Heathrow", "LHR"));
    }

    #[test]
    fn test_skips_candidates_without_iata() {
        let airport = select_nearest(
            ORIGIN,
            vec![
                candidate("RAF Northolt", None, Some(2.0)),
                candidate("Denham Aerodrome", Some(""), Some(3.0)),
                candidate("London Heathrow", Some("LHR"), Some(10.0)),
            ],
        )
        .unwrap();
        assert_eq!(airport.iata_code, "LHR");
    }

    #[test]
    fn test_no_candidates() {
        assert!(matches!(
            select_nearest(ORIGIN, vec![]),
            Err(AirportLookupError::NoAirportFound { .. })
        ));
        assert!(matches!(
            select_nearest(ORIGIN, vec![candidate("Helipad", None, Some(0.5))]),
            Err(AirportLookupError::MissingIataCode(name)) if name == "Helipad"
        ));
    }

    #[test]
    fn test_parse_nearby_response() {
        let body: NearbyResponse = serde_json::from_str(
            r#"{"request": {}, "response": {
                "airports": [{"name": "London Heathrow Airport", "iata_code": "LHR", "icao_code": "EGLL",
                              "lat": 51.47, "lng": -0.45, "distance": 1.12, "popularity": 250}],
                "cities": []}}"#,
        )
        .unwrap();
        let airports = body.response.unwrap().airports;
        assert_eq!(airports[0].iata_code.as_deref(), Some("LHR"));

        let error: NearbyResponse =
            serde_json::from_str(r#"{"error": {"message": "Unknown api_key", "code": "unknown_api_key"}}"#).unwrap();
        assert_eq!(error.error.unwrap().message, "Unknown api_key");
    }
}
