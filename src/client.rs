//! HTTP client for the flight offer source
//!
//! Offers are fetched from the Amadeus Self-Service `flight-offers` API. The
//! response model below keeps only the fields the flight search adapter reads.

use crate::config::AmadeusConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Error types for flight offer lookups
#[derive(Error, Debug)]
pub enum FlightSearchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Flight offer API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication with flight offer source failed: {0}")]
    AuthError(String),

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("No flight offers found for {origin} -> {destination}")]
    NoOffers { origin: String, destination: String },

    #[error("Malformed flight offer: {0}")]
    MalformedOffer(String),
}

/// Round-trip query sent to the offer source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferQuery {
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub departure_date: String,
    /// `YYYY-MM-DD`
    pub return_date: String,
    pub adults: u8,
}

/// Flight offers response, in source order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub data: Vec<FlightOffer>,
    #[serde(default)]
    pub dictionaries: Option<OfferDictionaries>,
}

/// Lookup tables bundled with an offers response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferDictionaries {
    /// Carrier code to carrier display name
    #[serde(default)]
    pub carriers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightOffer {
    #[serde(default)]
    pub itineraries: Vec<OfferItinerary>,
    pub price: OfferPrice,
}

/// One direction of an offer
#[derive(Debug, Clone, Deserialize)]
pub struct OfferItinerary {
    /// ISO-8601 duration such as `PT9H10M`
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<OfferSegment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSegment {
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
    pub carrier_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    pub iata_code: String,
    /// Local ISO timestamp, e.g. `2024-12-15T10:30:00`
    pub at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferPrice {
    pub total: String,
    pub currency: String,
}

/// Source of flight offers
#[async_trait]
pub trait FlightOfferSource: Send + Sync {
    async fn search_offers(&self, query: &OfferQuery) -> Result<FlightOffersResponse, FlightSearchError>;
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Amadeus flight offers client
pub struct AmadeusClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl AmadeusClient {
    /// Create a new flight offers client
    pub fn new(config: &AmadeusConfig, timeout: Duration) -> Result<Self, FlightSearchError> {
        debug!(base_url = %config.base_url, "Creating flight offers client");
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Exchange the client credentials for a bearer token.
    async fn access_token(&self) -> Result<String, FlightSearchError> {
        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Token request rejected");
            return Err(FlightSearchError::AuthError(format!("status {}: {}", status, body)));
        }

        let token: AccessToken = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl FlightOfferSource for AmadeusClient {
    #[instrument(level = "info", skip(self))]
    async fn search_offers(&self, query: &OfferQuery) -> Result<FlightOffersResponse, FlightSearchError> {
        let token = self.access_token().await?;
        let url = format!("{}/v2/shopping/flight-offers", self.base_url);
        let adults = query.adults.to_string();

        info!("Requesting flight offers");
        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", query.origin.as_str()),
                ("destinationLocationCode", query.destination.as_str()),
                ("departureDate", query.departure_date.as_str()),
                ("returnDate", query.return_date.as_str()),
                ("adults", adults.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Flight offers request completed"
        );

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, "Flight offers request failed");
            return Err(FlightSearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let offers: FlightOffersResponse = response.json().await?;
        debug!(offers_found = offers.data.len(), "Parsed flight offers response");
        Ok(offers)
    }
}
