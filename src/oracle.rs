//! Structured-output oracle
//!
//! Date/city normalization and itinerary generation are both requests to a
//! structured-generation service whose answer must match a fixed JSON schema.
//! [`TripOracle`] is the contract; [`OpenAiOracle`] implements it with
//! schema-constrained chat completions.

use crate::config::OracleConfig;
use crate::{ItineraryDay, TripDates};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Oracle API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Oracle output did not match schema: {0}")]
    SchemaMismatch(#[from] serde_json::Error),

    #[error("Oracle refused the request: {0}")]
    Refused(String),

    #[error("Oracle returned no content")]
    EmptyResponse,
}

/// Input for date/city normalization
#[derive(Debug, Clone, PartialEq)]
pub struct DateNormalizationRequest {
    pub destination: String,
    pub date_range: String,
    pub today: NaiveDate,
}

/// Arrival/return context given to the itinerary generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItineraryContext {
    pub arrival_airport: String,
    pub arrival_time: String,
    pub return_airport: String,
    pub return_time: String,
}

/// Input for itinerary generation
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryPrompt {
    pub destination: String,
    pub date_range: String,
    pub preferences: Option<String>,
    pub today: NaiveDate,
    pub context: ItineraryContext,
}

/// Structured-output generation service
#[async_trait]
pub trait TripOracle: Send + Sync {
    /// Normalize a free-text destination and date range.
    async fn normalize_trip_dates(&self, request: &DateNormalizationRequest) -> Result<TripDates, OracleError>;

    /// Generate the day-by-day plan.
    async fn generate_itinerary(&self, prompt: &ItineraryPrompt) -> Result<Vec<ItineraryDay>, OracleError>;
}

const DATES_SYSTEM_PROMPT: &str = "You convert loose travel requests into exact trip dates and airports. \
Resolve relative expressions against the given current date. Use the main international airport of each city.";

const ITINERARY_SYSTEM_PROMPT: &str = "You are a travel planner. Build realistic day-by-day itineraries. \
Every activity needs a concrete location and a duration of at least one hour. \
Number days sequentially from 1 and use ISO dates (YYYY-MM-DD).";

pub fn date_normalization_prompt(request: &DateNormalizationRequest) -> String {
    format!(
        "Today is {today}.\n\
         Destination: {destination}\n\
         Requested dates: {dates}\n\n\
         Return the arrival city and date at the destination and the city and date the traveler leaves from \
         at the end of the trip, each city with its short name and 3-letter IATA airport code.",
        today = request.today.format("%Y-%m-%d"),
        destination = request.destination,
        dates = request.date_range,
    )
}

pub fn itinerary_prompt(prompt: &ItineraryPrompt) -> String {
    let mut text = format!(
        "Today is {today}.\n\
         Plan a trip to {destination} for {dates}.\n\
         The traveler arrives at {arrival_airport} at {arrival_time} and departs from {return_airport} \
         at {return_time}. Keep the first and last day light around those times.\n",
        today = prompt.today.format("%Y-%m-%d"),
        destination = prompt.destination,
        dates = prompt.date_range,
        arrival_airport = prompt.context.arrival_airport,
        arrival_time = prompt.context.arrival_time,
        return_airport = prompt.context.return_airport,
        return_time = prompt.context.return_time,
    );
    if let Some(preferences) = &prompt.preferences {
        text.push_str(&format!("Traveler preferences: {}\n", preferences));
    }
    text.push_str("Give each day morning, afternoon and evening activities; a slot may be an empty list.");
    text
}

fn airport_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "shortName": {"type": "string"},
            "iataCode": {"type": "string"}
        },
        "required": ["shortName", "iataCode"],
        "additionalProperties": false
    })
}

pub fn trip_dates_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "arrivalCity": airport_schema(),
            "arrivalDate": {"type": "string"},
            "returnCity": airport_schema(),
            "returnDate": {"type": "string"}
        },
        "required": ["arrivalCity", "arrivalDate", "returnCity", "returnDate"],
        "additionalProperties": false
    })
}

pub fn itinerary_schema() -> Value {
    let activities = json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "activity": {"type": "string"},
                "location": {"type": "string"},
                "durationInHours": {"type": "number"}
            },
            "required": ["activity", "location", "durationInHours"],
            "additionalProperties": false
        }
    });

    json!({
        "type": "object",
        "properties": {
            "days": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "dayDate": {"type": "string"},
                        "dayNumber": {"type": "integer"},
                        "morning": activities,
                        "afternoon": activities,
                        "evening": activities
                    },
                    "required": ["dayDate", "dayNumber", "morning", "afternoon", "evening"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["days"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
struct GeneratedItinerary {
    days: Vec<ItineraryDay>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Parse the first choice of a chat completion as schema-shaped JSON.
fn parse_structured_content<T: DeserializeOwned>(completion: ChatCompletion) -> Result<T, OracleError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .ok_or(OracleError::EmptyResponse)?
        .message;

    if let Some(refusal) = message.refusal {
        return Err(OracleError::Refused(refusal));
    }
    let content = message.content.filter(|c| !c.trim().is_empty()).ok_or(OracleError::EmptyResponse)?;
    Ok(serde_json::from_str(&content)?)
}

/// OpenAI-compatible structured output client
pub struct OpenAiOracle {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiOracle {
    pub fn new(config: &OracleConfig, timeout: Duration) -> Result<Self, OracleError> {
        debug!(model = %config.model, "Creating oracle client");
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_request_body(&self, schema_name: &str, schema: Value, system_prompt: &str, user_prompt: String) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema
                }
            }
        })
    }

    async fn structured_completion<T: DeserializeOwned>(
        &self,
        schema_name: &str,
        schema: Value,
        system_prompt: &str,
        user_prompt: String,
    ) -> Result<T, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(schema_name, schema, system_prompt, user_prompt);

        let start_time = std::time::Instant::now();
        let response = self.http.post(&url).bearer_auth(&self.api_key).json(&body).send().await?;
        let status = response.status();
        info!(
            schema = schema_name,
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Oracle request completed"
        );

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, schema = schema_name, "Oracle request failed");
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        parse_structured_content(completion)
    }
}

#[async_trait]
impl TripOracle for OpenAiOracle {
    #[instrument(level = "info", skip(self))]
    async fn normalize_trip_dates(&self, request: &DateNormalizationRequest) -> Result<TripDates, OracleError> {
        self.structured_completion(
            "trip_dates",
            trip_dates_schema(),
            DATES_SYSTEM_PROMPT,
            date_normalization_prompt(request),
        )
        .await
    }

    #[instrument(level = "info", skip(self, prompt), fields(destination = %prompt.destination))]
    async fn generate_itinerary(&self, prompt: &ItineraryPrompt) -> Result<Vec<ItineraryDay>, OracleError> {
        let generated: GeneratedItinerary = self
            .structured_completion(
                "itinerary",
                itinerary_schema(),
                ITINERARY_SYSTEM_PROMPT,
                itinerary_prompt(prompt),
            )
            .await?;
        debug!(days = generated.days.len(), "Itinerary generated");
        Ok(generated.days)
    }
}
