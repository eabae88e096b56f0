//! HTTP surface
//!
//! `POST /api/itinerary` plans a trip, `POST /api/itinerary/calendar` exports
//! one as an `.ics` attachment and `GET /api/health` reports liveness.

use crate::calendar::CalendarGenerator;
use crate::planner::TripPlanner;
use crate::{Coordinates, FieldError, FlightBundle, ItineraryResult, PlannedTrip, TripError, TripRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

const PLAN_FAILURE_MESSAGE: &str = "Failed to generate itinerary";

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TripPlanner>,
    pub calendar: CalendarGenerator,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldError>),
    Internal(String),
}

impl ApiError {
    fn from_rejection(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(details) => {
                let body = Json(json!({
                    "error": "Invalid request",
                    "details": details,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                let body = Json(json!({ "error": message }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Plan-trip request body
#[derive(Debug, Deserialize)]
pub struct PlanTripBody {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub preferences: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl PlanTripBody {
    fn into_request(self) -> Result<TripRequest, ApiError> {
        let mut missing = Vec::new();
        if self.lat.is_none() {
            missing.push(FieldError::new("lat", "Latitude is required"));
        }
        if self.lng.is_none() {
            missing.push(FieldError::new("lng", "Longitude is required"));
        }

        let request = TripRequest {
            city: self.city,
            dates: self.dates,
            preferences: self.preferences,
            origin: Coordinates {
                lat: self.lat.unwrap_or_default(),
                lng: self.lng.unwrap_or_default(),
            },
        };

        let mut errors = request.field_errors();
        errors.retain(|e| !missing.iter().any(|m| m.field == e.field));
        errors.extend(missing);
        if errors.is_empty() {
            Ok(request)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Export-calendar request body
#[derive(Debug, Deserialize)]
pub struct ExportCalendarBody {
    pub itinerary: ItineraryResult,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub flights: Option<FlightBundle>,
}

impl ExportCalendarBody {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.city.trim().is_empty() {
            errors.push(FieldError::new("city", "City is required"));
        }
        if self.dates.trim().is_empty() {
            errors.push(FieldError::new("dates", "Dates are required"));
        }
        errors
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/itinerary", post(plan_trip))
        .route("/api/itinerary/calendar", post(export_calendar))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn plan_trip(
    State(state): State<AppState>,
    payload: Result<Json<PlanTripBody>, JsonRejection>,
) -> Result<Json<PlannedTrip>, ApiError> {
    let Json(body) = payload.map_err(ApiError::from_rejection)?;
    let request = body.into_request()?;

    match state.planner.plan_trip(&request).await {
        Ok(trip) => {
            info!(city = %trip.city, days = trip.itinerary.days.len(), "Plan-trip request served");
            Ok(Json(trip))
        }
        Err(TripError::Validation(message)) => {
            warn!(%message, "Plan-trip request rejected");
            Err(ApiError::Validation(vec![FieldError::new("body", message)]))
        }
        Err(e) => {
            error!(error = %e, "Plan-trip request failed");
            Err(ApiError::Internal(PLAN_FAILURE_MESSAGE.to_string()))
        }
    }
}

async fn export_calendar(
    State(state): State<AppState>,
    payload: Result<Json<ExportCalendarBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(ApiError::from_rejection)?;
    let errors = body.field_errors();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let export = state
        .calendar
        .generate(&body.itinerary, body.city.trim(), body.dates.trim(), body.flights.as_ref())
        .map_err(|e| {
            error!(error = %e, "Calendar export failed");
            ApiError::Internal(TripError::from(e).to_string())
        })?;

    let headers = [
        (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    Ok((headers, export.ics).into_response())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(city: &str, lat: Option<f64>, lng: Option<f64>) -> PlanTripBody {
        PlanTripBody {
            city: city.to_string(),
            dates: "next week".to_string(),
            preferences: None,
            lat,
            lng,
        }
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(details) => details.into_iter().map(|d| d.field).collect(),
            ApiError::Internal(message) => panic!("unexpected internal error: {}", message),
        }
    }

    #[test]
    fn test_missing_coordinates_reported_once() {
        let err = body("Paris", None, Some(2.35)).into_request().unwrap_err();
        assert_eq!(fields(err), vec!["lat"]);
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let err = body("", Some(120.0), Some(2.35)).into_request().unwrap_err();
        assert_eq!(fields(err), vec!["city", "lat"]);
    }

    #[test]
    fn test_valid_body_becomes_request() {
        let request = body("Paris", Some(48.85), Some(2.35)).into_request().unwrap();
        assert_eq!(request.origin, Coordinates { lat: 48.85, lng: 2.35 });
    }
}
