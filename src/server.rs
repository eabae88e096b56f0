// src/server.rs

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use trip_planner::api::{self, AppState};
use trip_planner::{
    logging, AirLabsClient, AmadeusClient, CalendarGenerator, Config, OpenAiOracle, TripPlanner,
};

/// Parse configured origins, logging and skipping any that are not valid header values.
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "CORS: ignoring malformed origin");
                None
            }
        })
        .collect()
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        warn!("CORS: no origins configured, allowing any origin");
        return CorsLayer::permissive();
    }

    info!(origins = ?config.cors_origins, "CORS: restricting to configured origins");
    CorsLayer::new()
        .allow_origin(parse_origins(&config.cors_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging before anything else
    if let Err(e) = logging::init_logging(config.log_dir.as_deref(), "trip-planner-server") {
        eprintln!("Failed to initialize logging: {}", e);
    }

    config.validate()?;
    let timeout = config.http_timeout();

    let oracle = Arc::new(OpenAiOracle::new(&config.oracle, timeout)?);
    let airports = Arc::new(AirLabsClient::new(&config.airports, timeout)?);
    let offers = Arc::new(AmadeusClient::new(&config.flights, timeout)?);
    let calendar = CalendarGenerator::new(config.calendar_tz()?);
    info!(timezone = %calendar.timezone(), model = %config.oracle.model, "Clients initialized");

    let state = AppState {
        planner: Arc::new(TripPlanner::new(oracle, airports, offers)),
        calendar,
    };
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Trip planner server listening");

    axum::serve(listener, app).await?;

    info!("Trip planner server shutting down");
    Ok(())
}
