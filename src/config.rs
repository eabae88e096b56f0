//! Process configuration
//!
//! Values come from an optional YAML file and are then overridden by
//! environment variables, so a deployment can run from the environment alone.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an optional YAML config file
pub const CONFIG_PATH_VAR: &str = "TRIP_PLANNER_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    /// Directory for rolling JSON log files; stderr logging when unset
    pub log_dir: Option<PathBuf>,
    /// IANA zone in which itinerary-local times are resolved
    pub calendar_timezone: String,
    pub http_timeout_secs: u64,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    pub oracle: OracleConfig,
    pub flights: AmadeusConfig,
    pub airports: AirLabsConfig,
}

/// Structured-output oracle (OpenAI chat completions)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Flight offer source (Amadeus)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmadeusConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

/// Nearest-airport lookup (AirLabs)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AirLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub search_radius_km: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            log_dir: None,
            calendar_timezone: "UTC".to_string(),
            http_timeout_secs: 30,
            cors_origins: Vec::new(),
            oracle: OracleConfig::default(),
            flights: AmadeusConfig::default(),
            airports: AirLabsConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: "https://test.api.amadeus.com".to_string(),
        }
    }
}

impl Default for AirLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://airlabs.co/api/v9".to_string(),
            search_radius_km: 150,
        }
    }
}

impl Config {
    /// Load the optional YAML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load using the file named by [`CONFIG_PATH_VAR`], if any.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).ok().filter(|p| !p.trim().is_empty());
        Self::load(path.as_deref().map(Path::new))
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply overrides from a variable lookup; blank values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("OPENAI_API_KEY") {
            self.oracle.api_key = v;
        }
        if let Some(v) = var("OPENAI_MODEL") {
            self.oracle.model = v;
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.oracle.base_url = v;
        }
        if let Some(v) = var("AMADEUS_CLIENT_ID") {
            self.flights.client_id = v;
        }
        if let Some(v) = var("AMADEUS_CLIENT_SECRET") {
            self.flights.client_secret = v;
        }
        if let Some(v) = var("AMADEUS_BASE_URL") {
            self.flights.base_url = v;
        }
        if let Some(v) = var("AIRLABS_API_KEY") {
            self.airports.api_key = v;
        }
        if let Some(v) = var("AIRLABS_BASE_URL") {
            self.airports.base_url = v;
        }
        if let Some(v) = var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = var("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("CALENDAR_TIMEZONE") {
            self.calendar_timezone = v;
        }
        if let Some(v) = var("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = var("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    /// Check that every external collaborator has credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.api_key.is_empty() {
            return Err(ConfigError::MissingSetting("OPENAI_API_KEY"));
        }
        if self.flights.client_id.is_empty() {
            return Err(ConfigError::MissingSetting("AMADEUS_CLIENT_ID"));
        }
        if self.flights.client_secret.is_empty() {
            return Err(ConfigError::MissingSetting("AMADEUS_CLIENT_SECRET"));
        }
        if self.airports.api_key.is_empty() {
            return Err(ConfigError::MissingSetting("AIRLABS_API_KEY"));
        }
        self.calendar_tz()?;
        Ok(())
    }

    pub fn calendar_tz(&self) -> Result<Tz, ConfigError> {
        self.calendar_timezone.parse::<Tz>().map_err(|_| ConfigError::InvalidValue {
            key: "CALENDAR_TIMEZONE",
            value: self.calendar_timezone.clone(),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
