// Session and provider configuration, with defaults and environment overrides

use crate::normalizer::NormalizerConfig;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub results_ttl: Duration,
    pub params_ttl: Duration,
    pub request_timeout: Duration,
    pub normalizer: NormalizerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            results_ttl: Duration::from_secs(3600),
            params_ttl: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(30),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `SEARCH_RESULTS_TTL_SECS`, `SEARCH_PARAMS_TTL_SECS`,
    /// `SEARCH_TIMEOUT_MS` and `SEARCH_CURRENCY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = parse_number(&lookup, "SEARCH_RESULTS_TTL_SECS")? {
            config.results_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, "SEARCH_PARAMS_TTL_SECS")? {
            config.params_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_number(&lookup, "SEARCH_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(currency) = lookup("SEARCH_CURRENCY").filter(|c| !c.trim().is_empty()) {
            let currency = currency.trim();
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid {
                    name: "SEARCH_CURRENCY",
                    value: currency.to_string(),
                });
            }
            config.normalizer.default_currency = currency.to_ascii_uppercase();
        }
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub amadeus_base_url: String,
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<String>,
    // Pre-issued bearer token; skips the client-credentials exchange when set
    pub amadeus_access_token: Option<String>,
    pub airportdb_base_url: String,
    pub airportdb_api_key: Option<String>,
    pub places_base_url: String,
    pub google_maps_api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            amadeus_base_url: "https://test.api.amadeus.com".to_string(),
            amadeus_client_id: None,
            amadeus_client_secret: None,
            amadeus_access_token: None,
            airportdb_base_url: "https://airportdb.io/api/v1/airport".to_string(),
            airportdb_api_key: None,
            places_base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            google_maps_api_key: None,
            timeout_ms: 10000,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            amadeus_base_url: value("AMADEUS_BASE_URL").unwrap_or(defaults.amadeus_base_url),
            amadeus_client_id: value("AMADEUS_CLIENT_ID"),
            amadeus_client_secret: value("AMADEUS_CLIENT_SECRET"),
            amadeus_access_token: value("AMADEUS_API_KEY"),
            airportdb_base_url: value("AIRPORTDB_BASE_URL").unwrap_or(defaults.airportdb_base_url),
            airportdb_api_key: value("AIRPORTDB_API_KEY"),
            places_base_url: value("GOOGLE_PLACES_BASE_URL").unwrap_or(defaults.places_base_url),
            google_maps_api_key: value("GOOGLE_MAPS_API_KEY"),
            timeout_ms: parse_number(&lookup, "PROVIDER_TIMEOUT_MS")?.unwrap_or(defaults.timeout_ms),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

fn parse_number<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
