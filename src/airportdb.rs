// AirportDB autocomplete client

use crate::config::{ConfigError, ProviderConfig};
use crate::models::Location;
use crate::provider::{transport_error, LocationResolver, ProviderError, MAX_SUGGESTIONS, MIN_FRAGMENT_LEN};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct AirportDbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct AirportRecord {
    iata_code: Option<String>,
    icao_code: Option<String>,
    name: Option<String>,
    municipality: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl AirportRecord {
    // Records without any code cannot be searched against, so they are dropped
    fn into_location(self) -> Option<Location> {
        let code = self
            .iata_code
            .filter(|c| !c.trim().is_empty())
            .or(self.icao_code.filter(|c| !c.trim().is_empty()))?;
        Some(Location {
            name: self.name.unwrap_or_else(|| code.clone()),
            code: code.trim().to_uppercase(),
            locality: self.municipality.unwrap_or_default(),
            country: self.country.or(self.country_code).unwrap_or_default(),
        })
    }
}

impl AirportDbClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .airportdb_api_key
            .clone()
            .ok_or(ConfigError::Missing("AIRPORTDB_API_KEY"))?;
        Ok(Self {
            http: config.http_client()?,
            base_url: config.airportdb_base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl LocationResolver for AirportDbClient {
    async fn resolve(&self, fragment: &str) -> Result<Vec<Location>, ProviderError> {
        let fragment = fragment.trim();
        if fragment.chars().count() < MIN_FRAGMENT_LEN {
            return Ok(Vec::new());
        }

        debug!(fragment, "querying airportdb");
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .header("Accept", "application/json")
            .header("api-key", &self.api_key)
            .query(&[("query", fragment)])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if !(200..300).contains(&status) {
            return Err(ProviderError::fault(status, None, format!("airportdb HTTP {}", status), None));
        }
        decode_airports(&body)
    }
}

pub fn decode_airports(body: &str) -> Result<Vec<Location>, ProviderError> {
    let records: Vec<AirportRecord> = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("airport search: {}", e)))?;
    Ok(records
        .into_iter()
        .filter_map(AirportRecord::into_location)
        .take(MAX_SUGGESTIONS)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_airports_drops_codeless_records() {
        let body = r#"[
            {"iata_code": "LHR", "icao_code": "EGLL", "name": "London Heathrow Airport", "municipality": "London", "country": "United Kingdom", "country_code": "GB"},
            {"iata_code": "", "icao_code": "EGLW", "name": "London Heliport", "municipality": "London", "country_code": "GB"},
            {"iata_code": null, "icao_code": null, "name": "Somewhere Field"}
        ]"#;

        let airports = decode_airports(body).unwrap();
        assert_eq!(airports.len(), 2);
        assert_eq!(airports[0].code, "LHR");
        assert_eq!(airports[0].country, "United Kingdom");
        assert_eq!(airports[1].code, "EGLW");
        assert_eq!(airports[1].country, "GB");
    }

    #[test]
    fn test_decode_airports_caps_suggestions() {
        let records: Vec<String> = (0..25)
            .map(|i| format!(r#"{{"iata_code": "A{:02}", "name": "Airport {}"}}"#, i, i))
            .collect();
        let body = format!("[{}]", records.join(","));
        assert_eq!(decode_airports(&body).unwrap().len(), MAX_SUGGESTIONS);
        assert!(matches!(
            decode_airports("{\"error\": \"bad key\"}"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_short_fragment_skips_request() {
        let config = ProviderConfig {
            airportdb_api_key: Some("key".to_string()),
            // Unroutable, so a request would fail rather than return empty
            airportdb_base_url: "http://127.0.0.1:9".to_string(),
            ..ProviderConfig::default()
        };
        let client = AirportDbClient::new(&config).unwrap();
        assert!(client.resolve("L").await.unwrap().is_empty());
        assert!(client.resolve("  ").await.unwrap().is_empty());
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(matches!(
            AirportDbClient::new(&ProviderConfig::default()),
            Err(ConfigError::Missing("AIRPORTDB_API_KEY"))
        ));
    }
}
