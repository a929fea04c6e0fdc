// Google Places accommodation discovery with price estimates derived from the price level.
// Searches by location rather than hotel id, so it sits beside the session controller
// instead of behind `HotelProvider`; the binary's `stays` command drives it.

use crate::config::{ConfigError, ProviderConfig};
use crate::models::Price;
use crate::provider::{transport_error, ProviderError};
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DETAIL_FIELDS: &str =
    "name,formatted_address,geometry,photos,rating,price_level,formatted_phone_number,website";
const DEFAULT_PRICE_LEVEL: u8 = 2;
// Nightly USD base per price level 0..=4
const BASE_NIGHTLY_PRICES: [f64; 5] = [50.0, 100.0, 200.0, 400.0, 800.0];

#[derive(Debug, Clone, PartialEq)]
pub struct StayDiscovery {
    pub location: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub photos: Vec<String>,
    pub rating: f64,
    pub price_level: u8,
    pub price: Price,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Estimated stay price: base nightly rate for the price level, times nights,
/// times 1 + 0.5 per extra guest, rounded to whole units.
pub fn estimate_price(
    price_level: Option<u8>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    guests: u32,
) -> Price {
    let base = price_level
        .and_then(|level| BASE_NIGHTLY_PRICES.get(level as usize))
        .copied()
        .unwrap_or(BASE_NIGHTLY_PRICES[DEFAULT_PRICE_LEVEL as usize]);
    let nights = match (check_in, check_out) {
        (Some(start), Some(end)) => (end - start).num_days().max(1),
        _ => 1,
    };
    let guest_multiplier = 1.0 + 0.5 * (guests.max(1) - 1) as f64;

    Price {
        amount: (base * nights as f64 * guest_multiplier).round(),
        currency: "USD".to_string(),
    }
}

pub struct PlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceSummary>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceSummary {
    place_id: Option<String>,
    name: Option<String>,
    rating: Option<f64>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceDetails {
    formatted_address: Option<String>,
    price_level: Option<u8>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

fn status_error(status: &str, message: Option<String>) -> ProviderError {
    let title = format!("places {}", status);
    match status {
        "REQUEST_DENIED" => ProviderError::Unauthorized(message.unwrap_or(title)),
        "OVER_QUERY_LIMIT" => ProviderError::RateLimitExceeded(message.unwrap_or(title)),
        _ => ProviderError::fault(502, None, title, message),
    }
}

impl PlacesClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .google_maps_api_key
            .clone()
            .ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;
        Ok(Self {
            http: config.http_client()?,
            base_url: config.places_base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout(),
        })
    }

    /// Lodging around `search.location`, one detail lookup per hit run concurrently.
    pub async fn search(&self, search: &StayDiscovery) -> Result<Vec<Accommodation>, ProviderError> {
        let query = format!("hotels in {}", search.location.trim());
        debug!(query = %query, "places text search");
        let body = self
            .fetch(
                "textsearch/json",
                &[("query", query.as_str()), ("type", "lodging")],
            )
            .await?;
        let places = decode_text_search(&body)?;

        let lookups = places.into_iter().map(|place| async move {
            let place_id = place
                .place_id
                .clone()
                .ok_or_else(|| ProviderError::MalformedResponse("place without id".to_string()))?;
            let body = self
                .fetch(
                    "details/json",
                    &[("place_id", place_id.as_str()), ("fields", DETAIL_FIELDS)],
                )
                .await?;
            let details = decode_details(&body)?;
            build_accommodation(place, details, search, &self.api_key)
        });
        try_join_all(lookups).await
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if !(200..300).contains(&status) {
            warn!(path, status, "places request failed");
            return Err(ProviderError::fault(status, None, format!("places HTTP {}", status), None));
        }
        Ok(body)
    }
}

fn decode_text_search(body: &str) -> Result<Vec<PlaceSummary>, ProviderError> {
    let response: TextSearchResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("places search: {}", e)))?;
    match response.status.as_str() {
        "OK" => Ok(response.results),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => Err(status_error(status, response.error_message)),
    }
}

fn decode_details(body: &str) -> Result<PlaceDetails, ProviderError> {
    let response: DetailsResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("place details: {}", e)))?;
    match response.status.as_str() {
        "OK" => Ok(response.result.unwrap_or_default()),
        status => Err(status_error(status, response.error_message)),
    }
}

fn build_accommodation(
    place: PlaceSummary,
    details: PlaceDetails,
    search: &StayDiscovery,
    api_key: &str,
) -> Result<Accommodation, ProviderError> {
    let coordinates = place
        .geometry
        .map(|g| g.location)
        .ok_or_else(|| ProviderError::MalformedResponse("place without geometry".to_string()))?;
    let price_level = details.price_level.unwrap_or(DEFAULT_PRICE_LEVEL);
    let photos = details
        .photos
        .iter()
        .map(|photo| {
            format!(
                "https://maps.googleapis.com/maps/api/place/photo?maxwidth=800&photoreference={}&key={}",
                photo.photo_reference, api_key
            )
        })
        .collect();

    Ok(Accommodation {
        id: place.place_id.unwrap_or_default(),
        name: place.name.unwrap_or_else(|| "Unknown".to_string()),
        address: details.formatted_address.unwrap_or_default(),
        city: search.location.trim().to_string(),
        coordinates,
        photos,
        rating: place.rating.unwrap_or(0.0),
        price_level,
        price: estimate_price(Some(price_level), search.check_in, search.check_out, search.guests),
        phone: details.formatted_phone_number,
        website: details.website,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 6, d)
    }

    #[test_case(Some(0), day(1), day(2), 1, 50.0; "#1 budget single night")]
    #[test_case(Some(2), day(1), day(4), 1, 600.0; "#2 mid-range three nights")]
    #[test_case(Some(3), day(1), day(3), 3, 1600.0; "#3 two extra guests double the rate")]
    #[test_case(None, None, None, 2, 300.0; "#4 defaults to mid-range and one night")]
    #[test_case(Some(9), day(1), day(2), 1, 200.0; "#5 unknown level falls back")]
    #[test_case(Some(1), day(5), day(1), 1, 100.0; "#6 reversed dates count one night")]
    fn test_estimate_price(
        level: Option<u8>,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
        guests: u32,
        expected: f64,
    ) {
        let price = estimate_price(level, check_in, check_out, guests);
        assert_eq!(price.amount, expected);
        assert_eq!(price.currency, "USD");
    }

    #[test]
    fn test_text_search_statuses() {
        assert!(decode_text_search(r#"{"status": "ZERO_RESULTS", "results": []}"#)
            .unwrap()
            .is_empty());
        assert!(matches!(
            decode_text_search(r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#),
            Err(ProviderError::Unauthorized(_))
        ));
        assert!(matches!(
            decode_text_search(r#"{"status": "OVER_QUERY_LIMIT"}"#),
            Err(ProviderError::RateLimitExceeded(_))
        ));
    }

    #[test]
    fn test_build_accommodation_from_place_and_details() {
        let places = decode_text_search(
            r#"{"status": "OK", "results": [{
                "place_id": "ChIJdd4hrwug2EcRmSrV3Vo6llI",
                "name": "The Savoy",
                "rating": 4.7,
                "geometry": {"location": {"lat": 51.5104, "lng": -0.1204}}
            }]}"#,
        )
        .unwrap();
        let details = decode_details(
            r#"{"status": "OK", "result": {
                "formatted_address": "Strand, London WC2R 0EZ, UK",
                "price_level": 4,
                "website": "https://www.thesavoylondon.com/",
                "photos": [{"photo_reference": "ref-1", "height": 800, "width": 1200}]
            }}"#,
        )
        .unwrap();
        let search = StayDiscovery {
            location: " London ".to_string(),
            check_in: day(1),
            check_out: day(3),
            guests: 2,
        };

        let stay = build_accommodation(places.into_iter().next().unwrap(), details, &search, "k").unwrap();
        assert_eq!(stay.name, "The Savoy");
        assert_eq!(stay.city, "London");
        assert_eq!(stay.price_level, 4);
        assert_eq!(stay.price.amount, 2400.0);
        assert_eq!(stay.coordinates.lat, 51.5104);
        assert!(stay.photos[0].contains("photoreference=ref-1"));
        assert_eq!(stay.phone, None);
    }

    #[test]
    fn test_place_without_geometry_is_malformed() {
        let place = PlaceSummary {
            place_id: Some("x".to_string()),
            name: None,
            rating: None,
            geometry: None,
        };
        let search = StayDiscovery {
            location: "Paris".to_string(),
            check_in: None,
            check_out: None,
            guests: 1,
        };
        assert!(matches!(
            build_accommodation(place, PlaceDetails::default(), &search, "k"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }
}
