// Amadeus self-service HTTP client: flight offers, hotel offers and the OAuth2 token they need

use crate::clock::Clock;
use crate::config::{ConfigError, ProviderConfig};
use crate::models::{
    Endpoint, FlightOffer, FlightSearchRequest, HotelOffers, HotelSearchRequest, Itinerary, Price,
    RoomOffer, Segment,
};
use crate::provider::{transport_error, FlightProvider, HotelProvider, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";
const TOKEN_PATH: &str = "/v1/security/oauth2/token";
// Tokens are renewed this long before Amadeus says they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

enum Credentials {
    Static(String),
    ClientCredentials { client_id: String, client_secret: String },
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

pub struct AmadeusClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl AmadeusClient {
    pub fn new(config: &ProviderConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let credentials = match (
            &config.amadeus_access_token,
            &config.amadeus_client_id,
            &config.amadeus_client_secret,
        ) {
            (Some(token), _, _) => Credentials::Static(token.clone()),
            (None, Some(id), Some(secret)) => Credentials::ClientCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            },
            (None, None, _) => return Err(ConfigError::Missing("AMADEUS_CLIENT_ID")),
            (None, Some(_), None) => return Err(ConfigError::Missing("AMADEUS_CLIENT_SECRET")),
        };

        Ok(Self {
            http: config.http_client()?,
            base_url: config.amadeus_base_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
            clock,
            timeout: config.timeout(),
        })
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        let now = self.clock.now();
        let cached = self.token.lock().clone().filter(|t| t.is_fresh(now));
        if let Some(token) = cached {
            return Ok(token.value);
        }

        debug!("requesting amadeus access token");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if !(200..300).contains(&status) {
            return Err(decode_fault(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(format!("token response: {}", e)))?;
        let cached = CachedToken {
            expires_at: token_expiry(now, token.expires_in)?,
            value: token.access_token,
        };
        let value = cached.value.clone();
        *self.token.lock() = Some(cached);
        Ok(value)
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<String, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if (200..300).contains(&status) {
            Ok(body)
        } else {
            let error = decode_fault(status, &body);
            warn!(path, status, error = %error, "amadeus request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    async fn search_flights(
        &self,
        request: &FlightSearchRequest,
    ) -> Result<Vec<FlightOffer>, ProviderError> {
        debug!(
            origin = request.origin_location_code(),
            destination = request.destination_location_code(),
            "searching flight offers"
        );
        let body = self.get(FLIGHT_OFFERS_PATH, &flight_query(request)).await?;
        decode_flight_offers(&body)
    }
}

#[async_trait]
impl HotelProvider for AmadeusClient {
    async fn search_hotels(
        &self,
        request: &HotelSearchRequest,
    ) -> Result<Vec<HotelOffers>, ProviderError> {
        debug!(hotels = request.hotel_ids().len(), "searching hotel offers");
        let body = self.get(HOTEL_OFFERS_PATH, &hotel_query(request)).await?;
        decode_hotel_offers(&body)
    }
}

fn token_expiry(issued: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, ProviderError> {
    chrono::Duration::try_seconds(expires_in)
        .and_then(|lifetime| issued.checked_add_signed(lifetime))
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("token expires_in out of range: {}", expires_in))
        })
}

pub fn flight_query(request: &FlightSearchRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("originLocationCode", request.origin_location_code().to_string()),
        ("destinationLocationCode", request.destination_location_code().to_string()),
        ("departureDate", request.departure_date().format("%Y-%m-%d").to_string()),
    ];
    if let Some(return_date) = request.return_date() {
        query.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
    }
    query.push(("adults", request.adults().to_string()));
    query.push(("currencyCode", request.currency_code().to_string()));
    query.push(("max", request.max().to_string()));
    query
}

pub fn hotel_query(request: &HotelSearchRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("hotelIds", request.hotel_ids().join(",")),
        ("checkInDate", request.check_in_date().format("%Y-%m-%d").to_string()),
    ];
    if let Some(check_out) = request.check_out_date() {
        query.push(("checkOutDate", check_out.format("%Y-%m-%d").to_string()));
    }
    query.push(("adults", request.adults().to_string()));
    query.push(("roomQuantity", request.room_quantity().to_string()));
    query.push(("bestRateOnly", request.best_rate_only().to_string()));
    query.push(("currency", request.currency().to_string()));
    query
}

// Wire format

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    errors: Vec<WireFault>,
}

#[derive(Debug, Deserialize)]
struct FaultEnvelope {
    #[serde(default)]
    errors: Vec<WireFault>,
}

#[derive(Debug, Deserialize)]
struct WireFault {
    status: Option<u16>,
    code: Option<u32>,
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFlightOffer {
    id: String,
    #[serde(default)]
    number_of_bookable_seats: u32,
    itineraries: Vec<WireItinerary>,
    price: WirePrice,
}

#[derive(Debug, Deserialize)]
struct WireItinerary {
    duration: Option<String>,
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSegment {
    departure: WireEndpoint,
    arrival: WireEndpoint,
    carrier_code: String,
    number: String,
    aircraft: Option<WireAircraft>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEndpoint {
    iata_code: String,
    terminal: Option<String>,
    at: String,
}

#[derive(Debug, Deserialize)]
struct WireAircraft {
    code: String,
}

// Amounts arrive as decimal strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePrice {
    currency: String,
    total: String,
    grand_total: Option<String>,
    variations: Option<WirePriceVariations>,
}

#[derive(Debug, Deserialize)]
struct WirePriceVariations {
    average: Option<WireAveragePrice>,
}

#[derive(Debug, Deserialize)]
struct WireAveragePrice {
    base: Option<String>,
    total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireHotelOffers {
    hotel: WireHotel,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    offers: Vec<WireRoomOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireHotel {
    hotel_id: String,
    name: Option<String>,
    city_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoomOffer {
    id: String,
    check_in_date: String,
    check_out_date: Option<String>,
    room: Option<WireRoom>,
    price: WirePrice,
    policies: Option<WirePolicies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoom {
    #[serde(rename = "type")]
    code: Option<String>,
    type_estimated: Option<WireRoomEstimate>,
    description: Option<WireText>,
}

#[derive(Debug, Deserialize)]
struct WireRoomEstimate {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePolicies {
    #[serde(default)]
    cancellations: Vec<WireCancellation>,
}

#[derive(Debug, Deserialize)]
struct WireCancellation {
    deadline: Option<String>,
    description: Option<WireText>,
}

fn malformed(what: &str, value: &str) -> ProviderError {
    ProviderError::MalformedResponse(format!("invalid {}: {:?}", what, value))
}

fn parse_amount(text: &str) -> Result<f64, ProviderError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| malformed("amount", text))
}

fn parse_day(text: &str) -> Result<NaiveDate, ProviderError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| malformed("date", text))
}

impl TryFrom<WirePrice> for Price {
    type Error = ProviderError;

    fn try_from(price: WirePrice) -> Result<Self, Self::Error> {
        let total = price.grand_total.as_deref().unwrap_or(&price.total);
        Ok(Price {
            amount: parse_amount(total)?,
            currency: price.currency,
        })
    }
}

impl TryFrom<WireEndpoint> for Endpoint {
    type Error = ProviderError;

    fn try_from(endpoint: WireEndpoint) -> Result<Self, Self::Error> {
        let at = NaiveDateTime::parse_from_str(&endpoint.at, "%Y-%m-%dT%H:%M:%S")
            .map_err(|_| malformed("segment time", &endpoint.at))?;
        Ok(Endpoint {
            iata_code: endpoint.iata_code,
            terminal: endpoint.terminal,
            at,
        })
    }
}

impl TryFrom<WireSegment> for Segment {
    type Error = ProviderError;

    fn try_from(segment: WireSegment) -> Result<Self, Self::Error> {
        Ok(Segment {
            carrier_code: segment.carrier_code,
            number: segment.number,
            departure: segment.departure.try_into()?,
            arrival: segment.arrival.try_into()?,
            duration: segment.duration,
            aircraft: segment.aircraft.map(|a| a.code),
        })
    }
}

impl TryFrom<WireFlightOffer> for FlightOffer {
    type Error = ProviderError;

    fn try_from(offer: WireFlightOffer) -> Result<Self, Self::Error> {
        let itineraries = offer
            .itineraries
            .into_iter()
            .map(|itinerary| {
                if itinerary.segments.is_empty() {
                    return Err(malformed("itinerary", "no segments"));
                }
                Ok(Itinerary {
                    duration: itinerary.duration,
                    segments: itinerary
                        .segments
                        .into_iter()
                        .map(Segment::try_from)
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FlightOffer {
            id: offer.id,
            itineraries,
            price: offer.price.try_into()?,
            bookable_seats: offer.number_of_bookable_seats,
        })
    }
}

impl TryFrom<WireRoomOffer> for RoomOffer {
    type Error = ProviderError;

    fn try_from(offer: WireRoomOffer) -> Result<Self, Self::Error> {
        let currency = offer.price.currency.clone();
        let nightly_price = offer
            .price
            .variations
            .as_ref()
            .and_then(|v| v.average.as_ref())
            .and_then(|avg| avg.total.as_deref().or(avg.base.as_deref()))
            .map(parse_amount)
            .transpose()?
            .map(|amount| Price {
                amount,
                currency: currency.clone(),
            });

        let (room_type, description) = match offer.room {
            Some(room) => (
                room.type_estimated
                    .and_then(|t| t.category)
                    .or(room.code)
                    .unwrap_or_else(|| "ROOM".to_string()),
                room.description.and_then(|d| d.text),
            ),
            None => ("ROOM".to_string(), None),
        };

        let cancellation_policy = offer
            .policies
            .and_then(|p| p.cancellations.into_iter().next())
            .and_then(|c| {
                c.description
                    .and_then(|d| d.text)
                    .or_else(|| c.deadline.map(|deadline| format!("Free cancellation until {}", deadline)))
            });

        Ok(RoomOffer {
            id: offer.id,
            check_in: parse_day(&offer.check_in_date)?,
            check_out: offer.check_out_date.as_deref().map(parse_day).transpose()?,
            room_type,
            description,
            nightly_price,
            total_price: offer.price.try_into()?,
            cancellation_policy,
        })
    }
}

impl TryFrom<WireHotelOffers> for HotelOffers {
    type Error = ProviderError;

    fn try_from(hotel: WireHotelOffers) -> Result<Self, Self::Error> {
        Ok(HotelOffers {
            name: hotel.hotel.name.unwrap_or_else(|| hotel.hotel.hotel_id.clone()),
            hotel_id: hotel.hotel.hotel_id,
            city_code: hotel.hotel.city_code,
            available: hotel.available,
            offers: hotel
                .offers
                .into_iter()
                .map(RoomOffer::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

fn first_fault(status: u16, faults: Vec<WireFault>) -> Option<ProviderError> {
    faults.into_iter().next().map(|fault| {
        ProviderError::fault(
            fault.status.unwrap_or(status),
            fault.code,
            fault.title.unwrap_or_else(|| "UNKNOWN ERROR".to_string()),
            fault.detail,
        )
    })
}

/// Maps a non-success Amadeus response onto a `ProviderError`.
pub fn decode_fault(status: u16, body: &str) -> ProviderError {
    let faults = serde_json::from_str::<FaultEnvelope>(body)
        .map(|envelope| envelope.errors)
        .unwrap_or_default();
    first_fault(status, faults).unwrap_or_else(|| {
        let title = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.trim().chars().take(200).collect()
        };
        ProviderError::fault(status, None, title, None)
    })
}

pub fn decode_flight_offers(body: &str) -> Result<Vec<FlightOffer>, ProviderError> {
    let envelope: Envelope<WireFlightOffer> = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("flight offers: {}", e)))?;
    envelope
        .data
        .into_iter()
        .map(FlightOffer::try_from)
        .collect()
}

// Hotel searches report unavailable properties as warnings next to the data;
// only an empty result carrying a fault is treated as a failure
pub fn decode_hotel_offers(body: &str) -> Result<Vec<HotelOffers>, ProviderError> {
    let envelope: Envelope<WireHotelOffers> = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("hotel offers: {}", e)))?;
    if envelope.data.is_empty() {
        if let Some(error) = first_fault(200, envelope.errors) {
            return Err(error);
        }
    }
    envelope
        .data
        .into_iter()
        .map(HotelOffers::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    const FLIGHT_OFFERS: &str = r#"{
        "meta": {"count": 2},
        "data": [
            {
                "type": "flight-offer",
                "id": "1",
                "numberOfBookableSeats": 7,
                "itineraries": [{
                    "duration": "PT10H5M",
                    "segments": [
                        {
                            "departure": {"iataCode": "LHR", "terminal": "2", "at": "2025-01-10T07:00:00"},
                            "arrival": {"iataCode": "DUB", "terminal": "1", "at": "2025-01-10T08:20:00"},
                            "carrierCode": "EI",
                            "number": "151",
                            "aircraft": {"code": "320"},
                            "duration": "PT1H20M"
                        },
                        {
                            "departure": {"iataCode": "DUB", "at": "2025-01-10T10:45:00"},
                            "arrival": {"iataCode": "JFK", "terminal": "5", "at": "2025-01-10T12:05:00"},
                            "carrierCode": "EI",
                            "number": "105",
                            "duration": "PT6H20M"
                        }
                    ]
                }],
                "price": {"currency": "USD", "total": "412.30", "grandTotal": "412.30"}
            },
            {
                "type": "flight-offer",
                "id": "2",
                "numberOfBookableSeats": 2,
                "itineraries": [{
                    "duration": "PT8H",
                    "segments": [{
                        "departure": {"iataCode": "LHR", "at": "2025-01-10T09:00:00"},
                        "arrival": {"iataCode": "JFK", "at": "2025-01-10T12:00:00"},
                        "carrierCode": "BA",
                        "number": "117"
                    }]
                }],
                "price": {"currency": "USD", "total": "650.00"}
            }
        ],
        "dictionaries": {}
    }"#;

    const HOTEL_OFFERS: &str = r#"{
        "data": [{
            "type": "hotel-offers",
            "hotel": {"hotelId": "MCLONGHM", "name": "JW Marriott Grosvenor House London", "cityCode": "LON"},
            "available": true,
            "offers": [{
                "id": "TSXOJ6LFQ2",
                "checkInDate": "2025-06-01",
                "checkOutDate": "2025-06-03",
                "room": {
                    "type": "A1K",
                    "typeEstimated": {"category": "DELUXE_ROOM", "beds": 1, "bedType": "KING"},
                    "description": {"text": "Deluxe King Room", "lang": "EN"}
                },
                "price": {
                    "currency": "GBP",
                    "base": "560.00",
                    "total": "672.00",
                    "variations": {"average": {"base": "280.00"}}
                },
                "policies": {"cancellations": [{"deadline": "2025-05-30T23:59:00+01:00"}]}
            }]
        }],
        "errors": [{"status": 200, "code": 3664, "title": "NO ROOMS AVAILABLE AT REQUESTED PROPERTY"}]
    }"#;

    fn flight_request(return_date: Option<NaiveDate>) -> FlightSearchRequest {
        FlightSearchRequest {
            origin_location_code: "LHR".to_string(),
            destination_location_code: "JFK".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            return_date,
            adults: 2,
            currency_code: "USD".to_string(),
            max: 5,
        }
    }

    #[test]
    fn test_decode_flight_offers() {
        let offers = decode_flight_offers(FLIGHT_OFFERS).unwrap();
        assert_eq!(offers.len(), 2);

        let first = &offers[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.bookable_seats, 7);
        assert_eq!(first.price.amount, 412.30);
        assert_eq!(first.itineraries[0].stops(), 1);
        let segment = first.itineraries[0].first_segment().unwrap();
        assert_eq!(segment.flight_number(), "EI151");
        assert_eq!(segment.departure.terminal.as_deref(), Some("2"));
        assert_eq!(segment.aircraft.as_deref(), Some("320"));

        assert_eq!(offers[1].price.amount, 650.0);
        assert_eq!(offers[1].itineraries[0].stops(), 0);
    }

    #[test]
    fn test_decode_rejects_malformed_offers() {
        let bad_price = FLIGHT_OFFERS.replace("\"650.00\"", "\"six hundred\"");
        assert!(matches!(
            decode_flight_offers(&bad_price),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_flight_offers("<html>gateway</html>"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert_eq!(decode_flight_offers(r#"{"data": []}"#).unwrap(), vec![]);
    }

    #[test]
    fn test_decode_hotel_offers_ignores_partial_warnings() {
        let hotels = decode_hotel_offers(HOTEL_OFFERS).unwrap();
        assert_eq!(hotels.len(), 1);

        let hotel = &hotels[0];
        assert_eq!(hotel.hotel_id, "MCLONGHM");
        assert_eq!(hotel.city_code.as_deref(), Some("LON"));
        let offer = &hotel.offers[0];
        assert_eq!(offer.room_type, "DELUXE_ROOM");
        assert_eq!(offer.description.as_deref(), Some("Deluxe King Room"));
        assert_eq!(offer.total_price.amount, 672.0);
        assert_eq!(offer.nightly_price.as_ref().map(|p| p.amount), Some(280.0));
        assert_eq!(
            offer.cancellation_policy.as_deref(),
            Some("Free cancellation until 2025-05-30T23:59:00+01:00")
        );
    }

    #[test]
    fn test_empty_hotel_result_with_fault_is_no_availability() {
        let body = r#"{"data": [], "errors": [{"status": 200, "code": 3664, "title": "NO ROOMS AVAILABLE AT REQUESTED PROPERTY"}]}"#;
        assert!(matches!(
            decode_hotel_offers(body),
            Err(ProviderError::NoAvailability(_))
        ));
    }

    #[test]
    fn test_decode_fault() {
        let body = r#"{"errors": [{"status": 400, "code": 477, "title": "INVALID FORMAT", "detail": "departureDate must be a date"}]}"#;
        assert_eq!(
            decode_fault(400, body),
            ProviderError::Fault {
                status: 400,
                code: Some(477),
                title: "INVALID FORMAT".to_string(),
                detail: Some("departureDate must be a date".to_string()),
            }
        );

        let expired = r#"{"errors": [{"status": 401, "code": 38192, "title": "Access token expired"}]}"#;
        assert!(matches!(decode_fault(401, expired), ProviderError::Unauthorized(_)));
        assert!(matches!(decode_fault(429, ""), ProviderError::RateLimitExceeded(_)));
        assert!(matches!(
            decode_fault(502, "Bad Gateway"),
            ProviderError::Fault { status: 502, .. }
        ));
    }

    #[test]
    fn test_query_parameters() {
        let one_way = flight_query(&flight_request(None));
        assert!(one_way.iter().all(|(name, _)| *name != "returnDate"));
        assert!(one_way.contains(&("departureDate", "2025-01-10".to_string())));
        assert!(one_way.contains(&("adults", "2".to_string())));

        let round_trip = flight_query(&flight_request(NaiveDate::from_ymd_opt(2025, 1, 20)));
        assert!(round_trip.contains(&("returnDate", "2025-01-20".to_string())));

        let stay = HotelSearchRequest {
            hotel_ids: vec!["MCLONGHM".to_string(), "HLLON101".to_string()],
            check_in_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            check_out_date: None,
            adults: 1,
            room_quantity: 1,
            best_rate_only: true,
            currency: "GBP".to_string(),
        };
        let query = hotel_query(&stay);
        assert_eq!(query[0], ("hotelIds", "MCLONGHM,HLLON101".to_string()));
        assert!(query.contains(&("bestRateOnly", "true".to_string())));
        assert!(query.iter().all(|(name, _)| *name != "checkOutDate"));
    }

    #[test]
    fn test_client_requires_credentials() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = ProviderConfig::default();
        assert!(matches!(
            AmadeusClient::new(&config, clock.clone()),
            Err(ConfigError::Missing("AMADEUS_CLIENT_ID"))
        ));

        let config = ProviderConfig {
            amadeus_client_id: Some("id".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            AmadeusClient::new(&config, clock),
            Err(ConfigError::Missing("AMADEUS_CLIENT_SECRET"))
        ));
    }

    #[tokio::test]
    async fn test_static_token_is_used_as_is() {
        let config = ProviderConfig {
            amadeus_access_token: Some("preissued".to_string()),
            ..ProviderConfig::default()
        };
        let client = AmadeusClient::new(&config, Arc::new(ManualClock::new(Utc::now()))).unwrap();
        assert_eq!(client.access_token().await.unwrap(), "preissued");
    }

    #[test]
    fn test_token_expiry_out_of_range_is_malformed() {
        let issued = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(
            token_expiry(issued, 1799).unwrap(),
            issued + chrono::Duration::seconds(1799)
        );
        assert!(matches!(
            token_expiry(issued, i64::MAX),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            token_expiry(issued, i64::MAX / 1000),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_token_freshness_margin() {
        let issued = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let token = CachedToken {
            value: "abc".to_string(),
            expires_at: issued + chrono::Duration::seconds(1799),
        };
        assert!(token.is_fresh(issued));
        assert!(token.is_fresh(issued + chrono::Duration::seconds(1700)));
        assert!(!token.is_fresh(issued + chrono::Duration::seconds(1740)));
    }
}
