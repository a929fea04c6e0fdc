// Search domain types shared by the normalizer, the provider clients and the controller

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDomain {
    Flights,
    Accommodations,
}

impl SearchDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDomain::Flights => "flights",
            SearchDomain::Accommodations => "accommodations",
        }
    }
}

impl fmt::Display for SearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Dates as the form hands them over: typed calendar picks, ISO timestamps or raw text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(timestamp: DateTime<Utc>) -> Self {
        DateInput::Timestamp(timestamp)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

// Counts typed into number inputs arrive either as numbers or as strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(i64),
    Text(String),
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        NumericInput::Number(i64::from(value))
    }
}

impl From<&str> for NumericInput {
    fn from(text: &str) -> Self {
        NumericInput::Text(text.to_string())
    }
}

/// Flight search form values before normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub departure: Option<DateInput>,
    pub return_date: Option<DateInput>,
    pub adults: Option<NumericInput>,
    pub max_results: Option<NumericInput>,
    pub currency: Option<String>,
}

impl FlightQuery {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure: impl Into<DateInput>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure: Some(departure.into()),
            ..Self::default()
        }
    }

    pub fn returning(mut self, return_date: impl Into<DateInput>) -> Self {
        self.return_date = Some(return_date.into());
        self
    }

    pub fn with_adults(mut self, adults: impl Into<NumericInput>) -> Self {
        self.adults = Some(adults.into());
        self
    }

    pub fn with_max_results(mut self, max: impl Into<NumericInput>) -> Self {
        self.max_results = Some(max.into());
        self
    }
}

/// Hotel stay form values before normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StayQuery {
    pub hotel_ids: Vec<String>,
    pub check_in: Option<DateInput>,
    pub check_out: Option<DateInput>,
    pub adults: Option<NumericInput>,
    pub rooms: Option<NumericInput>,
    pub best_rate_only: bool,
    pub currency: Option<String>,
}

impl StayQuery {
    pub fn new<I, S>(hotel_ids: I, check_in: impl Into<DateInput>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hotel_ids: hotel_ids.into_iter().map(Into::into).collect(),
            check_in: Some(check_in.into()),
            best_rate_only: true,
            ..Self::default()
        }
    }

    pub fn until(mut self, check_out: impl Into<DateInput>) -> Self {
        self.check_out = Some(check_out.into());
        self
    }

    pub fn with_guests(
        mut self,
        adults: impl Into<NumericInput>,
        rooms: impl Into<NumericInput>,
    ) -> Self {
        self.adults = Some(adults.into());
        self.rooms = Some(rooms.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum SearchQuery {
    Flights(FlightQuery),
    Accommodations(StayQuery),
}

impl SearchQuery {
    pub fn domain(&self) -> SearchDomain {
        match self {
            SearchQuery::Flights(_) => SearchDomain::Flights,
            SearchQuery::Accommodations(_) => SearchDomain::Accommodations,
        }
    }
}

/// Provider-ready flight search parameters.
///
/// Built only by the normalizer; the fields are read through accessors so a
/// request cannot be altered once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchRequest {
    pub(crate) origin_location_code: String,
    pub(crate) destination_location_code: String,
    pub(crate) departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) return_date: Option<NaiveDate>,
    pub(crate) adults: u8,
    pub(crate) currency_code: String,
    pub(crate) max: u16,
}

impl FlightSearchRequest {
    pub fn origin_location_code(&self) -> &str {
        &self.origin_location_code
    }

    pub fn destination_location_code(&self) -> &str {
        &self.destination_location_code
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn adults(&self) -> u8 {
        self.adults
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn max(&self) -> u16 {
        self.max
    }
}

/// Provider-ready hotel offer search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchRequest {
    pub(crate) hotel_ids: Vec<String>,
    pub(crate) check_in_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) check_out_date: Option<NaiveDate>,
    pub(crate) adults: u8,
    pub(crate) room_quantity: u8,
    pub(crate) best_rate_only: bool,
    pub(crate) currency: String,
}

impl HotelSearchRequest {
    pub fn hotel_ids(&self) -> &[String] {
        &self.hotel_ids
    }

    pub fn check_in_date(&self) -> NaiveDate {
        self.check_in_date
    }

    pub fn check_out_date(&self) -> Option<NaiveDate> {
        self.check_out_date
    }

    pub fn adults(&self) -> u8 {
        self.adults
    }

    pub fn room_quantity(&self) -> u8 {
        self.room_quantity
    }

    pub fn best_rate_only(&self) -> bool {
        self.best_rate_only
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum NormalizedRequest {
    Flights(FlightSearchRequest),
    Accommodations(HotelSearchRequest),
}

impl NormalizedRequest {
    pub fn domain(&self) -> SearchDomain {
        match self {
            NormalizedRequest::Flights(_) => SearchDomain::Flights,
            NormalizedRequest::Accommodations(_) => SearchDomain::Accommodations,
        }
    }
}

// Location suggestion returned by airport lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub locality: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub iata_code: String,
    pub terminal: Option<String>,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub carrier_code: String,
    pub number: String,
    pub departure: Endpoint,
    pub arrival: Endpoint,
    pub duration: Option<String>,
    pub aircraft: Option<String>,
}

impl Segment {
    pub fn flight_number(&self) -> String {
        format!("{}{}", self.carrier_code, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub duration: Option<String>,
    pub segments: Vec<Segment>,
}

impl Itinerary {
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn stops(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub itineraries: Vec<Itinerary>,
    pub price: Price,
    pub bookable_seats: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomOffer {
    pub id: String,
    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub room_type: String,
    pub description: Option<String>,
    pub nightly_price: Option<Price>,
    pub total_price: Price,
    pub cancellation_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffers {
    pub hotel_id: String,
    pub name: String,
    pub city_code: Option<String>,
    pub available: bool,
    pub offers: Vec<RoomOffer>,
}

/// Outcome of one provider call, as kept by the controller and the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchResult {
    Flights {
        offers: Vec<FlightOffer>,
        created_at: DateTime<Utc>,
    },
    Accommodations {
        hotels: Vec<HotelOffers>,
        created_at: DateTime<Utc>,
    },
}

impl SearchResult {
    // Providers occasionally repeat an offer across pages; the first occurrence wins
    pub fn flights(offers: Vec<FlightOffer>, created_at: DateTime<Utc>) -> Self {
        SearchResult::Flights {
            offers: dedup_by_key(offers, |offer| offer.id.as_str()),
            created_at,
        }
    }

    pub fn accommodations(hotels: Vec<HotelOffers>, created_at: DateTime<Utc>) -> Self {
        SearchResult::Accommodations {
            hotels: dedup_by_key(hotels, |hotel| hotel.hotel_id.as_str()),
            created_at,
        }
    }

    pub fn domain(&self) -> SearchDomain {
        match self {
            SearchResult::Flights { .. } => SearchDomain::Flights,
            SearchResult::Accommodations { .. } => SearchDomain::Accommodations,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            SearchResult::Flights { created_at, .. }
            | SearchResult::Accommodations { created_at, .. } => *created_at,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResult::Flights { offers, .. } => offers.len(),
            SearchResult::Accommodations { hotels, .. } => hotels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn dedup_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item).to_string()))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn at(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    pub fn segment(carrier: &str, number: &str, from: &str, to: &str) -> Segment {
        Segment {
            carrier_code: carrier.to_string(),
            number: number.to_string(),
            departure: Endpoint {
                iata_code: from.to_string(),
                terminal: None,
                at: at("2025-01-10T08:00:00"),
            },
            arrival: Endpoint {
                iata_code: to.to_string(),
                terminal: None,
                at: at("2025-01-10T11:30:00"),
            },
            duration: Some("PT3H30M".to_string()),
            aircraft: None,
        }
    }

    pub fn flight_offer(id: &str, amount: f64) -> FlightOffer {
        FlightOffer {
            id: id.to_string(),
            itineraries: vec![Itinerary {
                duration: Some("PT7H25M".to_string()),
                segments: vec![segment("BA", "117", "LHR", "JFK")],
            }],
            price: Price {
                amount,
                currency: "USD".to_string(),
            },
            bookable_seats: 4,
        }
    }

    pub fn hotel_offers(hotel_id: &str) -> HotelOffers {
        HotelOffers {
            hotel_id: hotel_id.to_string(),
            name: format!("Hotel {}", hotel_id),
            city_code: Some("LON".to_string()),
            available: true,
            offers: vec![RoomOffer {
                id: format!("{}-OFFER", hotel_id),
                check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2025, 6, 3),
                room_type: "Standard Room".to_string(),
                description: None,
                nightly_price: None,
                total_price: Price {
                    amount: 240.0,
                    currency: "GBP".to_string(),
                },
                cancellation_policy: Some("Free cancellation until 2025-05-30".to_string()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_flight_results_drop_repeated_offer_ids() {
        let created_at = Utc::now();
        let result = SearchResult::flights(
            vec![
                flight_offer("1", 100.0),
                flight_offer("2", 120.0),
                flight_offer("1", 999.0),
            ],
            created_at,
        );

        match &result {
            SearchResult::Flights { offers, .. } => {
                let ids: Vec<&str> = offers.iter().map(|o| o.id.as_str()).collect();
                assert_eq!(ids, vec!["1", "2"]);
                assert_eq!(offers[0].price.amount, 100.0);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(result.domain(), SearchDomain::Flights);
        assert_eq!(result.created_at(), created_at);
    }

    #[test]
    fn test_search_result_json_is_tagged_by_kind() {
        let result = SearchResult::accommodations(vec![hotel_offers("HLLON101")], Utc::now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "accommodations");

        let back: SearchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_date_input_accepts_text_and_dates_from_json() {
        let typed: DateInput = serde_json::from_str("\"2025-01-10\"").unwrap();
        assert_eq!(
            typed,
            DateInput::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
        );

        let text: DateInput = serde_json::from_str("\"10/01/2025\"").unwrap();
        assert_eq!(text, DateInput::Text("10/01/2025".to_string()));
    }

    #[test]
    fn test_itinerary_stops() {
        let itinerary = Itinerary {
            duration: None,
            segments: vec![
                segment("BA", "1", "LHR", "DUB"),
                segment("EI", "105", "DUB", "JFK"),
            ],
        };
        assert_eq!(itinerary.stops(), 1);
        assert_eq!(itinerary.first_segment().unwrap().flight_number(), "BA1");
        assert_eq!(itinerary.last_segment().unwrap().arrival.iata_code, "JFK");
    }
}
