// Parameter normalizer: turns form values into the exact request each provider expects
// Pure: the reference date is passed in, so the same query always yields the same outcome

use crate::airports::AirportLookup;
use crate::models::{
    DateInput, FlightQuery, FlightSearchRequest, HotelSearchRequest, NormalizedRequest,
    NumericInput, SearchQuery, StayQuery,
};
use crate::validation::{Field, FieldErrorKind, ValidationError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];
const HOTEL_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub default_currency: String,
    pub default_adults: u32,
    pub default_rooms: u32,
    pub default_max_results: u32,
    pub max_adults: u32,
    pub max_rooms: u32,
    pub max_results_limit: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            default_adults: 1,
            default_rooms: 1,
            default_max_results: 5,
            max_adults: 9,
            max_rooms: 9,
            max_results_limit: 250,
        }
    }
}

pub struct ParameterNormalizer {
    lookup: Arc<dyn AirportLookup>,
    config: NormalizerConfig,
}

impl ParameterNormalizer {
    pub fn new(lookup: Arc<dyn AirportLookup>, config: NormalizerConfig) -> Self {
        Self { lookup, config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalizes `query` relative to `today`, reporting every invalid field at once.
    pub fn normalize(
        &self,
        query: &SearchQuery,
        today: NaiveDate,
    ) -> Result<NormalizedRequest, ValidationError> {
        match query {
            SearchQuery::Flights(flights) => self
                .normalize_flights(flights, today)
                .map(NormalizedRequest::Flights),
            SearchQuery::Accommodations(stay) => self
                .normalize_stay(stay, today)
                .map(NormalizedRequest::Accommodations),
        }
    }

    pub fn normalize_flights(
        &self,
        query: &FlightQuery,
        today: NaiveDate,
    ) -> Result<FlightSearchRequest, ValidationError> {
        let mut errors = ValidationError::default();

        let origin = self.location_code(&query.origin, Field::Origin, &mut errors);
        let destination = self.location_code(&query.destination, Field::Destination, &mut errors);
        if let (Some(from), Some(to)) = (&origin, &destination) {
            if from == to {
                errors.push(Field::Destination, FieldErrorKind::SameAsOrigin);
            }
        }

        let (departure, return_date) = date_range(
            query.departure.as_ref(),
            query.return_date.as_ref(),
            today,
            (Field::DepartureDate, Field::ReturnDate),
            &mut errors,
        );

        let adults = count::<u8>(
            query.adults.as_ref(),
            self.config.default_adults,
            self.config.max_adults,
            Field::Adults,
            &mut errors,
        );
        let max = count::<u16>(
            query.max_results.as_ref(),
            self.config.default_max_results,
            self.config.max_results_limit,
            Field::MaxResults,
            &mut errors,
        );
        let currency = self.currency(query.currency.as_deref(), &mut errors);

        match (origin, destination, departure, adults, max, currency) {
            (Some(origin), Some(destination), Some(departure), Some(adults), Some(max), Some(currency))
                if errors.is_empty() =>
            {
                Ok(FlightSearchRequest {
                    origin_location_code: origin,
                    destination_location_code: destination,
                    departure_date: departure,
                    return_date,
                    adults,
                    currency_code: currency,
                    max,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn normalize_stay(
        &self,
        query: &StayQuery,
        today: NaiveDate,
    ) -> Result<HotelSearchRequest, ValidationError> {
        let mut errors = ValidationError::default();

        let hotel_ids = hotel_ids(&query.hotel_ids, &mut errors);
        let (check_in, check_out) = date_range(
            query.check_in.as_ref(),
            query.check_out.as_ref(),
            today,
            (Field::CheckIn, Field::CheckOut),
            &mut errors,
        );
        // A stay needs at least one night
        if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
            if check_out == check_in && !errors.has(Field::CheckOut, &FieldErrorKind::InvalidDateRange) {
                errors.push(Field::CheckOut, FieldErrorKind::InvalidDateRange);
            }
        }

        let adults = count::<u8>(
            query.adults.as_ref(),
            self.config.default_adults,
            self.config.max_adults,
            Field::Adults,
            &mut errors,
        );
        let rooms = count::<u8>(
            query.rooms.as_ref(),
            self.config.default_rooms,
            self.config.max_rooms,
            Field::Rooms,
            &mut errors,
        );
        let currency = self.currency(query.currency.as_deref(), &mut errors);

        match (hotel_ids, check_in, adults, rooms, currency) {
            (Some(hotel_ids), Some(check_in), Some(adults), Some(rooms), Some(currency))
                if errors.is_empty() =>
            {
                Ok(HotelSearchRequest {
                    hotel_ids,
                    check_in_date: check_in,
                    check_out_date: check_out,
                    adults,
                    room_quantity: rooms,
                    best_rate_only: query.best_rate_only,
                    currency,
                })
            }
            _ => Err(errors),
        }
    }

    // Three letters are taken as a code verbatim; anything longer goes through the lookup
    fn location_code(&self, input: &str, field: Field, errors: &mut ValidationError) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            errors.push(field, FieldErrorKind::Missing);
            return None;
        }
        if input.len() == 3 && input.chars().all(|c| c.is_ascii_alphabetic()) {
            return Some(input.to_ascii_uppercase());
        }
        match self.lookup.resolve(input) {
            Some(location) => Some(location.code.to_ascii_uppercase()),
            None => {
                errors.push(field, FieldErrorKind::UnresolvedLocation);
                None
            }
        }
    }

    fn currency(&self, input: Option<&str>, errors: &mut ValidationError) -> Option<String> {
        match input.map(str::trim).filter(|s| !s.is_empty()) {
            None => Some(self.config.default_currency.clone()),
            Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(code.to_ascii_uppercase())
            }
            Some(_) => {
                errors.push(Field::Currency, FieldErrorKind::InvalidFormat);
                None
            }
        }
    }
}

// Validates a start/end pair: start is required and not before today, end is optional and not before start
fn date_range(
    start: Option<&DateInput>,
    end: Option<&DateInput>,
    today: NaiveDate,
    (start_field, end_field): (Field, Field),
    errors: &mut ValidationError,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let start = match start.map(parse_date) {
        None | Some(DateParse::Blank) => {
            errors.push(start_field, FieldErrorKind::Missing);
            None
        }
        Some(DateParse::Invalid) => {
            errors.push(start_field, FieldErrorKind::InvalidFormat);
            None
        }
        Some(DateParse::Date(date)) if date < today => {
            errors.push(start_field, FieldErrorKind::InvalidDateRange);
            None
        }
        Some(DateParse::Date(date)) => Some(date),
    };

    let end = match end.map(parse_date) {
        None | Some(DateParse::Blank) => None,
        Some(DateParse::Invalid) => {
            errors.push(end_field, FieldErrorKind::InvalidFormat);
            None
        }
        Some(DateParse::Date(date)) => {
            if date < today || start.map_or(false, |start| date < start) {
                errors.push(end_field, FieldErrorKind::InvalidDateRange);
                None
            } else {
                Some(date)
            }
        }
    };

    (start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateParse {
    Blank,
    Invalid,
    Date(NaiveDate),
}

fn parse_date(input: &DateInput) -> DateParse {
    match input {
        DateInput::Date(date) => DateParse::Date(*date),
        DateInput::Timestamp(timestamp) => DateParse::Date(timestamp.date_naive()),
        DateInput::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return DateParse::Blank;
            }
            if let Some(date) = DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            {
                return DateParse::Date(date);
            }
            if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
                return DateParse::Date(timestamp.with_timezone(&Utc).date_naive());
            }
            match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
                Ok(local) => DateParse::Date(local.date()),
                Err(_) => DateParse::Invalid,
            }
        }
    }
}

// Coerces a number or numeric text into 1..=max, falling back to the default when absent
// `max` is clamped to what `T` can hold, so a wide configured bound never truncates
fn count<T>(
    input: Option<&NumericInput>,
    default: u32,
    max: u32,
    field: Field,
    errors: &mut ValidationError,
) -> Option<T>
where
    T: TryFrom<u32> + Into<u32> + Bounded,
{
    let max = max.min(T::MAX.into());
    let value = match input {
        None => Some(i64::from(default)),
        Some(NumericInput::Number(n)) => Some(*n),
        Some(NumericInput::Text(text)) if text.trim().is_empty() => Some(i64::from(default)),
        Some(NumericInput::Text(text)) => text.trim().parse::<i64>().ok(),
    };

    let counted = value
        .filter(|n| *n >= 1 && *n <= i64::from(max))
        .and_then(|n| u32::try_from(n).ok())
        .and_then(|n| T::try_from(n).ok());
    if counted.is_none() {
        errors.push(field, FieldErrorKind::OutOfRange { min: 1, max });
    }
    counted
}

// Width of the request field a count lands in
trait Bounded: Sized {
    const MAX: Self;
}

impl Bounded for u8 {
    const MAX: Self = u8::MAX;
}

impl Bounded for u16 {
    const MAX: Self = u16::MAX;
}

fn hotel_ids(input: &[String], errors: &mut ValidationError) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = input
        .iter()
        .map(|id| id.trim().to_ascii_uppercase())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect();

    if ids.is_empty() {
        errors.push(Field::HotelIds, FieldErrorKind::Missing);
        return None;
    }
    if ids
        .iter()
        .any(|id| id.len() != HOTEL_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        errors.push(Field::HotelIds, FieldErrorKind::InvalidFormat);
        return None;
    }
    Some(ids)
}
