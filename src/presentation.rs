// View models for the results page: what to render for each controller state

use crate::controller::SearchState;
use crate::deeplinks::{booking_links, BookingLink};
use crate::models::{FlightOffer, HotelOffers, Itinerary, Price, RoomOffer, SearchResult};
use chrono::NaiveDateTime;
use serde::Serialize;

pub const NO_FLIGHTS_MESSAGE: &str = "No flights found.";
pub const NO_ACCOMMODATIONS_MESSAGE: &str = "No accommodations found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum SearchView {
    Idle,
    Loading,
    Error { message: String, retryable: bool },
    Empty { message: String },
    Flights { cards: Vec<FlightCard> },
    Accommodations { cards: Vec<HotelCard> },
}

impl From<&SearchState> for SearchView {
    fn from(state: &SearchState) -> Self {
        match state {
            SearchState::Idle => SearchView::Idle,
            SearchState::Searching { .. } => SearchView::Loading,
            SearchState::Failed(failure) => SearchView::Error {
                message: failure.message.clone(),
                retryable: failure.retryable,
            },
            SearchState::Success(result) => SearchView::from(&**result),
        }
    }
}

impl From<&SearchResult> for SearchView {
    fn from(result: &SearchResult) -> Self {
        match result {
            SearchResult::Flights { offers, .. } if offers.is_empty() => SearchView::Empty {
                message: NO_FLIGHTS_MESSAGE.to_string(),
            },
            SearchResult::Accommodations { hotels, .. } if hotels.is_empty() => SearchView::Empty {
                message: NO_ACCOMMODATIONS_MESSAGE.to_string(),
            },
            SearchResult::Flights { offers, .. } => SearchView::Flights {
                cards: offers.iter().map(FlightCard::from).collect(),
            },
            SearchResult::Accommodations { hotels, .. } => SearchView::Accommodations {
                cards: hotels.iter().map(HotelCard::from).collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightCard {
    pub id: String,
    pub price: String,
    pub seats_left: u32,
    pub itineraries: Vec<ItineraryLine>,
    pub links: Vec<BookingLink>,
}

impl From<&FlightOffer> for FlightCard {
    fn from(offer: &FlightOffer) -> Self {
        FlightCard {
            id: offer.id.clone(),
            price: format_price(&offer.price),
            seats_left: offer.bookable_seats,
            itineraries: offer.itineraries.iter().filter_map(ItineraryLine::new).collect(),
            // Outbound leg decides where the booking sites start
            links: offer
                .itineraries
                .first()
                .map(booking_links)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItineraryLine {
    pub from: String,
    pub to: String,
    pub departs: String,
    pub arrives: String,
    pub duration: String,
    pub stops: String,
    pub flights: Vec<String>,
}

impl ItineraryLine {
    fn new(itinerary: &Itinerary) -> Option<Self> {
        let first = itinerary.first_segment()?;
        let last = itinerary.last_segment()?;
        Some(ItineraryLine {
            from: first.departure.iata_code.clone(),
            to: last.arrival.iata_code.clone(),
            departs: format_date_time(&first.departure.at),
            arrives: format_date_time(&last.arrival.at),
            duration: itinerary
                .duration
                .as_deref()
                .map(format_duration)
                .unwrap_or_default(),
            stops: stops_label(itinerary.stops()),
            flights: itinerary.segments.iter().map(|s| s.flight_number()).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelCard {
    pub hotel_id: String,
    pub name: String,
    pub available: bool,
    pub from_price: Option<String>,
    pub rooms: Vec<RoomLine>,
}

impl From<&HotelOffers> for HotelCard {
    fn from(hotel: &HotelOffers) -> Self {
        let cheapest = hotel
            .offers
            .iter()
            .map(|offer| &offer.total_price)
            .min_by(|a, b| a.amount.total_cmp(&b.amount));
        HotelCard {
            hotel_id: hotel.hotel_id.clone(),
            name: hotel.name.clone(),
            available: hotel.available && !hotel.offers.is_empty(),
            from_price: cheapest.map(format_price),
            rooms: hotel.offers.iter().map(RoomLine::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomLine {
    pub room_type: String,
    pub description: Option<String>,
    pub total: String,
    pub per_night: Option<String>,
    pub cancellation: Option<String>,
}

impl From<&RoomOffer> for RoomLine {
    fn from(offer: &RoomOffer) -> Self {
        RoomLine {
            room_type: humanize(&offer.room_type),
            description: offer.description.clone(),
            total: format_price(&offer.total_price),
            per_night: offer.nightly_price.as_ref().map(format_price),
            cancellation: offer.cancellation_policy.clone(),
        }
    }
}

/// `PT10H5M` → `10h5m`
pub fn format_duration(iso: &str) -> String {
    iso.trim().trim_start_matches("PT").to_lowercase()
}

pub fn stops_label(stops: usize) -> String {
    match stops {
        0 => "Direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

pub fn format_date_time(at: &NaiveDateTime) -> String {
    at.format("%a, %b %-d %H:%M").to_string()
}

/// Two decimals with thousands separators; common currencies get their symbol.
pub fn format_price(price: &Price) -> String {
    let cents = (price.amount * 100.0).round() as i64;
    let (whole, fraction) = (cents / 100, (cents % 100).abs());

    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if cents < 0 { "-" } else { "" };

    match price.currency.as_str() {
        "USD" => format!("{}${}.{:02}", sign, grouped, fraction),
        "EUR" => format!("{}€{}.{:02}", sign, grouped, fraction),
        "GBP" => format!("{}£{}.{:02}", sign, grouped, fraction),
        code => format!("{}{}.{:02} {}", sign, grouped, fraction, code),
    }
}

// DELUXE_ROOM → Deluxe Room
fn humanize(code: &str) -> String {
    code.split(|c| c == '_' || c == ' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
