// Booking deep links for a flight itinerary on third-party search sites

use crate::models::Itinerary;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

const GOOGLE_FLIGHTS_URL: &str = "https://www.google.com/travel/flights";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingSite {
    Skyscanner,
    Google,
    Kayak,
}

impl BookingSite {
    pub const ALL: [BookingSite; 3] = [BookingSite::Skyscanner, BookingSite::Google, BookingSite::Kayak];

    pub fn label(&self) -> &'static str {
        match self {
            BookingSite::Skyscanner => "Skyscanner",
            BookingSite::Google => "Google Flights",
            BookingSite::Kayak => "Kayak",
        }
    }
}

impl fmt::Display for BookingSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLink {
    pub site: BookingSite,
    pub url: String,
}

/// Link for `itinerary` on `site`, from the first departure to the last arrival.
/// `None` for an itinerary without segments.
pub fn booking_link(itinerary: &Itinerary, site: BookingSite) -> Option<String> {
    let first = itinerary.first_segment()?;
    let last = itinerary.last_segment()?;
    let from = &first.departure.iata_code;
    let to = &last.arrival.iata_code;
    let date = first.departure.at.format("%Y-%m-%d");

    let url = match site {
        BookingSite::Skyscanner => format!(
            "https://www.skyscanner.com/transport/flights/{}/{}/{}/{}",
            from.to_lowercase(),
            to.to_lowercase(),
            date,
            if itinerary.segments.len() == 1 { "direct" } else { "indirect" }
        ),
        BookingSite::Google => {
            let mut url = Url::parse(GOOGLE_FLIGHTS_URL).ok()?;
            url.query_pairs_mut()
                .append_pair("q", &format!("flights from {} to {}", from, to));
            url.to_string()
        }
        BookingSite::Kayak => format!("https://www.kayak.com/flights/{}-{}/{}", from, to, date),
    };
    Some(url)
}

pub fn booking_links(itinerary: &Itinerary) -> Vec<BookingLink> {
    BookingSite::ALL
        .iter()
        .filter_map(|&site| booking_link(itinerary, site).map(|url| BookingLink { site, url }))
        .collect()
}
