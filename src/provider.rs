// Provider seams: one async trait per external search service plus their shared error type

use crate::models::{FlightOffer, FlightSearchRequest, HotelOffers, HotelSearchRequest, Location};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// Fragments shorter than this are not worth a lookup
pub const MIN_FRAGMENT_LEN: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;

// Amadeus answers "NO ROOMS AVAILABLE AT REQUESTED PROPERTY" with this code
const NO_ROOMS_FAULT_CODE: u32 = 3664;
const NO_INVENTORY_MARKERS: &[&str] = &["NO ROOMS AVAILABLE", "NO AVAILABILITY", "SOLD OUT"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("No inventory available: {0}")]
    NoAvailability(String),

    #[error("Provider fault: {status} - {title}")]
    Fault {
        status: u16,
        code: Option<u32>,
        title: String,
        detail: Option<String>,
    },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Classifies a fault payload returned by a provider.
    pub fn fault(
        status: u16,
        code: Option<u32>,
        title: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        let title = title.into();
        let text = format!("{} {}", title, detail.as_deref().unwrap_or("")).to_uppercase();

        if code == Some(NO_ROOMS_FAULT_CODE)
            || NO_INVENTORY_MARKERS.iter().any(|marker| text.contains(marker))
        {
            return ProviderError::NoAvailability(title);
        }

        match status {
            401 | 403 => ProviderError::Unauthorized(title),
            429 => ProviderError::RateLimitExceeded(title),
            _ => ProviderError::Fault {
                status,
                code,
                title,
                detail,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimitExceeded(_) => true,
            ProviderError::Fault { status, .. } => *status >= 500,
            ProviderError::Unauthorized(_)
            | ProviderError::NoAvailability(_)
            | ProviderError::MalformedResponse(_) => false,
        }
    }
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout.as_millis() as u64)
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

#[async_trait]
pub trait FlightProvider: Send + Sync + 'static {
    async fn search_flights(
        &self,
        request: &FlightSearchRequest,
    ) -> Result<Vec<FlightOffer>, ProviderError>;
}

#[async_trait]
pub trait HotelProvider: Send + Sync + 'static {
    async fn search_hotels(
        &self,
        request: &HotelSearchRequest,
    ) -> Result<Vec<HotelOffers>, ProviderError>;
}

// Autocomplete for the origin/destination inputs
#[async_trait]
pub trait LocationResolver: Send + Sync + 'static {
    // Ranked suggestions, at most MAX_SUGGESTIONS; empty for fragments under MIN_FRAGMENT_LEN
    async fn resolve(&self, fragment: &str) -> Result<Vec<Location>, ProviderError>;
}
