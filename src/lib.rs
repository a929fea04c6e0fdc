// Travel search session: form input in, provider results out, last search kept per session

pub mod airportdb;
pub mod airports;
pub mod amadeus;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod deeplinks;
pub mod models;
pub mod normalizer;
pub mod places;
pub mod presentation;
pub mod provider;
pub mod validation;
pub mod wallet;

// Re-export key types for convenience
pub use airports::{AirportDirectory, AirportLookup};
pub use cache::{CacheError, CacheKey, CacheStatsReport, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ProviderConfig, SessionConfig};
pub use controller::{
    FailureKind, SearchController, SearchFailure, SearchProvider, SearchState, SubmitOutcome,
    GENERIC_FAILURE_MESSAGE, NO_AVAILABILITY_MESSAGE, TIMEOUT_MESSAGE,
};
pub use models::{
    FlightQuery, FlightSearchRequest, HotelSearchRequest, NormalizedRequest, SearchDomain,
    SearchQuery, SearchResult, StayQuery,
};
pub use normalizer::{NormalizerConfig, ParameterNormalizer};
pub use presentation::SearchView;
pub use provider::{FlightProvider, HotelProvider, LocationResolver, ProviderError};
pub use validation::{Field, FieldError, FieldErrorKind, ValidationError};
pub use wallet::{WalletAddress, WalletAuth, WalletError, WalletProvider};
