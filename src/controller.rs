// Search controller: normalize, call the provider once, commit the result and remember it
// One controller serves one results page (flights or accommodations)

use crate::cache::{CacheKey, ResultCache};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::models::{NormalizedRequest, SearchDomain, SearchQuery, SearchResult};
use crate::normalizer::ParameterNormalizer;
use crate::provider::{FlightProvider, HotelProvider, ProviderError};
use crate::validation::{Field, FieldErrorKind, ValidationError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_AVAILABILITY_MESSAGE: &str =
    "Nothing is available for the dates you picked. Try different dates or another property.";
pub const TIMEOUT_MESSAGE: &str =
    "The search is taking longer than expected. Please try again.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We couldn't fetch results right now. Please try again later.";

/// The provider a controller searches against; fixes the controller's domain.
#[derive(Clone)]
pub enum SearchProvider {
    Flights(Arc<dyn FlightProvider>),
    Accommodations(Arc<dyn HotelProvider>),
}

impl SearchProvider {
    pub fn domain(&self) -> SearchDomain {
        match self {
            SearchProvider::Flights(_) => SearchDomain::Flights,
            SearchProvider::Accommodations(_) => SearchDomain::Accommodations,
        }
    }

    async fn search(
        &self,
        request: &NormalizedRequest,
        clock: &dyn Clock,
    ) -> Result<SearchResult, ProviderError> {
        match (self, request) {
            (SearchProvider::Flights(provider), NormalizedRequest::Flights(request)) => {
                let offers = provider.search_flights(request).await?;
                Ok(SearchResult::flights(offers, clock.now()))
            }
            (SearchProvider::Accommodations(provider), NormalizedRequest::Accommodations(request)) => {
                let hotels = provider.search_hotels(request).await?;
                Ok(SearchResult::accommodations(hotels, clock.now()))
            }
            // Requests are checked against the domain before they get here
            (provider, request) => Err(ProviderError::MalformedResponse(format!(
                "{} request sent to {} provider",
                request.domain(),
                provider.domain()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    NoAvailability,
    Timeout,
    Provider,
}

/// What the error banner shows after a failed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
    // Underlying error text, for logs rather than the banner
    pub detail: String,
}

impl From<&ProviderError> for SearchFailure {
    fn from(error: &ProviderError) -> Self {
        let (kind, message, retryable) = match error {
            ProviderError::NoAvailability(_) => (FailureKind::NoAvailability, NO_AVAILABILITY_MESSAGE, false),
            ProviderError::Timeout(_) => (FailureKind::Timeout, TIMEOUT_MESSAGE, true),
            other => (FailureKind::Provider, GENERIC_FAILURE_MESSAGE, other.is_retryable()),
        };
        SearchFailure {
            kind,
            message: message.to_string(),
            retryable,
            detail: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Searching { request: NormalizedRequest },
    Success(Arc<SearchResult>),
    Failed(SearchFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(Arc<SearchResult>),
    Failed(SearchFailure),
    // Normalization failed; state is untouched
    Invalid(ValidationError),
    // A search was already in flight
    Ignored,
    // The response arrived after the controller moved on
    Discarded,
    NothingToRefresh,
}

struct Inner {
    state: SearchState,
    generation: u64,
    last_request: Option<NormalizedRequest>,
}

// Puts the pre-search state back if the submitting future is dropped mid-search,
// unless a later search or a clear has already moved the controller on
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    previous: Option<SearchState>,
}

impl<'a> InFlight<'a> {
    fn new(inner: &'a Mutex<Inner>, generation: u64, previous: SearchState) -> Self {
        Self {
            inner,
            generation,
            previous: Some(previous),
        }
    }

    fn disarm(mut self) {
        self.previous = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let mut inner = self.inner.lock();
        if inner.generation == self.generation
            && matches!(inner.state, SearchState::Searching { .. })
        {
            debug!(generation = self.generation, "search abandoned by its caller");
            inner.state = previous;
        }
    }
}

pub struct SearchController {
    provider: SearchProvider,
    normalizer: Arc<ParameterNormalizer>,
    cache: Arc<ResultCache>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl SearchController {
    pub fn new(
        provider: SearchProvider,
        normalizer: Arc<ParameterNormalizer>,
        cache: Arc<ResultCache>,
        config: SessionConfig,
    ) -> Self {
        Self {
            provider,
            normalizer,
            clock: cache.clock(),
            cache,
            config,
            inner: Mutex::new(Inner {
                state: SearchState::Idle,
                generation: 0,
                last_request: None,
            }),
        }
    }

    pub fn domain(&self) -> SearchDomain {
        self.provider.domain()
    }

    pub fn state(&self) -> SearchState {
        self.inner.lock().state.clone()
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.inner.lock().state, SearchState::Searching { .. })
    }

    // The request "Refresh" would replay
    pub fn last_request(&self) -> Option<NormalizedRequest> {
        self.inner.lock().last_request.clone()
    }

    /// Page-load restore: from `Idle`, a live cached result moves straight to
    /// `Success` without a provider call.
    pub fn restore(&self) -> Option<Arc<SearchResult>> {
        let domain = self.domain();
        let mut inner = self.inner.lock();
        if !matches!(inner.state, SearchState::Idle) {
            return None;
        }

        if inner.last_request.is_none() {
            inner.last_request = self
                .cache
                .get::<NormalizedRequest>(&CacheKey::params(domain))
                .filter(|request| request.domain() == domain);
        }

        let result = self
            .cache
            .get::<SearchResult>(&CacheKey::results(domain))
            .filter(|result| result.domain() == domain)?;
        let result = Arc::new(result);
        info!(domain = %domain, results = result.len(), "restored cached search results");
        inner.state = SearchState::Success(Arc::clone(&result));
        Some(result)
    }

    pub async fn submit(&self, query: &SearchQuery) -> SubmitOutcome {
        if self.is_searching() {
            debug!(domain = %self.domain(), "search already in flight; ignoring submit");
            return SubmitOutcome::Ignored;
        }
        if query.domain() != self.domain() {
            return SubmitOutcome::Invalid(ValidationError::single(
                Field::Domain,
                FieldErrorKind::DomainMismatch,
            ));
        }

        let today = self.clock.now().date_naive();
        match self.normalizer.normalize(query, today) {
            Ok(request) => self.execute(request).await,
            Err(errors) => {
                debug!(errors = %errors, "search input rejected");
                SubmitOutcome::Invalid(errors)
            }
        }
    }

    /// Replays the last request verbatim, from memory or the params cache entry.
    pub async fn refresh(&self) -> SubmitOutcome {
        let domain = self.domain();
        let remembered = {
            let inner = self.inner.lock();
            if matches!(inner.state, SearchState::Searching { .. }) {
                return SubmitOutcome::Ignored;
            }
            inner.last_request.clone()
        };
        let request = remembered.or_else(|| {
            self.cache
                .get::<NormalizedRequest>(&CacheKey::params(domain))
                .filter(|request| request.domain() == domain)
        });

        match request {
            Some(request) => self.execute(request).await,
            None => SubmitOutcome::NothingToRefresh,
        }
    }

    /// Back to `Idle` from any state, dropping both cache entries. Any search
    /// still in flight will have its response discarded.
    pub fn clear(&self) {
        let domain = self.domain();
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = SearchState::Idle;
        inner.last_request = None;
        let results = self.cache.clear(&CacheKey::results(domain));
        let params = self.cache.clear(&CacheKey::params(domain));
        info!(domain = %domain, results, params, "cleared search results");
    }

    async fn execute(&self, request: NormalizedRequest) -> SubmitOutcome {
        let in_flight = {
            let mut inner = self.inner.lock();
            if matches!(inner.state, SearchState::Searching { .. }) {
                return SubmitOutcome::Ignored;
            }
            inner.generation += 1;
            let previous = std::mem::replace(
                &mut inner.state,
                SearchState::Searching {
                    request: request.clone(),
                },
            );
            InFlight::new(&self.inner, inner.generation, previous)
        };
        let generation = in_flight.generation;

        let domain = self.domain();
        info!(domain = %domain, generation, "search started");
        let timeout = self.config.request_timeout;
        let outcome = tokio::time::timeout(timeout, self.provider.search(&request, self.clock.as_ref()))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(timeout.as_millis() as u64)));
        in_flight.disarm();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(domain = %domain, generation, current = inner.generation, "discarding stale search response");
            return SubmitOutcome::Discarded;
        }

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                if let Err(err) = self
                    .cache
                    .put(&CacheKey::results(domain), &*result, self.config.results_ttl)
                {
                    warn!(error = %err, "could not cache search results");
                }
                if let Err(err) = self
                    .cache
                    .put(&CacheKey::params(domain), &request, self.config.params_ttl)
                {
                    warn!(error = %err, "could not cache search parameters");
                }
                info!(domain = %domain, results = result.len(), "search succeeded");
                inner.state = SearchState::Success(Arc::clone(&result));
                inner.last_request = Some(request);
                SubmitOutcome::Completed(result)
            }
            Err(error) => {
                let failure = SearchFailure::from(&error);
                warn!(domain = %domain, error = %error, kind = ?failure.kind, "search failed");
                inner.state = SearchState::Failed(failure.clone());
                inner.last_request = Some(request);
                SubmitOutcome::Failed(failure)
            }
        }
    }
}
