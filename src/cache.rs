// Result cache: holds the last search results and parameters for one browsing session
// Values are kept as JSON text, the same shape a cookie would carry, and expire lazily on read

use crate::clock::{Clock, SystemClock};
use crate::models::SearchDomain;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cached value for {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Value for {key} could not be serialized: {reason}")]
    Serialize { key: String, reason: String },
}

// Counters for the cache
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub corrupt_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub cleared_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub corrupt_count: usize,
    pub write_count: usize,
    pub cleared_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    LastSearchResults,
    LastSearchParams,
}

impl CacheSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSlot::LastSearchResults => "lastSearchResults",
            CacheSlot::LastSearchParams => "lastSearchParams",
        }
    }
}

/// Identifies one persisted entry: which slot, for which search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub slot: CacheSlot,
    pub domain: SearchDomain,
}

impl CacheKey {
    pub fn results(domain: SearchDomain) -> Self {
        Self {
            slot: CacheSlot::LastSearchResults,
            domain,
        }
    }

    pub fn params(domain: SearchDomain) -> Self {
        Self {
            slot: CacheSlot::LastSearchParams,
            domain,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&create_cache_key(self.slot, self.domain))
    }
}

pub fn create_cache_key(slot: CacheSlot, domain: SearchDomain) -> String {
    format!("{}:{}", slot.as_str(), domain.as_str())
}

struct CacheEntry {
    payload: String,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    // Live up to and including stored_at + ttl
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => false,
        }
    }
}

pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            stats: CacheStats::default(),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value).map_err(|e| CacheError::Serialize {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.put_raw(key, payload, ttl);
        Ok(())
    }

    // Stores already-encoded text as-is; a session restored from elsewhere arrives this way
    pub fn put_raw(&self, key: &CacheKey, payload: impl Into<String>, ttl: Duration) {
        let key = key.to_string();
        let entry = CacheEntry {
            payload: payload.into(),
            stored_at: self.clock.now(),
            ttl,
        };
        debug!(key = %key, ttl_secs = ttl.as_secs(), "storing cache entry");
        self.entries.insert(key, entry);
        self.stats.write_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the live value for `key`. Expired and corrupt entries read as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let now = self.clock.now();
        let key = key.to_string();

        // The map guard has to be released before any removal below
        let lookup = self.entries.get(&key).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.payload.clone())
            }
        });

        let payload = match lookup {
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                return Ok(None);
            }
            Some(None) => {
                if self.entries.remove_if(&key, |_, entry| entry.is_expired(now)).is_some() {
                    self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
                }
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                debug!(key = %key, "cache entry expired");
                return Ok(None);
            }
            Some(Some(payload)) => payload,
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                Ok(Some(value))
            }
            Err(e) => {
                self.entries.remove_if(&key, |_, entry| entry.payload == payload);
                self.stats.corrupt_count.fetch_add(1, Ordering::SeqCst);
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                Err(CacheError::Corrupt {
                    key,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Removes the entry; returns whether one was present.
    pub fn clear(&self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(&key.to_string()).is_some();
        if removed {
            self.stats.cleared_count.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            corrupt_count: self.stats.corrupt_count.load(Ordering::SeqCst),
            write_count: self.stats.write_count.load(Ordering::SeqCst),
            cleared_count: self.stats.cleared_count.load(Ordering::SeqCst),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::fixtures::flight_offer;
    use crate::models::SearchResult;
    use chrono::TimeZone;
    use std::thread;

    fn manual_cache() -> (Arc<ManualClock>, ResultCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        ));
        let cache = ResultCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_put_then_get_within_ttl_returns_equal_value() {
        let (clock, cache) = manual_cache();
        let key = CacheKey::results(SearchDomain::Flights);
        let result = SearchResult::flights(vec![flight_offer("1", 250.0)], clock.now());

        cache.put(&key, &result, Duration::from_secs(3600)).unwrap();
        clock.advance(Duration::from_secs(3600));

        let cached: Option<SearchResult> = cache.get(&key);
        assert_eq!(cached, Some(result));
    }

    #[test]
    fn test_entry_is_absent_one_second_after_ttl() {
        let (clock, cache) = manual_cache();
        let key = CacheKey::results(SearchDomain::Flights);

        cache.put(&key, &"payload", Duration::from_secs(3600)).unwrap();
        clock.advance(Duration::from_secs(3601));

        assert_eq!(cache.get::<String>(&key), None);
        // Logically deleted: the expired read removed it
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_put_replaces_entry_and_restarts_ttl() {
        let (clock, cache) = manual_cache();
        let key = CacheKey::params(SearchDomain::Accommodations);

        cache.put(&key, &vec![1, 2, 3], Duration::from_secs(60)).unwrap();
        clock.advance(Duration::from_secs(50));
        cache.put(&key, &vec![4], Duration::from_secs(60)).unwrap();
        clock.advance(Duration::from_secs(50));

        assert_eq!(cache.get::<Vec<i32>>(&key), Some(vec![4]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss_and_is_evicted() {
        let (_clock, cache) = manual_cache();
        let key = CacheKey::results(SearchDomain::Flights);
        cache.put_raw(&key, "{\"kind\": \"flights\", \"offers\": [", Duration::from_secs(3600));

        let err = cache.try_get::<SearchResult>(&key).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
        assert!(cache.is_empty());

        cache.put_raw(&key, "not json", Duration::from_secs(3600));
        assert_eq!(cache.get::<SearchResult>(&key), None);
        assert_eq!(cache.stats().corrupt_count, 2);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_clock, cache) = manual_cache();
        let key = CacheKey::results(SearchDomain::Flights);
        cache.put(&key, &"x", Duration::from_secs(10)).unwrap();

        assert!(cache.clear(&key));
        assert!(!cache.clear(&key));
        assert_eq!(cache.get::<String>(&key), None);
        assert_eq!(cache.stats().cleared_count, 1);
    }

    #[test]
    fn test_keys_are_scoped_by_slot_and_domain() {
        assert_eq!(
            CacheKey::results(SearchDomain::Flights).to_string(),
            "lastSearchResults:flights"
        );
        assert_eq!(
            CacheKey::params(SearchDomain::Accommodations).to_string(),
            "lastSearchParams:accommodations"
        );

        let (_clock, cache) = manual_cache();
        cache
            .put(&CacheKey::results(SearchDomain::Flights), &1, Duration::from_secs(10))
            .unwrap();
        assert_eq!(
            cache.get::<i32>(&CacheKey::results(SearchDomain::Accommodations)),
            None
        );
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(ResultCache::with_system_clock());
        let domains = [SearchDomain::Flights, SearchDomain::Accommodations];

        let mut handles = vec![];
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..500 {
                    let key = CacheKey::results(domains[(i + j) % 2]);
                    if j % 3 == 0 {
                        cache.put(&key, &(i, j), Duration::from_secs(60)).unwrap();
                    } else if j % 7 == 0 {
                        cache.clear(&key);
                    } else {
                        let _ = cache.get::<(usize, usize)>(&key);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 2);
        let stats = cache.stats();
        assert_eq!(stats.corrupt_count, 0);
        assert!(stats.write_count > 0);
    }
}
