//! In-memory release list cache with expiry and single-flight fetching
//!
//! Each upstream filter owns a slot holding the resolved entry and a fetch lock. Fresh
//! entries are read under the short map lock alone. On a miss the fetch lock is held for the
//! whole aggregation, so concurrent callers of the same filter wait for the in-flight fetch
//! and then read its result instead of starting their own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::release::aggregator::aggregate;
use crate::release::error::FetchError;
use crate::release::fetcher::ReleaseFetcher;
use crate::release::types::{Release, ReleaseFilter};

/// Source of the current time for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone)]
struct CacheEntry {
    releases: Arc<Vec<Release>>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    /// Held for the whole aggregation of this filter
    fetch_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Slot {
    /// Someone other than the map holds the fetch lock handle
    fn is_busy(&self) -> bool {
        Arc::strong_count(&self.fetch_lock) > 1
    }
}

enum Lookup {
    Hit(Arc<Vec<Release>>),
    Miss(Arc<tokio::sync::Mutex<()>>),
}

pub struct ReleaseCache {
    fetcher: Arc<dyn ReleaseFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    page_size: usize,
    slots: Mutex<HashMap<ReleaseFilter, Slot>>,
}

impl ReleaseCache {
    pub fn new(fetcher: Arc<dyn ReleaseFetcher>, ttl: Duration, page_size: usize) -> Self {
        Self {
            fetcher,
            clock: Arc::new(SystemClock),
            ttl,
            page_size,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the clock used for expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fetcher(&self) -> &Arc<dyn ReleaseFetcher> {
        &self.fetcher
    }

    /// The map only ever gains or loses whole slots, so a poisoned lock is still usable
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<ReleaseFilter, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the fresh entry for `filter`, or the fetch lock to take on a miss
    ///
    /// Adding a new filter first drops idle slots without a fresh entry, so failed and
    /// expired keys do not accumulate.
    fn lookup(&self, filter: &ReleaseFilter) -> Lookup {
        let now = self.clock.now();
        let mut slots = self.lock_slots();

        if !slots.contains_key(filter) {
            slots.retain(|_, slot| {
                slot.is_busy() || slot.entry.as_ref().is_some_and(|e| e.is_fresh(now))
            });
        }

        let slot = slots.entry(filter.clone()).or_default();
        match &slot.entry {
            Some(entry) if entry.is_fresh(now) => Lookup::Hit(Arc::clone(&entry.releases)),
            _ => Lookup::Miss(Arc::clone(&slot.fetch_lock)),
        }
    }

    fn fresh_entry(&self, filter: &ReleaseFilter) -> Option<Arc<Vec<Release>>> {
        let now = self.clock.now();
        self.lock_slots()
            .get(filter)
            .and_then(|slot| slot.entry.as_ref())
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| Arc::clone(&entry.releases))
    }

    /// Return the cached releases for `filter`, aggregating them from upstream on a miss
    ///
    /// Only complete aggregations are stored. A partial result is returned to this caller
    /// and the next caller fetches again.
    pub async fn get_or_fetch(
        &self,
        filter: &ReleaseFilter,
    ) -> Result<Arc<Vec<Release>>, FetchError> {
        let fetch_lock = match self.lookup(filter) {
            Lookup::Hit(releases) => {
                debug!("Cache hit for {:?}", filter);
                return Ok(releases);
            }
            Lookup::Miss(fetch_lock) => fetch_lock,
        };

        let _fetching = fetch_lock.lock().await;

        // Filled by the caller we waited on
        if let Some(releases) = self.fresh_entry(filter) {
            debug!("Cache filled for {:?} while waiting", filter);
            return Ok(releases);
        }

        let aggregation = aggregate(self.fetcher.as_ref(), filter, self.page_size).await?;
        let releases = Arc::new(aggregation.releases);

        if aggregation.complete {
            info!("Cached {} releases for {:?}", releases.len(), filter);
            let entry = CacheEntry {
                releases: Arc::clone(&releases),
                expires_at: self.clock.now() + self.ttl,
            };
            self.lock_slots().entry(filter.clone()).or_default().entry = Some(entry);
        } else {
            warn!(
                "Not caching partial result of {} releases for {:?}",
                releases.len(),
                filter
            );
        }

        Ok(releases)
    }

    /// Drop the entry for `filter` so the next access fetches again
    pub fn invalidate(&self, filter: &ReleaseFilter) {
        self.lock_slots().remove(filter);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock_slots().clear();
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock_slots().len()
    }
}
