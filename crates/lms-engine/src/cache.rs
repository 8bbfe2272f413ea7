//! Short-lived in-process caches with lazy expiry.
//!
//! Entries are never swept in the background: freshness is judged from the
//! entry age when it is read, and an expired entry reads as a miss.
//!
//! Every invalidation bumps the cache epoch. A value computed from reads that
//! started before an invalidation is dropped by [`TtlCache::insert_if_unchanged`]
//! instead of being cached.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use lms_db::models::AchievementDefinition;

use crate::{clock::Clock, metrics, progress::CourseProgress};

/// Expired entries are pruned on insert once the cache holds this many keys
const PRUNE_THRESHOLD: usize = 10_000;

/// Achievement catalog, stored under a single key
pub type CatalogCache = TtlCache<(), Arc<Vec<AchievementDefinition>>>;

/// Aggregated course progress per learner id
pub type ProgressCache = TtlCache<String, Arc<Vec<CourseProgress>>>;

/// Outcome of a cache read: the value (if any) and whether it is still fresh.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

impl<V> CacheLookup<V> {
    pub const fn found(&self) -> bool {
        !matches!(self, Self::Miss)
    }

    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    pub fn into_fresh(self) -> Option<V> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Stale(_) | Self::Miss => None,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    epoch: AtomicU64,
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh_at(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // An entry stored "in the future" (clock moved back) counts as brand new
        let age = (now - stored_at).to_std().unwrap_or(Duration::ZERO);
        age < self.ttl
    }

    /// Read an entry without recording metrics
    pub fn lookup(&self, key: &K) -> CacheLookup<V> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        match entries.get(key) {
            Some(entry) if self.is_fresh_at(entry.stored_at, now) => {
                CacheLookup::Fresh(entry.value.clone())
            }
            Some(entry) => CacheLookup::Stale(entry.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.lookup(key).into_fresh();
        metrics::record_cache_lookup(self.name, value.is_some());
        value
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.store_entry(&mut entries, key, value);
    }

    /// Number of invalidations so far
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Insert only if nothing was invalidated since `epoch` was read.
    /// Returns whether the value was stored.
    pub fn insert_if_unchanged(&self, key: K, value: V, epoch: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        self.store_entry(&mut entries, key, value);
        true
    }

    fn store_entry(&self, entries: &mut HashMap<K, CacheEntry<V>>, key: K, value: V) {
        let now = self.clock.now();
        if entries.len() >= PRUNE_THRESHOLD {
            entries.retain(|_, entry| self.is_fresh_at(entry.stored_at, now));
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    /// Drop the entry for `key`, returns whether one was present
    pub fn invalidate(&self, key: &K) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(clock: &ManualClock) -> TtlCache<String, u32> {
        TtlCache::new("test", Duration::from_secs(15), Arc::new(clock.clone()))
    }

    #[test]
    fn test_lookup_reports_freshness() {
        let clock = ManualClock::new(Utc::now());
        let cache = cache(&clock);

        assert_eq!(cache.lookup(&"u1".to_string()), CacheLookup::Miss);

        cache.insert("u1".to_string(), 7);
        assert_eq!(cache.lookup(&"u1".to_string()), CacheLookup::Fresh(7));

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get(&"u1".to_string()), Some(7));

        clock.advance(Duration::from_secs(6));
        let stale = cache.lookup(&"u1".to_string());
        assert!(stale.found());
        assert!(!stale.is_fresh());
        assert_eq!(cache.get(&"u1".to_string()), None);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let clock = ManualClock::new(Utc::now());
        let cache = cache(&clock);
        cache.insert("u1".to_string(), 1);

        clock.advance(Duration::from_millis(14_999));
        assert_eq!(cache.get(&"u1".to_string()), Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get(&"u1".to_string()), None);
    }

    #[test]
    fn test_invalidate() {
        let clock = ManualClock::new(Utc::now());
        let cache = cache(&clock);
        cache.insert("u1".to_string(), 1);

        assert!(cache.invalidate(&"u1".to_string()));
        assert!(!cache.invalidate(&"u1".to_string()));
        assert_eq!(cache.lookup(&"u1".to_string()), CacheLookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_after_invalidation_is_dropped() {
        let clock = ManualClock::new(Utc::now());
        let cache = cache(&clock);
        let epoch = cache.epoch();

        // Nothing cached yet, the invalidation still counts
        assert!(!cache.invalidate(&"u1".to_string()));
        assert!(!cache.insert_if_unchanged("u1".to_string(), 1, epoch));
        assert!(cache.is_empty());

        let epoch = cache.epoch();
        assert!(cache.insert_if_unchanged("u1".to_string(), 2, epoch));
        assert_eq!(cache.get(&"u1".to_string()), Some(2));
    }

    #[test]
    fn test_insert_overwrites_and_refreshes() {
        let clock = ManualClock::new(Utc::now());
        let cache = cache(&clock);
        cache.insert("u1".to_string(), 1);

        clock.advance(Duration::from_secs(20));
        cache.insert("u1".to_string(), 2);

        assert_eq!(cache.get(&"u1".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
