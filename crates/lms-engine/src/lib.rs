//! Progress & achievement engine.
//!
//! Reconstructs a learner's course progress from enrollment records,
//! evaluates the achievement catalog against the learner's statistics,
//! grants achievements at most once and ranks learners by points.
//!
//! Every public operation is fail-open: store failures degrade the result
//! (empty lists, zeroed fields) and are logged, they never reach the caller.
//! Reads are cached for a short time and concurrent identical requests are
//! coalesced into a single store round trip.

pub mod cache;
pub mod clock;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod grant;
pub mod leaderboard;
pub mod metrics;
pub mod progress;

use std::{fmt, sync::Arc};

use lms_db::{DataSource, StoreResult, models::AchievementDefinition};

pub use cache::{CacheLookup, CatalogCache, ProgressCache, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::InFlightRegistry;
pub use config::EngineConfig;
pub use error::EngineError;
pub use leaderboard::LeaderboardEntry;
pub use progress::CourseProgress;

use crate::grant::GrantKey;

type CatalogResult = Result<Arc<Vec<AchievementDefinition>>, EngineError>;
type ProgressResult = Result<Arc<Vec<CourseProgress>>, EngineError>;

/// Shared engine state: store handle, caches and in-flight registries.
///
/// Build one per process and share it behind an `Arc`.
pub struct ProgressEngine {
    store: Arc<dyn DataSource>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    catalog_cache: CatalogCache,
    progress_cache: ProgressCache,
    catalog_flights: InFlightRegistry<(), CatalogResult>,
    progress_flights: InFlightRegistry<String, ProgressResult>,
    grant_flights: InFlightRegistry<GrantKey, Arc<Vec<AchievementDefinition>>>,
}

impl fmt::Debug for ProgressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEngine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn DataSource>, config: EngineConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn DataSource>, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog_cache: TtlCache::new("catalog", config.catalog_ttl, clock.clone()),
            progress_cache: TtlCache::new("progress", config.progress_ttl, clock.clone()),
            catalog_flights: InFlightRegistry::new("catalog"),
            progress_flights: InFlightRegistry::new("progress"),
            grant_flights: InFlightRegistry::new("grant"),
            store,
            clock,
            config,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn progress_cache(&self) -> &ProgressCache {
        &self.progress_cache
    }

    pub const fn catalog_cache(&self) -> &CatalogCache {
        &self.catalog_cache
    }

    /// Forget the cached progress of a learner
    pub fn invalidate_progress(&self, user_id: &str) -> bool {
        match normalize_id(user_id) {
            Some(user_id) => self.progress_cache.invalidate(&user_id.to_string()),
            None => false,
        }
    }

    /// Achievement catalog ordered by ascending points, empty if unavailable
    pub async fn achievement_catalog(&self) -> Arc<Vec<AchievementDefinition>> {
        match self.catalog().await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(error = %err, "Achievement catalog unavailable");
                Arc::default()
            }
        }
    }

    /// Cached, coalesced catalog fetch
    pub(crate) async fn catalog(&self) -> CatalogResult {
        if let Some(catalog) = self.catalog_cache.get(&()) {
            return Ok(catalog);
        }

        self.catalog_flights
            .coalesce((), move || async move {
                // Another caller may have filled the cache while we queued
                if let Some(catalog) = self.catalog_cache.lookup(&()).into_fresh() {
                    return Ok(catalog);
                }

                let mut catalog = self
                    .store
                    .list_achievement_catalog()
                    .await
                    .inspect_err(|_| metrics::record_store_failure("list_achievement_catalog"))?;
                // Stable sort keeps the store order among equal point values
                catalog.sort_by_key(|entry| entry.points);

                let catalog = Arc::new(catalog);
                self.catalog_cache.insert((), catalog.clone());
                Ok::<_, EngineError>(catalog)
            })
            .await
    }
}

/// Trim an identifier, `None` when nothing is left
pub fn normalize_id(id: &str) -> Option<&str> {
    let trimmed = id.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Unwrap a secondary store read, falling back to the default value
pub(crate) fn or_degraded<T: Default>(operation: &'static str, user_id: &str, result: StoreResult<T>) -> T {
    result.unwrap_or_else(|err| {
        metrics::record_store_failure(operation);
        tracing::warn!(user_id, operation, error = %err, "Store read failed, using default");
        T::default()
    })
}
