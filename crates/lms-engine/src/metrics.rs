//! Engine metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host process installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

/// Record a cache read
pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };

    counter!(
        "engine_cache_lookups_total",
        "cache" => cache,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a caller that joined an in-flight computation instead of starting one
pub fn record_coalesced(kind: &'static str) {
    counter!("engine_coalesced_requests_total", "kind" => kind).increment(1);
}

/// Record a store call that failed and was degraded
pub fn record_store_failure(operation: &'static str) {
    counter!("engine_store_failures_total", "operation" => operation).increment(1);
}

pub fn record_achievement_granted(category: &str) {
    counter!(
        "engine_achievements_granted_total",
        "category" => category.to_string()
    )
    .increment(1);
}

pub fn record_aggregation(duration: Duration) {
    histogram!("engine_progress_aggregation_seconds").record(duration.as_secs_f64());
}
