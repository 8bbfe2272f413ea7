//! Study streak computation.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

/// Count consecutive active days ending today.
///
/// A streak is still alive when the last activity was yesterday, so a learner
/// who has not studied yet today keeps their count until the day is over.
pub fn current_streak(active_days: &[NaiveDate], today: NaiveDate) -> i64 {
    let days: BTreeSet<NaiveDate> = active_days.iter().copied().collect();
    let yesterday = today - Duration::days(1);

    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}
