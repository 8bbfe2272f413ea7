//! Level curve for accumulated points.

/// Minimum points needed to reach levels 2 through 8.
pub const LEVEL_THRESHOLDS: [i64; 7] = [100, 250, 500, 1_000, 2_000, 5_000, 10_000];

/// Highest reachable level.
pub const MAX_LEVEL: i32 = LEVEL_THRESHOLDS.len() as i32 + 1;

/// Compute the level for a point total.
///
/// # Algorithm
///
/// * < 100: level 1
/// * < 250: level 2
/// * < 500: level 3
/// * < 1000: level 4
/// * < 2000: level 5
/// * < 5000: level 6
/// * < 10000: level 7
/// * otherwise: level 8
///
/// Negative totals stay at level 1.
pub fn level_for_points(points: i64) -> i32 {
    let reached = LEVEL_THRESHOLDS
        .iter()
        .take_while(|&&threshold| points >= threshold)
        .count();

    reached as i32 + 1
}

/// Points still missing before the next level, or `None` at the top level.
pub fn points_to_next_level(points: i64) -> Option<i64> {
    LEVEL_THRESHOLDS
        .iter()
        .find(|&&threshold| points < threshold)
        .map(|threshold| threshold - points.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(249), 2);
        assert_eq!(level_for_points(250), 3);
        assert_eq!(level_for_points(499), 3);
        assert_eq!(level_for_points(500), 4);
        assert_eq!(level_for_points(999), 4);
        assert_eq!(level_for_points(1_000), 5);
        assert_eq!(level_for_points(1_999), 5);
        assert_eq!(level_for_points(2_000), 6);
        assert_eq!(level_for_points(4_999), 6);
        assert_eq!(level_for_points(5_000), 7);
        assert_eq!(level_for_points(9_999), 7);
        assert_eq!(level_for_points(10_000), 8);
        assert_eq!(level_for_points(1_000_000), MAX_LEVEL);
    }

    #[test]
    fn test_negative_points_stay_at_first_level() {
        assert_eq!(level_for_points(-50), 1);
        assert_eq!(points_to_next_level(-50), Some(100));
    }

    #[test]
    fn test_points_to_next_level() {
        assert_eq!(points_to_next_level(0), Some(100));
        assert_eq!(points_to_next_level(120), Some(130));
        assert_eq!(points_to_next_level(9_999), Some(1));
        assert_eq!(points_to_next_level(10_000), None);
    }
}
