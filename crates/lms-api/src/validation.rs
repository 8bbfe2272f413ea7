use lms_rules::LeaderboardPeriod;

use crate::error::ApiError;

/// Parse a leaderboard period from a path segment
///
/// # Examples
/// ```
/// use lms_api::validation::parse_period;
///
/// assert!(parse_period("weekly").is_ok());
/// assert!(parse_period("yearly").is_err());
/// ```
pub fn parse_period(raw: &str) -> Result<LeaderboardPeriod, ApiError> {
    raw.parse::<LeaderboardPeriod>()
        .map_err(|err| ApiError::Validation(err.to_string()))
}

/// Normalize an optional course id from a request body, blank meaning none
pub fn course_context(course_id: Option<&str>) -> Option<&str> {
    course_id.map(str::trim).filter(|course| !course.is_empty())
}
