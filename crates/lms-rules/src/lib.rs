//! Gamification rules for the learning platform.
//!
//! This crate holds the pure, I/O-free parts of the progress engine: the
//! achievement requirement types and their evaluation, the level curve, the
//! leaderboard time windows and study-streak computation. Everything here is
//! deterministic and cheap to call from request handlers.

pub mod level;
pub mod period;
pub mod requirement;
pub mod streak;

pub use level::{LEVEL_THRESHOLDS, MAX_LEVEL, level_for_points, points_to_next_level};
pub use period::{LeaderboardPeriod, ParsePeriodError};
pub use requirement::{LearnerStats, RequirementType, Rule, is_satisfied};
pub use streak::current_streak;
