//! Validation errors for user input reaching the planner.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("meal name must not be empty")]
    EmptyMealName,
    #[error("unknown meal {0}")]
    UnknownMeal(Uuid),
    #[error("invalid clock time {hour:02}:{minute:02}")]
    InvalidClockTime { hour: u32, minute: u32 },
    #[error("could not parse clock time '{0}' (expected HH:MM)")]
    UnparsableClockTime(String),
    #[error("weekday must be 1 (Sunday) to 7 (Saturday), got {0}")]
    InvalidWeekday(u8),
    #[error("invalid holiday date {month}/{day}")]
    InvalidHolidayDate { month: u32, day: u32 },
    #[error("unknown meal kind '{0}'")]
    UnknownMealKind(String),
}
