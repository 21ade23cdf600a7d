//! Field-level validation shared by all entities.

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

/// Earliest and latest calendar years a timestamp may carry. Both stores
/// keep times as four-digit-year text.
pub const TIME_MIN_YEAR: i32 = 1;
pub const TIME_MAX_YEAR: i32 = 9999;

/// A malformed input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains invalid characters: {value:?}")]
    InvalidCharacters { field: &'static str, value: String },

    #[error("{field} must be a finite, non-negative number")]
    Negative { field: &'static str },

    #[error("{field} must lie between years {min} and {max}")]
    YearOutOfRange {
        field: &'static str,
        min: i32,
        max: i32,
    },

    #[error("{field} must be at most {max} seconds")]
    TooLarge { field: &'static str, max: u64 },
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

pub(crate) fn require_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub(crate) fn require_storable_time(
    field: &'static str,
    time: &DateTime<Utc>,
) -> Result<(), ValidationError> {
    if !(TIME_MIN_YEAR..=TIME_MAX_YEAR).contains(&time.year()) {
        return Err(ValidationError::YearOutOfRange {
            field,
            min: TIME_MIN_YEAR,
            max: TIME_MAX_YEAR,
        });
    }
    Ok(())
}
