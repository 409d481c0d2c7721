//! Error types for slot-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Indices of the rejected day entries. For a submitted form these index the
    /// caller's list; for a stored schedule they are Monday-first weekday indices.
    #[error("Invalid schedule days: {0:?}")]
    InvalidDays(Vec<usize>),

    #[error("Malformed schedule input: {0}")]
    MalformedInput(String),

    #[error("Date {date} is before the earliest bookable date {earliest}")]
    DateBeforeMinimum { date: NaiveDate, earliest: NaiveDate },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure reported by the booking store or provider persistence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage backend: {0}")]
    Backend(String),
}

/// Failure reported by an external calendar adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("credential refresh failed: {0}")]
    Refresh(String),

    #[error("busy query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
