use thiserror::Error;

/// Errors raised by the alarm and challenge core.
///
/// The application shell wraps these in `anyhow::Error`; the core itself never
/// falls back to a default value on bad input.
#[derive(Debug, Error)]
pub enum NoozeError {
    #[error("repeat set is empty, no weekday to schedule on")]
    InvalidSchedule,

    #[error("malformed date '{0}', expected YYYY-MM-DD")]
    MalformedDate(String),

    #[error("invalid wake time '{0}', expected HH:MM between 00:00 and 23:59")]
    InvalidWakeTime(String),

    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),

    #[error("unknown day status '{0}', expected completed, missed or pending")]
    UnknownStatus(String),

    #[error("challenge duration must be 90 or 365 days, got {0}")]
    InvalidDuration(u32),

    #[error("no alarm with id {0}")]
    AlarmNotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NoozeError>;
