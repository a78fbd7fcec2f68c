use chrono::NaiveDate;
use thiserror::Error;

/// Failures caused by the shape of NeoWs data rather than by transport or I/O
#[derive(Debug, Error)]
pub enum NeoError {
    /// A record lacks a required field, or the field has an unusable type.
    /// Carries the offending record and the whole batch for diagnosis.
    #[error("unexpected NEO record, field `{field}` is missing or invalid")]
    MalformedRecord {
        field: String,
        record: String,
        batch: String,
    },

    /// The response is not a `near_earth_objects` date mapping
    #[error("unexpected NEO feed response: {reason}")]
    MalformedBatch { reason: String, batch: String },

    #[error("feed window {start}..={end} spans more than 7 days")]
    WindowTooLong { start: NaiveDate, end: NaiveDate },

    #[error("feed window {start}..={end} ends before it starts")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}
