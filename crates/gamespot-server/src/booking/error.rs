//! Booking engine errors.

use gamespot_relay::RelayError;
use thiserror::Error;

use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or missing input. Nothing was changed.
    #[error("{0}")]
    Validation(String),

    #[error("Console {0} is already booked")]
    AlreadyBooked(String),

    #[error("Console not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),

    /// Only surfaced when the relay action was the requested operation.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl From<DatabaseError> for BookingError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => {
                Self::NotFound(what.strip_prefix("Console ").unwrap_or(&what).to_string())
            }
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
