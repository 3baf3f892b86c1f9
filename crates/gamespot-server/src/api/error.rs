//! HTTP error mapping. Every failure renders as `{"error": message}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::booking::BookingError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be read as JSON.
    #[error("Invalid JSON body: {0}")]
    BadBody(String),

    #[error("Request body too large: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge(rejection.body_text())
        } else {
            Self::BadBody(rejection.body_text())
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadBody(_) => StatusCode::BAD_REQUEST,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Booking(err) => match err {
                BookingError::Validation(_) | BookingError::AlreadyBooked(_) => {
                    StatusCode::BAD_REQUEST
                }
                BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BookingError::Relay(relay) if relay.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                BookingError::Relay(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use gamespot_relay::RelayError;

    use super::*;
    use crate::storage::DatabaseError;

    fn status_of(err: BookingError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn booking_errors_map_to_statuses() {
        assert_eq!(
            status_of(BookingError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BookingError::AlreadyBooked("PS5 #1".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BookingError::NotFound("PS5 #9".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DatabaseError::Query("disk I/O error".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn relay_timeouts_and_failures_are_gateway_errors() {
        let timeout = RelayError::Timeout {
            console: "PS5 #4".into(),
            timeout_ms: 3000,
        };
        let network = RelayError::Network {
            console: "PS5 #4".into(),
            message: "connection refused".into(),
        };
        assert_eq!(status_of(timeout.into()), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_of(network.into()), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn not_found_from_storage_keeps_console_name() {
        let err: BookingError = DatabaseError::NotFound("Console PS5 #9".into()).into();
        assert_eq!(err.to_string(), "Console not found: PS5 #9");
    }
}
