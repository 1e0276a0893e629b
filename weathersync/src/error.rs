//! Error taxonomy
//!
//! None of these are fatal. Each one is either absorbed by the controller
//! (keeping the last good state) or surfaced to the host as a [`Notice`].
//!
//! Errors are `Clone` because they travel inside actions and effects.
//!
//! [`Notice`]: crate::effect::Notice

use crate::connection::ConnectionState;

/// Device geolocation or map-click failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location request timed out")]
    Timeout,
    #[error("coordinates out of range: lat={lat}, lon={lon}")]
    OutOfRange { lat: f64, lon: f64 },
}

/// Errors raised by the synchronization core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Location(#[from] LocationError),

    /// A send was attempted while the connection was not open. The message is dropped.
    #[error("not connected (connection is {state})")]
    NotConnected { state: ConnectionState },

    /// An inbound frame could not be decoded into a weather payload.
    #[error("malformed weather payload: {0}")]
    Protocol(String),

    /// The connection closed without the client asking for it.
    #[error("connection lost: {reason}")]
    Disconnected { reason: String },

    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to encode location: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        let err = SyncError::NotConnected {
            state: ConnectionState::Connecting,
        };
        assert_eq!(err.to_string(), "not connected (connection is connecting)");
    }

    #[test]
    fn test_location_error_is_transparent() {
        let err: SyncError = LocationError::Timeout.into();
        assert_eq!(err.to_string(), "location request timed out");
    }
}
