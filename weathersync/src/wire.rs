//! Wire format
//!
//! Outbound: `{"lat": <f64>, "lon": <f64>}` and nothing else.
//! Inbound: any JSON object; see [`WeatherPayload`].

use crate::error::SyncError;
use crate::location::Location;
use crate::payload::WeatherPayload;

/// Serialize a location update.
pub fn encode_location(location: &Location) -> Result<String, SyncError> {
    serde_json::to_string(location).map_err(|e| SyncError::Encode(e.to_string()))
}

/// Decode an inbound text frame.
///
/// Fails with [`SyncError::Protocol`] when the frame is not JSON or not a
/// JSON object. Unknown or missing nested fields are accepted.
pub fn decode_payload(raw: &str) -> Result<WeatherPayload, SyncError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| SyncError::Protocol(e.to_string()))?;
    WeatherPayload::from_value(value)
        .ok_or_else(|| SyncError::Protocol("payload is not a JSON object".to_string()))
}
