//! Inbound weather payloads
//!
//! The payload is opaque to the core: it is stored and handed to renderers
//! as received. The accessors below only read the fields the popup shows;
//! missing or oddly typed fields come back as `None` and are the renderer's
//! concern, not a protocol error.

use serde::Serialize;
use serde_json::Value;

/// A weather report as sent by the service.
///
/// Always wraps a JSON object. Immutable once received.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeatherPayload(Value);

impl WeatherPayload {
    /// Wrap a parsed JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        value.is_object().then_some(Self(value))
    }

    /// The raw JSON document.
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str)
    }

    fn f64_at(&self, pointer: &str) -> Option<f64> {
        self.0.pointer(pointer).and_then(Value::as_f64)
    }

    pub fn condition_text(&self) -> Option<&str> {
        self.str_at("/current/condition/text")
    }

    pub fn condition_icon(&self) -> Option<&str> {
        self.str_at("/current/condition/icon")
    }

    pub fn temp_c(&self) -> Option<f64> {
        self.f64_at("/current/temp_c")
    }

    pub fn precip_mm(&self) -> Option<f64> {
        self.f64_at("/current/precip_mm")
    }

    pub fn wind_kph(&self) -> Option<f64> {
        self.f64_at("/current/wind_kph")
    }

    pub fn humidity(&self) -> Option<f64> {
        self.f64_at("/current/humidity")
    }

    pub fn air_quality_co(&self) -> Option<f64> {
        self.f64_at("/current/air_quality/co")
    }

    /// Resolved place name (`location.name`).
    pub fn place_name(&self) -> Option<&str> {
        self.str_at("/location/name")
    }

    /// Whether the report has the sections a popup needs to render.
    pub fn is_renderable(&self) -> bool {
        self.0.get("current").is_some_and(Value::is_object)
            && self.0.get("location").is_some_and(Value::is_object)
    }
}
