//! Runtime configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::SyncError;
use crate::location::Location;

/// Default weather service endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Default location shown before geolocation or a map click (Palghar, India).
pub const DEFAULT_LAT: f64 = 19.685263273173724;
pub const DEFAULT_LON: f64 = 72.77755737304689;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_GEOLOCATION_TIMEOUT_SECS: u64 = 10;

/// A validated weather service endpoint.
///
/// Only plain `ws://` is accepted; TLS, auth and subprotocols are the host's concern.
/// The string is kept as given once it parses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self, SyncError> {
        let invalid = |reason: String| SyncError::InvalidEndpoint {
            endpoint: s.to_string(),
            reason,
        };
        let url = Url::parse(s).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "ws" {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(DEFAULT_ENDPOINT.to_string())
    }
}

impl FromStr for Endpoint {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happens to the displayed weather when the location changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WeatherRetention {
    /// Keep showing the previous report until a new one arrives (no flicker).
    #[default]
    Retain,
    /// Drop the previous report immediately and show "loading".
    Reset,
}

/// Configuration for [`SyncRuntime`](crate::SyncRuntime).
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub endpoint: Endpoint,
    pub default_location: Location,
    pub retention: WeatherRetention,
    pub connect_timeout: Duration,
    pub geolocation_timeout: Duration,
    /// Re-send the current location periodically while connected.
    pub refresh_interval: Option<Duration>,
}

impl SyncConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn with_default_location(mut self, location: Location) -> Self {
        self.default_location = location;
        self
    }

    pub fn with_retention(mut self, retention: WeatherRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            default_location: default_location(),
            retention: WeatherRetention::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            geolocation_timeout: Duration::from_secs(DEFAULT_GEOLOCATION_TIMEOUT_SECS),
            refresh_interval: None,
        }
    }
}

/// The built-in starting location.
pub fn default_location() -> Location {
    Location::from_trusted(DEFAULT_LAT, DEFAULT_LON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        assert_eq!(Endpoint::default().as_str(), "ws://localhost:8080");
        assert!(Endpoint::parse(DEFAULT_ENDPOINT).is_ok());
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        assert!(matches!(
            Endpoint::parse("wss://example.com"),
            Err(SyncError::InvalidEndpoint { .. })
        ));
        assert!(Endpoint::parse("http://example.com").is_err());
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn test_endpoint_from_str() {
        let endpoint: Endpoint = "ws://127.0.0.1:9000/weather".parse().unwrap();
        assert_eq!(endpoint.to_string(), "ws://127.0.0.1:9000/weather");
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.default_location.lat(), DEFAULT_LAT);
        assert_eq!(config.default_location.lon(), DEFAULT_LON);
        assert_eq!(config.retention, WeatherRetention::Retain);
        assert!(config.refresh_interval.is_none());
        assert!(Location::new(DEFAULT_LAT, DEFAULT_LON).is_ok());
    }
}
