//! Device geolocation boundary
//!
//! The core asks for the current position once per [`LocationRequest`] and
//! never tracks continuously. A [`Geolocator`] is a black box: it either
//! resolves to a [`Location`] or fails with a [`LocationError`].
//!
//! [`LocationRequest`]: crate::SyncAction::LocationRequest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::LocationError;
use crate::location::Location;

/// One-shot source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Location, LocationError>;
}

/// A geolocator that always answers the same way.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    result: Result<Location, LocationError>,
}

impl FixedGeolocator {
    pub fn at(location: Location) -> Self {
        Self {
            result: Ok(location),
        }
    }

    pub fn failing(error: LocationError) -> Self {
        Self { result: Err(error) }
    }

    /// A geolocator for hosts without any positioning capability.
    pub fn unavailable() -> Self {
        Self::failing(LocationError::Unavailable(
            "geolocation disabled".to_string(),
        ))
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Location, LocationError> {
        self.result.clone()
    }
}

/// Default lookup service (ip-api compatible response shape).
pub const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Response body of an ip-api style lookup
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Approximate device position from the host's public IP address.
///
/// This is what "device geolocation" means for a terminal host: there is no
/// GPS, so the network location is the best the platform offers.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Location, LocationError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LocationError::PermissionDenied)
            }
            status if !status.is_success() => {
                return Err(LocationError::Unavailable(format!(
                    "lookup returned status {status}"
                )))
            }
            _ => {}
        }

        let body: IpLookupResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(e.to_string())
            }
        })?;

        parse_lookup(body)
    }
}

fn parse_lookup(body: IpLookupResponse) -> Result<Location, LocationError> {
    if body.status != "success" {
        return Err(LocationError::Unavailable(
            body.message.unwrap_or(body.status),
        ));
    }
    match (body.lat, body.lon) {
        (Some(lat), Some(lon)) => Location::new(lat, lon),
        _ => Err(LocationError::Unavailable(
            "lookup response has no coordinates".to_string(),
        )),
    }
}
