//! Locations and the two origins that produce them
//!
//! A [`Location`] is always valid: latitude in [-90, 90], longitude in
//! [-180, 180], both finite. Device geolocation and map clicks are the only
//! writers, and both are normalized into a [`LocationChanged`] event.

use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// A validated latitude/longitude pair.
///
/// Serializes to exactly `{"lat": <f64>, "lon": <f64>}`, which is also the
/// outbound wire message.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawLocation {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Location::new(raw.lat, raw.lon)
    }
}

impl Location {
    /// Create a location, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if valid {
            Ok(Self { lat, lon })
        } else {
            Err(LocationError::OutOfRange { lat, lon })
        }
    }

    /// For compile-time constants already known to be in range.
    pub(crate) const fn from_trusted(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// A raw click coordinate as reported by the map (`lng`, not `lon`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lng: f64,
}

impl MapPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Convert to a [`Location`].
    ///
    /// A map panned across the antimeridian reports longitudes past ±180;
    /// those are wrapped into [-180, 180). Latitude is never wrapped.
    pub fn to_location(self) -> Result<Location, LocationError> {
        if !self.lng.is_finite() {
            return Err(LocationError::OutOfRange {
                lat: self.lat,
                lon: self.lng,
            });
        }
        let lon = if (-180.0..=180.0).contains(&self.lng) {
            self.lng
        } else {
            (self.lng + 180.0).rem_euclid(360.0) - 180.0
        };
        Location::new(self.lat, lon)
    }
}

impl From<Location> for MapPoint {
    fn from(location: Location) -> Self {
        Self {
            lat: location.lat,
            lng: location.lon,
        }
    }
}

/// Where a location change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationOrigin {
    /// One-shot device geolocation.
    Device,
    /// A click on the map.
    Map,
    /// Injected by the host application.
    Host,
}

/// The single event both location sources are normalized into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationChanged {
    pub location: Location,
    pub origin: LocationOrigin,
}

impl LocationChanged {
    pub fn new(location: Location, origin: LocationOrigin) -> Self {
        Self { location, origin }
    }

    /// Normalize a map click. Fails if the point has an invalid latitude.
    pub fn from_map_click(point: MapPoint) -> Result<Self, LocationError> {
        Ok(Self::new(point.to_location()?, LocationOrigin::Map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_bounds() {
        assert!(Location::new(90.0, 180.0).is_ok());
        assert!(Location::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Location::new(90.5, 0.0),
            Err(LocationError::OutOfRange { lat: 90.5, lon: 0.0 })
        );
        assert!(Location::new(0.0, 180.1).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
        assert!(Location::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_location_serializes_to_lat_lon_only() {
        let loc = Location::new(19.685263273173724, 72.77755737304689).unwrap();
        let json = serde_json::to_value(loc).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["lat"], 19.685263273173724);
        assert_eq!(obj["lon"], 72.77755737304689);
    }

    #[test]
    fn test_location_deserialize_validates() {
        let ok: Location = serde_json::from_str(r#"{"lat": 10.0, "lon": 20.0}"#).unwrap();
        assert_eq!(ok, Location::new(10.0, 20.0).unwrap());

        let bad = serde_json::from_str::<Location>(r#"{"lat": 100.0, "lon": 20.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_map_point_wraps_longitude() {
        let loc = MapPoint::new(10.0, 190.0).to_location().unwrap();
        assert!((loc.lon() - -170.0).abs() < 1e-9);

        let loc = MapPoint::new(10.0, -540.0).to_location().unwrap();
        assert!((loc.lon() - -180.0).abs() < 1e-9);

        let loc = MapPoint::new(10.0, 180.0).to_location().unwrap();
        assert_eq!(loc.lon(), 180.0);
    }

    #[test]
    fn test_map_point_rejects_bad_latitude() {
        assert!(MapPoint::new(-91.0, 0.0).to_location().is_err());
        assert!(MapPoint::new(0.0, f64::NAN).to_location().is_err());
    }

    #[test]
    fn test_from_map_click_origin() {
        let change = LocationChanged::from_map_click(MapPoint::new(1.0, 2.0)).unwrap();
        assert_eq!(change.origin, LocationOrigin::Map);
        assert_eq!(change.location, Location::new(1.0, 2.0).unwrap());
    }
}
