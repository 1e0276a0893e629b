//! Controller-owned state
//!
//! [`ViewState`] is what renderers read. Only the reducer writes it; the
//! setters are crate-private.

use crate::config::{SyncConfig, WeatherRetention};
use crate::connection::ConnectionManager;
use crate::location::Location;
use crate::payload::WeatherPayload;

/// The renderer's view of the current weather.
///
/// No payload yet is `Loading`, never an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeatherStatus<'a> {
    Loading,
    Ready(&'a WeatherPayload),
}

/// The current location and the most recent weather report.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    location: Location,
    weather: Option<WeatherPayload>,
}

impl ViewState {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            weather: None,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// The last payload received, which may have been requested for an
    /// earlier location.
    pub fn weather(&self) -> Option<&WeatherPayload> {
        self.weather.as_ref()
    }

    pub fn weather_status(&self) -> WeatherStatus<'_> {
        match &self.weather {
            Some(payload) => WeatherStatus::Ready(payload),
            None => WeatherStatus::Loading,
        }
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub(crate) fn set_weather(&mut self, payload: WeatherPayload) {
        self.weather = Some(payload);
    }

    /// Returns true if there was a payload to drop.
    pub(crate) fn clear_weather(&mut self) -> bool {
        self.weather.take().is_some()
    }
}

/// Everything the sync reducer owns.
#[derive(Debug)]
pub struct SyncState {
    pub(crate) view: ViewState,
    pub(crate) connection: ConnectionManager,
    pub(crate) retention: WeatherRetention,
}

impl SyncState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            view: ViewState::new(config.default_location),
            connection: ConnectionManager::new(config.endpoint.clone()),
            retention: config.retention,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn retention(&self) -> WeatherRetention {
        self.retention
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}
