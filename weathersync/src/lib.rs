//! weathersync: keep a weather view in sync with a moving location
//!
//! A user picks a point (device geolocation or a map click); the point is
//! sent to a weather service over one persistent WebSocket, and whatever the
//! service sends back becomes the displayed weather.
//!
//! # Core Concepts
//!
//! - **ConnectionManager**: the `Closed -> Connecting -> Open -> Closing`
//!   state machine around the socket
//! - **Controller**: the reducer that owns [`ViewState`] and the connection
//! - **Geolocator**: one-shot device location
//! - **SyncRuntime**: the serialized loop that feeds actions to the reducer
//!   and performs its effects
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use weathersync::prelude::*;
//!
//! let mut runtime = SyncRuntime::new(SyncConfig::default(), Arc::new(FixedGeolocator::unavailable()));
//! runtime.enqueue(SyncAction::ConnectionOpen);
//! runtime.enqueue(SyncAction::LocationRequest);
//!
//! runtime
//!     .run(
//!         events_rx,
//!         |state| draw(state),
//!         |event, _state| map_event(event),
//!         |effect, ctx| handle_effect(effect, ctx),
//!     )
//!     .await?;
//! ```
//!
//! # Correlation
//!
//! Payloads carry no location tag. Within a live connection the most recent
//! payload wins, even if it answers an earlier location. Frames from a
//! connection that has since been closed or replaced are dropped.

extern crate self as weathersync;

pub mod action;
pub mod config;
pub mod connection;
pub mod controller;
pub mod effect;
pub mod error;
pub mod geolocation;
pub mod location;
pub mod payload;
pub mod runtime;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod tasks;
pub mod testing;
pub mod wire;

// Core trait exports
pub use action::{Action, ActionCategory, ActionSummary, SyncAction};

// Derive macro
pub use weathersync_macros::Action;

pub use config::{Endpoint, SyncConfig, WeatherRetention};
pub use connection::{ConnectionManager, ConnectionState, Session, SessionId};
pub use controller::{reducer, sync_controller, SyncController};
pub use effect::{DispatchResult, Notice, SyncEffect};
pub use error::{LocationError, SyncError};
pub use geolocation::{FixedGeolocator, Geolocator, IpGeolocator};
pub use location::{Location, LocationChanged, LocationOrigin, MapPoint};
pub use payload::WeatherPayload;
pub use runtime::{EffectContext, EventOutcome, SyncRuntime};
pub use state::{SyncState, ViewState, WeatherStatus};
pub use store::{EffectReducer, EffectStore, LoggingMiddleware, Middleware};
pub use subscriptions::{SubKey, Subscriptions};
pub use tasks::{TaskKey, TaskManager};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionCategory, SyncAction};
    pub use crate::config::{SyncConfig, WeatherRetention};
    pub use crate::connection::ConnectionState;
    pub use crate::effect::{Notice, SyncEffect};
    pub use crate::error::{LocationError, SyncError};
    pub use crate::geolocation::{FixedGeolocator, Geolocator, IpGeolocator};
    pub use crate::location::{Location, MapPoint};
    pub use crate::payload::WeatherPayload;
    pub use crate::runtime::{EffectContext, EventOutcome, SyncRuntime};
    pub use crate::state::{SyncState, ViewState, WeatherStatus};
}
