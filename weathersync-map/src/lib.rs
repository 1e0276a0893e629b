//! Terminal host for weathersync
//!
//! Draws a world map with a marker at the current location and a popup with
//! the latest weather report. Clicking the map (mouse, or Enter at the
//! crosshair) moves the location; the weather follows over the socket.
//!
//! The binary wires these pieces to a [`weathersync::SyncRuntime`]; the
//! library half exists so the UI can be tested without a terminal.

pub mod app;
pub mod components;
pub mod input;
pub mod logging;
pub mod reconnect;
pub mod testing;

pub use app::MapApp;
pub use components::Component;
pub use input::{spawn_event_poller, HostEvent};
pub use reconnect::Backoff;
