//! The sync controller: the reducer that ties location, connection and view
//! together
//!
//! Two rules carry the protocol:
//!
//! - A location change is written to the view immediately and sent if the
//!   connection is open. It is never queued; when the connection opens, the
//!   *current* location is sent exactly once.
//! - An inbound payload from the live session replaces the displayed
//!   weather. Payloads carry no location tag, so the most recent one wins
//!   even if it was requested for an earlier location.

use crate::action::SyncAction;
use crate::config::{SyncConfig, WeatherRetention};
use crate::connection::SessionId;
use crate::effect::{DispatchResult, Notice, SyncEffect};
use crate::error::SyncError;
use crate::location::{LocationChanged, LocationOrigin};
use crate::state::SyncState;
use crate::store::{EffectStore, LoggingMiddleware};

/// The store the runtime drives.
pub type SyncController = EffectStore<SyncState, SyncAction, SyncEffect, LoggingMiddleware>;

/// Build a controller in its initial state: default location, no weather,
/// connection closed.
pub fn sync_controller(config: &SyncConfig) -> SyncController {
    EffectStore::with_middleware(SyncState::new(config), reducer, LoggingMiddleware)
}

pub fn reducer(state: &mut SyncState, action: SyncAction) -> DispatchResult<SyncEffect> {
    match action {
        // ===== Location =====
        SyncAction::LocationRequest => DispatchResult::effect(SyncEffect::Geolocate),

        SyncAction::LocationDidResolve(location) => on_location_changed(
            state,
            LocationChanged::new(location, LocationOrigin::Device),
        ),

        SyncAction::LocationDidFail(error) => {
            tracing::warn!(error = %error, "Device location unavailable");
            DispatchResult::effect(SyncEffect::Notify(Notice::LocationFailed(error)))
        }

        SyncAction::LocationChange(change) => on_location_changed(state, change),

        // ===== Map =====
        SyncAction::MapClick(point) => match LocationChanged::from_map_click(point) {
            Ok(change) => {
                on_location_changed(state, change).with(SyncEffect::PanMap(change.location))
            }
            Err(error) => {
                tracing::debug!(lat = point.lat, lng = point.lng, "Ignoring click outside the map");
                DispatchResult::effect(SyncEffect::Notify(Notice::LocationFailed(error)))
            }
        },

        // ===== Connection =====
        SyncAction::ConnectionOpen => match state.connection.open() {
            Ok(session) => {
                tracing::info!(session = %session, endpoint = %state.connection.endpoint(), "Connecting");
                DispatchResult::changed_with(SyncEffect::Connect {
                    session,
                    endpoint: state.connection.endpoint().clone(),
                })
            }
            Err(current) => {
                tracing::debug!(state = %current, "Open ignored");
                DispatchResult::unchanged()
            }
        },

        SyncAction::ConnectionDidOpen(session) => {
            let id = session.id();
            if !state.connection.attach(session) {
                return DispatchResult::unchanged();
            }
            tracing::info!(session = %id, "Connection open");

            // The location may have changed while connecting; send where we are now.
            let location = state.view.location();
            if let Err(e) = state.connection.send(&location) {
                tracing::warn!(session = %id, error = %e, "Initial location send failed");
            }
            DispatchResult::changed_with(SyncEffect::Notify(Notice::Connected))
        }

        SyncAction::ConnectionDidFail { session, error } => {
            if !state.connection.abort(session) {
                tracing::debug!(session = %session, "Ignoring failure of stale attempt");
                return DispatchResult::unchanged();
            }
            tracing::warn!(session = %session, error = %error, "Connection failed");
            DispatchResult::changed_with(SyncEffect::Notify(Notice::ConnectFailed(error)))
        }

        SyncAction::ConnectionDidReceive { session, text } => {
            on_payload_received(state, session, &text)
        }

        SyncAction::ConnectionDidLose { session, reason } => {
            if !state.connection.lose(session) {
                return DispatchResult::unchanged();
            }
            tracing::info!(session = %session, %reason, "Connection lost");
            DispatchResult::changed_with(SyncEffect::Notify(Notice::Disconnected { reason }))
        }

        SyncAction::ConnectionClose => close(state).with(SyncEffect::Notify(Notice::Closed)),

        // ===== Weather =====
        SyncAction::WeatherRefresh => {
            if state.connection.is_open() {
                let location = state.view.location();
                if let Err(e) = state.connection.send(&location) {
                    tracing::warn!(error = %e, "Refresh send failed");
                }
            }
            DispatchResult::unchanged()
        }

        // ===== Global =====
        SyncAction::Shutdown => close(state),
    }
}

fn on_location_changed(state: &mut SyncState, change: LocationChanged) -> DispatchResult<SyncEffect> {
    let LocationChanged { location, origin } = change;
    tracing::debug!(lat = location.lat(), lon = location.lon(), ?origin, "Location changed");

    state.view.set_location(location);
    if state.retention == WeatherRetention::Reset {
        state.view.clear_weather();
    }

    match state.connection.send(&location) {
        Ok(()) => {}
        Err(SyncError::NotConnected { state: current }) => {
            tracing::debug!(state = %current, "Location not sent; connection not open");
        }
        Err(e) => tracing::warn!(error = %e, "Location send failed"),
    }

    DispatchResult::changed()
}

fn on_payload_received(
    state: &mut SyncState,
    session: SessionId,
    text: &str,
) -> DispatchResult<SyncEffect> {
    if !state.connection.is_live(session) {
        tracing::debug!(session = %session, "Dropping frame from stale session");
        return DispatchResult::unchanged();
    }

    match state.connection.on_message(text) {
        Ok(payload) => {
            if state.view.weather() == Some(&payload) {
                return DispatchResult::unchanged();
            }
            state.view.set_weather(payload);
            DispatchResult::changed()
        }
        Err(e) => {
            tracing::warn!(session = %session, error = %e, "Discarding malformed payload");
            DispatchResult::unchanged()
        }
    }
}

fn close(state: &mut SyncState) -> DispatchResult<SyncEffect> {
    if state.connection.close() {
        tracing::info!("Connection closed");
        DispatchResult::changed()
    } else {
        DispatchResult::unchanged()
    }
}
