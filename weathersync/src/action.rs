//! Actions: every intent and every async result that can change sync state

use std::fmt::Debug;

use crate::connection::{Session, SessionId};
use crate::error::{LocationError, SyncError};
use crate::location::{Location, LocationChanged, MapPoint};

/// Marker trait for actions that can be dispatched to the controller
///
/// Actions are the only way state changes. They should be:
/// - Clone: actions may be logged or replayed in tests
/// - Debug: for logging
/// - Send + 'static: async results are sent back across tasks
///
/// Use `#[derive(Action)]` to implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// Variant name, for logging and filtering
    fn name(&self) -> &'static str;
}

/// Category of an action, usually generated by
/// `#[derive(Action)] #[action(infer_categories)]`.
pub trait ActionCategory: Action {
    fn category(&self) -> Option<&'static str>;
}

/// One-line description used by [`LoggingMiddleware`](crate::LoggingMiddleware).
///
/// Defaults to the `Debug` output. Override for actions carrying large
/// payloads.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// Everything that can happen to the sync controller.
///
/// Intents are named after what is asked (`ConnectionOpen`, `MapClick`).
/// Results of async work use a `Did` infix (`ConnectionDidOpen`) and carry
/// the [`SessionId`] of the attempt that produced them.
#[derive(weathersync_macros::Action, Clone, Debug)]
#[action(infer_categories)]
pub enum SyncAction {
    // ===== Location =====
    /// Ask the device for its position once
    LocationRequest,
    LocationDidResolve(Location),
    LocationDidFail(LocationError),
    /// A location supplied by the host
    LocationChange(LocationChanged),

    // ===== Map =====
    /// A raw click on the map
    MapClick(MapPoint),

    // ===== Connection =====
    ConnectionOpen,
    ConnectionClose,
    ConnectionDidOpen(Session),
    ConnectionDidFail {
        session: SessionId,
        error: SyncError,
    },
    /// One inbound text frame
    ConnectionDidReceive {
        session: SessionId,
        text: String,
    },
    /// The server closed the socket or the socket failed
    ConnectionDidLose {
        session: SessionId,
        reason: String,
    },

    // ===== Weather =====
    /// Re-send the current location
    WeatherRefresh,

    // ===== Global =====
    Shutdown,
}

impl ActionSummary for SyncAction {
    fn summary(&self) -> String {
        match self {
            SyncAction::ConnectionDidReceive { session, text } => {
                format!("ConnectionDidReceive {{ session: {session}, bytes: {} }}", text.len())
            }
            SyncAction::ConnectionDidOpen(session) => {
                format!("ConnectionDidOpen {{ session: {} }}", session.id())
            }
            other => format!("{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_categories() {
        assert_eq!(SyncAction::ConnectionOpen.name(), "ConnectionOpen");
        assert_eq!(SyncAction::ConnectionOpen.category(), Some("connection"));
        assert_eq!(
            SyncAction::LocationDidFail(LocationError::Timeout).category(),
            Some("location")
        );
        assert_eq!(
            SyncAction::MapClick(MapPoint::new(0.0, 0.0)).category(),
            Some("map")
        );
        assert_eq!(SyncAction::WeatherRefresh.category(), Some("weather"));
        assert_eq!(SyncAction::Shutdown.category(), None);
    }

    #[test]
    fn test_category_predicates() {
        let lose = SyncAction::ConnectionDidLose {
            session: SessionId::new(1),
            reason: "gone".into(),
        };
        assert!(lose.is_connection());
        assert!(!lose.is_location());
        assert_eq!(
            SyncAction::CATEGORIES,
            &["connection", "location", "map", "weather"]
        );
    }

    #[test]
    fn test_summary_hides_frame_body() {
        let action = SyncAction::ConnectionDidReceive {
            session: SessionId::new(3),
            text: "x".repeat(4096),
        };
        assert_eq!(
            action.summary(),
            "ConnectionDidReceive { session: #3, bytes: 4096 }"
        );
        assert_eq!(SyncAction::Shutdown.summary(), "Shutdown");
    }
}
