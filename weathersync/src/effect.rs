//! Effects: side effects declared by the reducer
//!
//! The reducer never does I/O. It mutates state and returns a
//! [`DispatchResult`] listing the work to do; the runtime performs
//! [`SyncEffect::Connect`] and [`SyncEffect::Geolocate`] itself and hands
//! the rest to the host.
//!
//! ```ignore
//! fn reducer(state: &mut SyncState, action: SyncAction) -> DispatchResult<SyncEffect> {
//!     match action {
//!         SyncAction::LocationRequest => DispatchResult::effect(SyncEffect::Geolocate),
//!         // ...
//!     }
//! }
//! ```

use std::fmt;

use crate::config::Endpoint;
use crate::connection::SessionId;
use crate::error::{LocationError, SyncError};
use crate::location::Location;

/// Result of dispatching an action.
///
/// Contains both the state change indicator and any effects to be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult<E> {
    /// Whether the state was modified by this action.
    pub changed: bool,
    /// Effects to be processed after dispatch, in order.
    pub effects: Vec<E>,
}

impl<E> Default for DispatchResult<E> {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl<E> DispatchResult<E> {
    #[inline]
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            effects: vec![],
        }
    }

    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            effects: vec![],
        }
    }

    /// A single effect and no state change.
    #[inline]
    pub fn effect(effect: E) -> Self {
        Self {
            changed: false,
            effects: vec![effect],
        }
    }

    /// State changed, with a single effect.
    #[inline]
    pub fn changed_with(effect: E) -> Self {
        Self {
            changed: true,
            effects: vec![effect],
        }
    }

    /// Add an effect to this result.
    #[inline]
    pub fn with(mut self, effect: E) -> Self {
        self.effects.push(effect);
        self
    }

    #[inline]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Combine two results: changed if either changed, effects in order.
    pub fn merge(mut self, other: DispatchResult<E>) -> Self {
        self.changed |= other.changed;
        self.effects.extend(other.effects);
        self
    }

    #[inline]
    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }
}

/// Work requested by the sync reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    /// Open a socket for `session`; report back with
    /// `ConnectionDidOpen` or `ConnectionDidFail`.
    Connect {
        session: SessionId,
        endpoint: Endpoint,
    },
    /// Ask the geolocator for the device position once.
    Geolocate,
    /// Re-centre the map on a location (map clicks only).
    PanMap(Location),
    /// Something the user should be told about.
    Notify(Notice),
}

/// User-facing status changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Connected,
    ConnectFailed(SyncError),
    Disconnected { reason: String },
    LocationFailed(LocationError),
    /// The user closed the connection. Sent on every close request, even
    /// when nothing was open.
    Closed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connected => f.write_str("connected"),
            Notice::ConnectFailed(e) => write!(f, "connection failed: {e}"),
            Notice::Disconnected { reason } => write!(f, "disconnected: {reason}"),
            Notice::LocationFailed(e) => write!(f, "location unavailable: {e}"),
            Notice::Closed => f.write_str("closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEffect {
        Log(String),
        Save,
    }

    #[test]
    fn test_dispatch_result_builders() {
        let r: DispatchResult<TestEffect> = DispatchResult::unchanged();
        assert!(!r.changed);
        assert!(!r.has_effects());

        let r: DispatchResult<TestEffect> = DispatchResult::changed();
        assert!(r.changed);
        assert!(r.effects.is_empty());

        let r = DispatchResult::effect(TestEffect::Save);
        assert!(!r.changed);
        assert_eq!(r.effects, vec![TestEffect::Save]);

        let r = DispatchResult::changed_with(TestEffect::Save);
        assert!(r.changed);
        assert!(r.has_effects());
    }

    #[test]
    fn test_dispatch_result_chaining() {
        let r: DispatchResult<TestEffect> = DispatchResult::unchanged()
            .with(TestEffect::Save)
            .mark_changed();
        assert!(r.changed);
        assert_eq!(r.effects, vec![TestEffect::Save]);
    }

    #[test]
    fn test_merge_keeps_order() {
        let a = DispatchResult::effect(TestEffect::Log("a".into()));
        let b = DispatchResult::changed_with(TestEffect::Save);
        let merged = a.merge(b);
        assert!(merged.changed);
        assert_eq!(
            merged.effects,
            vec![TestEffect::Log("a".into()), TestEffect::Save]
        );
    }

    #[test]
    fn test_notice_display() {
        assert_eq!(Notice::Connected.to_string(), "connected");
        assert_eq!(
            Notice::Disconnected {
                reason: "bye".into()
            }
            .to_string(),
            "disconnected: bye"
        );
        assert_eq!(Notice::Closed.to_string(), "closed");
    }
}
