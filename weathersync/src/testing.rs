//! Test utilities for code built on weathersync
//!
//! - [`SyncHarness`]: drives the real reducer with an in-memory session, no
//!   sockets or runtime needed
//! - Assertion macros for effect lists: [`assert_emitted!`],
//!   [`assert_not_emitted!`], [`find_emitted!`], [`count_emitted!`]
//!
//! # Example
//!
//! ```
//! use weathersync::testing::SyncHarness;
//! use weathersync::{assert_emitted, Notice, SyncEffect};
//!
//! let mut h = SyncHarness::new();
//! let session = h.begin_open().unwrap();
//! h.click(48.85, 2.35);
//! h.complete_open(session);
//!
//! assert_eq!(h.sent(), vec![r#"{"lat":48.85,"lon":2.35}"#.to_string()]);
//! assert_emitted!(h.drain_effects(), SyncEffect::Notify(Notice::Connected));
//! ```

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::SyncAction;
use crate::config::SyncConfig;
use crate::connection::{ConnectionState, Session, SessionId};
use crate::controller::{sync_controller, SyncController};
use crate::effect::SyncEffect;
use crate::error::SyncError;
use crate::location::MapPoint;
use crate::state::{SyncState, ViewState};

/// Deterministic driver for the sync reducer.
///
/// Effects are collected instead of performed. A completed open installs an
/// in-memory [`Session`] whose outbound queue can be read with
/// [`sent`](Self::sent).
pub struct SyncHarness {
    store: SyncController,
    effects: Vec<SyncEffect>,
    outbound: Option<mpsc::UnboundedReceiver<String>>,
    session: Option<Session>,
}

impl SyncHarness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            store: sync_controller(&config),
            effects: Vec::new(),
            outbound: None,
            session: None,
        }
    }

    /// Dispatch an action, keeping its effects. Returns whether state changed.
    pub fn dispatch(&mut self, action: SyncAction) -> bool {
        let result = self.store.dispatch(action);
        self.effects.extend(result.effects);
        result.changed
    }

    pub fn state(&self) -> &SyncState {
        self.store.state()
    }

    pub fn view(&self) -> &ViewState {
        self.state().view()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state().connection().state()
    }

    /// The last session handed to the controller.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Dispatch `ConnectionOpen` and return the session the resulting
    /// `Connect` effect asks for, if one was requested.
    pub fn begin_open(&mut self) -> Option<SessionId> {
        let result = self.store.dispatch(SyncAction::ConnectionOpen);
        let session = result.effects.iter().find_map(|e| match e {
            SyncEffect::Connect { session, .. } => Some(*session),
            _ => None,
        });
        self.effects.extend(result.effects);
        session
    }

    /// Report a successful handshake for `id`.
    ///
    /// The returned handle shows whether the controller accepted the session
    /// (a rejected one is closed immediately).
    pub fn complete_open(&mut self, id: SessionId) -> Session {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(id, tx, CancellationToken::new());
        self.outbound = Some(rx);
        self.session = Some(session.clone());
        self.dispatch(SyncAction::ConnectionDidOpen(session.clone()));
        session
    }

    /// Report a failed handshake for `id`.
    pub fn fail_open(&mut self, id: SessionId, reason: &str) {
        let endpoint = self.state().connection().endpoint().to_string();
        self.dispatch(SyncAction::ConnectionDidFail {
            session: id,
            error: SyncError::Connect {
                endpoint,
                reason: reason.to_string(),
            },
        });
    }

    /// Open the connection end to end.
    ///
    /// # Panics
    ///
    /// Panics if the controller does not request a connection, i.e. it was
    /// not `Closed`.
    pub fn open(&mut self) -> SessionId {
        let id = self
            .begin_open()
            .unwrap_or_else(|| panic!("open not accepted in state {}", self.connection_state()));
        self.complete_open(id);
        id
    }

    fn current_session(&self) -> SessionId {
        self.state()
            .connection()
            .session_id()
            .unwrap_or(SessionId::new(0))
    }

    /// Deliver an inbound frame on the current session.
    pub fn deliver(&mut self, raw: &str) -> bool {
        let session = self.current_session();
        self.deliver_from(session, raw)
    }

    /// Deliver an inbound frame stamped with an explicit session.
    pub fn deliver_from(&mut self, session: SessionId, raw: &str) -> bool {
        self.dispatch(SyncAction::ConnectionDidReceive {
            session,
            text: raw.to_string(),
        })
    }

    /// Report that the current session dropped.
    pub fn lose(&mut self, reason: &str) -> bool {
        let session = self.current_session();
        self.dispatch(SyncAction::ConnectionDidLose {
            session,
            reason: reason.to_string(),
        })
    }

    /// Click the map at `lat`/`lng`.
    pub fn click(&mut self, lat: f64, lng: f64) -> bool {
        self.dispatch(SyncAction::MapClick(MapPoint::new(lat, lng)))
    }

    /// Drain the text frames queued on the current in-memory session.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        if let Some(rx) = self.outbound.as_mut() {
            while let Ok(frame) = rx.try_recv() {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drain all effects collected so far.
    pub fn drain_effects(&mut self) -> Vec<SyncEffect> {
        std::mem::take(&mut self.effects)
    }
}

impl Default for SyncHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that an effect (or action) matching a pattern is in the list.
///
/// ```ignore
/// assert_emitted!(h.drain_effects(), SyncEffect::Notify(Notice::Connected));
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($items:expr, $pattern:pat $(if $guard:expr)?) => {{
        let items = &$items;
        assert!(
            items.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected item matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            items
        );
    }};
}

/// Assert that nothing in the list matches a pattern.
#[macro_export]
macro_rules! assert_not_emitted {
    ($items:expr, $pattern:pat $(if $guard:expr)?) => {{
        let items = &$items;
        assert!(
            !items.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected item matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            items
        );
    }};
}

/// Find the first item matching a pattern.
#[macro_export]
macro_rules! find_emitted {
    ($items:expr, $pattern:pat $(if $guard:expr)?) => {
        $items.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count the items matching a pattern.
#[macro_export]
macro_rules! count_emitted {
    ($items:expr, $pattern:pat $(if $guard:expr)?) => {
        $items.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}
