//! Connection lifecycle
//!
//! [`ConnectionManager`] owns the one logical connection to the weather
//! service and the state machine around it:
//!
//! ```text
//! Closed -> Connecting -> Open -> Closing -> Closed
//!                 \_________________/
//!                  (connect failed or closed while connecting)
//! ```
//!
//! The manager itself does no I/O. [`connect`] performs the WebSocket
//! handshake and spawns two pumps for the resulting [`Session`]: one
//! writes queued outbound text, one forwards inbound frames to the action
//! queue. Every session has its own [`SessionId`]; actions carrying an id
//! that is not the live session are ignored, so frames arriving after
//! `close()` never reach the view.

use std::fmt;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::action::SyncAction;
use crate::config::Endpoint;
use crate::error::SyncError;
use crate::location::Location;
use crate::payload::WeatherPayload;
use crate::wire;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle state of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Closed, Connecting)
                | (Connecting, Open)
                | (Connecting, Closing)
                | (Open, Closing)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        })
    }
}

/// Identifies one connection attempt and the socket it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an established connection.
///
/// Cheap to clone. Outbound text goes into an unbounded queue, so pushing
/// never blocks. Cancelling the token closes the socket and stops both pumps.
#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl Session {
    /// Build a session around an outbound queue. [`connect`] does this for
    /// real sockets; custom transports and tests can do it directly.
    pub fn new(
        id: SessionId,
        outbound: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            outbound,
            cancel,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether this session has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn close(&self) {
        self.cancel.cancel();
    }

    fn push(&self, text: String) -> bool {
        !self.is_closed() && self.outbound.send(text).is_ok()
    }
}

/// Owner of the single connection to the weather service.
///
/// Exactly one instance lives inside the controller state. Dropping it
/// closes any live session.
#[derive(Debug)]
pub struct ConnectionManager {
    endpoint: Endpoint,
    state: ConnectionState,
    /// Attempt in flight while `Connecting`
    pending: Option<SessionId>,
    /// Live socket while `Open`
    session: Option<Session>,
    next_id: u64,
}

impl ConnectionManager {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            state: ConnectionState::Closed,
            pending: None,
            session: None,
            next_id: 1,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// The attempt in flight or the live session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id).or(self.pending)
    }

    /// Start opening: `Closed -> Connecting`.
    ///
    /// Returns the id the connect attempt must report back with. From any
    /// other state this is a no-op and the current state is returned.
    pub fn open(&mut self) -> Result<SessionId, ConnectionState> {
        if self.state != ConnectionState::Closed {
            return Err(self.state);
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.pending = Some(id);
        self.transition(ConnectionState::Connecting);
        Ok(id)
    }

    /// Complete an attempt: `Connecting -> Open`.
    ///
    /// A session for an attempt that is no longer pending (closed or
    /// superseded meanwhile) is closed and rejected.
    pub fn attach(&mut self, session: Session) -> bool {
        if self.state != ConnectionState::Connecting || self.pending != Some(session.id()) {
            tracing::debug!(session = %session.id(), state = %self.state, "Discarding stale session");
            session.close();
            return false;
        }
        self.pending = None;
        self.session = Some(session);
        self.transition(ConnectionState::Open);
        true
    }

    /// A connect attempt failed: `Connecting -> Closing -> Closed`.
    pub fn abort(&mut self, id: SessionId) -> bool {
        if self.state != ConnectionState::Connecting || self.pending != Some(id) {
            return false;
        }
        self.pending = None;
        self.transition(ConnectionState::Closing);
        self.transition(ConnectionState::Closed);
        true
    }

    /// Whether `id` is the open session.
    pub fn is_live(&self, id: SessionId) -> bool {
        self.is_open() && self.session.as_ref().is_some_and(|s| s.id() == id)
    }

    /// Serialize and queue a location update.
    ///
    /// Fails with [`SyncError::NotConnected`] unless the connection is open;
    /// the update is dropped, not buffered.
    pub fn send(&self, location: &Location) -> Result<(), SyncError> {
        let not_connected = SyncError::NotConnected { state: self.state };
        let session = match (&self.state, &self.session) {
            (ConnectionState::Open, Some(session)) => session,
            _ => return Err(not_connected),
        };
        let text = wire::encode_location(location)?;
        if session.push(text) {
            Ok(())
        } else {
            Err(not_connected)
        }
    }

    /// Decode an inbound frame. Never changes the connection state.
    pub fn on_message(&self, raw: &str) -> Result<WeatherPayload, SyncError> {
        wire::decode_payload(raw)
    }

    /// The live session ended without being asked to:
    /// `Open -> Closing -> Closed`. Returns false for stale ids.
    pub fn lose(&mut self, id: SessionId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.release();
        true
    }

    /// Close the connection: `-> Closing -> Closed`.
    ///
    /// Idempotent; returns false when there was nothing to close.
    pub fn close(&mut self) -> bool {
        match self.state {
            ConnectionState::Closed | ConnectionState::Closing => false,
            ConnectionState::Connecting | ConnectionState::Open => {
                self.release();
                true
            }
        }
    }

    fn release(&mut self) {
        self.transition(ConnectionState::Closing);
        self.pending = None;
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.transition(ConnectionState::Closed);
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid connection transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Connection state");
        self.state = next;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open a WebSocket to `endpoint` and start its pumps.
///
/// Inbound frames are reported on `action_tx` as
/// [`SyncAction::ConnectionDidReceive`]; the end of the stream as
/// [`SyncAction::ConnectionDidLose`].
pub async fn connect(
    endpoint: &Endpoint,
    id: SessionId,
    timeout: Duration,
    action_tx: mpsc::UnboundedSender<SyncAction>,
) -> Result<Session, SyncError> {
    let failed = |reason: String| SyncError::Connect {
        endpoint: endpoint.to_string(),
        reason,
    };

    let (ws, _response) =
        tokio::time::timeout(timeout, tokio_tungstenite::connect_async(endpoint.as_str()))
            .await
            .map_err(|_| failed(format!("timed out after {}ms", timeout.as_millis())))?
            .map_err(|e| failed(e.to_string()))?;

    tracing::info!(%endpoint, session = %id, "WebSocket connected");

    let (sink, stream) = ws.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    tokio::spawn(pump_outbound(
        sink,
        outbound_rx,
        id,
        cancel.clone(),
        action_tx.clone(),
    ));
    tokio::spawn(pump_inbound(stream, id, cancel.clone(), action_tx));

    Ok(Session::new(id, outbound_tx, cancel))
}

async fn pump_outbound(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    id: SessionId,
    cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<SyncAction>,
) {
    loop {
        tokio::select! {
            // Queued sends go out before the close frame
            biased;

            text = outbound.recv() => {
                // All handles dropped
                let Some(text) = text else { break };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::warn!(session = %id, error = %e, "WebSocket write failed");
                    let _ = action_tx.send(SyncAction::ConnectionDidLose {
                        session: id,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    // Sends a close frame
    let _ = sink.close().await;
    cancel.cancel();
    tracing::debug!(session = %id, "Outbound pump stopped");
}

async fn pump_inbound(
    mut stream: SplitStream<WsStream>,
    id: SessionId,
    cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<SyncAction>,
) {
    let reason = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    tracing::warn!(session = %id, len = bytes.len(), "Dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(frame))) => {
                break frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "closed by server".to_string());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_string(),
        };

        if action_tx
            .send(SyncAction::ConnectionDidReceive { session: id, text })
            .is_err()
        {
            // Runtime gone
            return;
        }
    };

    if !cancel.is_cancelled() {
        tracing::warn!(session = %id, %reason, "WebSocket closed unexpectedly");
        let _ = action_tx.send(SyncAction::ConnectionDidLose {
            session: id,
            reason,
        });
    }
}
