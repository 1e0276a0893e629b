//! Terminal input polling

use std::time::Duration;

use crossterm::event::{self, KeyEvent, MouseEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MAX_EVENTS_PER_BATCH: usize = 20;

/// The terminal events the map reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

impl HostEvent {
    /// Keep keys, mouse and resizes; drop everything else.
    pub fn from_crossterm(event: event::Event) -> Option<Self> {
        match event {
            event::Event::Key(key) => Some(Self::Key(key)),
            event::Event::Mouse(mouse) => Some(Self::Mouse(mouse)),
            event::Event::Resize(w, h) => Some(Self::Resize(w, h)),
            _ => None,
        }
    }
}

/// Poll crossterm on a background task and forward events to `tx`.
///
/// Stops when `cancel_token` fires (draining whatever crossterm buffered so
/// it doesn't leak into the shell) or when the receiver is dropped.
pub fn spawn_event_poller(
    tx: mpsc::UnboundedSender<HostEvent>,
    poll_timeout: Duration,
    loop_sleep: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Event poller cancelled, draining buffer");
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    break;
                }
                _ = tokio::time::sleep(loop_sleep) => {
                    let mut processed = 0;
                    while processed < MAX_EVENTS_PER_BATCH
                        && event::poll(poll_timeout).unwrap_or(false)
                    {
                        processed += 1;
                        let Some(host_event) = event::read().ok().and_then(HostEvent::from_crossterm) else {
                            continue;
                        };
                        if tx.send(host_event).is_err() {
                            debug!("Event channel closed, stopping poller");
                            return;
                        }
                    }
                }
            }
        }
    })
}
