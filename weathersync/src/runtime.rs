//! The serialized event loop
//!
//! [`SyncRuntime`] owns the controller, the action queue, the task manager
//! and the subscriptions. Everything that changes state (host input, socket
//! frames, geolocation results, timers) arrives as an action on one queue
//! and is reduced in arrival order, so no locking is needed.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::action::{Action, SyncAction};
use crate::config::{Endpoint, SyncConfig};
use crate::connection::{self, SessionId};
use crate::controller::{sync_controller, SyncController};
use crate::effect::SyncEffect;
use crate::error::LocationError;
use crate::geolocation::Geolocator;
use crate::state::SyncState;
use crate::subscriptions::{SubKey, Subscriptions};
use crate::tasks::{TaskKey, TaskManager};

/// Result of mapping a host event into actions plus an optional render hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome<A> {
    pub actions: Vec<A>,
    /// Re-render even if no action changes state (view-only changes such
    /// as moving a cursor).
    pub needs_render: bool,
}

impl<A> EventOutcome<A> {
    pub fn ignored() -> Self {
        Self {
            actions: Vec::new(),
            needs_render: false,
        }
    }

    pub fn needs_render() -> Self {
        Self {
            actions: Vec::new(),
            needs_render: true,
        }
    }

    pub fn action(action: A) -> Self {
        Self {
            actions: vec![action],
            needs_render: false,
        }
    }

    pub fn actions<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
    {
        Self {
            actions: actions.into_iter().collect(),
            needs_render: false,
        }
    }

    pub fn with_render(mut self) -> Self {
        self.needs_render = true;
        self
    }
}

impl<A> Default for EventOutcome<A> {
    fn default() -> Self {
        Self::ignored()
    }
}

impl<A> From<A> for EventOutcome<A> {
    fn from(action: A) -> Self {
        Self::action(action)
    }
}

impl<A> From<Vec<A>> for EventOutcome<A> {
    fn from(actions: Vec<A>) -> Self {
        Self::actions(actions)
    }
}

impl<A> From<Option<A>> for EventOutcome<A> {
    fn from(action: Option<A>) -> Self {
        match action {
            Some(action) => Self::action(action),
            None => Self::ignored(),
        }
    }
}

/// Context passed to host effect handlers.
pub struct EffectContext<'a, A: Action> {
    action_tx: &'a mpsc::UnboundedSender<A>,
    tasks: &'a mut TaskManager<A>,
    needs_render: &'a mut bool,
}

impl<'a, A: Action> EffectContext<'a, A> {
    /// Send an action directly.
    pub fn emit(&self, action: A) {
        let _ = self.action_tx.send(action);
    }

    pub fn action_tx(&self) -> &mpsc::UnboundedSender<A> {
        self.action_tx
    }

    /// Schedule follow-up work such as a delayed reconnect.
    pub fn tasks(&mut self) -> &mut TaskManager<A> {
        self.tasks
    }

    /// Re-render after this effect even if state did not change (the host
    /// updated something it owns, like a status line).
    pub fn request_render(&mut self) {
        *self.needs_render = true;
    }
}

/// Runs the sync controller.
pub struct SyncRuntime {
    store: SyncController,
    config: SyncConfig,
    geolocator: Arc<dyn Geolocator>,
    action_tx: mpsc::UnboundedSender<SyncAction>,
    action_rx: mpsc::UnboundedReceiver<SyncAction>,
    tasks: TaskManager<SyncAction>,
    subscriptions: Subscriptions<SyncAction>,
    should_render: bool,
}

impl SyncRuntime {
    pub fn new(config: SyncConfig, geolocator: Arc<dyn Geolocator>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            store: sync_controller(&config),
            tasks: TaskManager::new(action_tx.clone()),
            subscriptions: Subscriptions::new(action_tx.clone()),
            config,
            geolocator,
            action_tx,
            action_rx,
            should_render: true,
        }
    }

    /// Send an action into the runtime queue.
    pub fn enqueue(&self, action: SyncAction) {
        let _ = self.action_tx.send(action);
    }

    pub fn action_tx(&self) -> mpsc::UnboundedSender<SyncAction> {
        self.action_tx.clone()
    }

    pub fn state(&self) -> &SyncState {
        self.store.state()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn tasks(&mut self) -> &mut TaskManager<SyncAction> {
        &mut self.tasks
    }

    /// Run until a [`SyncAction::Shutdown`] has been reduced.
    ///
    /// - `events`: host input (keys, clicks, resizes), mapped to actions by
    ///   `map_event`. The loop keeps running if the sender is dropped.
    /// - `render`: called with the current state whenever it changed.
    /// - `handle_effect`: receives the effects the host is responsible for
    ///   ([`SyncEffect::PanMap`], [`SyncEffect::Notify`]).
    ///
    /// On return every task and subscription has been cancelled and the
    /// connection is closed, including when `render` fails.
    pub async fn run<Ev, FRender, FEvent, FEffect, R>(
        &mut self,
        mut events: mpsc::UnboundedReceiver<Ev>,
        mut render: FRender,
        mut map_event: FEvent,
        mut handle_effect: FEffect,
    ) -> io::Result<()>
    where
        FRender: FnMut(&SyncState) -> io::Result<()>,
        FEvent: FnMut(Ev, &SyncState) -> R,
        R: Into<EventOutcome<SyncAction>>,
        FEffect: FnMut(SyncEffect, &mut EffectContext<'_, SyncAction>),
    {
        if let Some(period) = self.config.refresh_interval {
            self.subscriptions
                .interval(SubKey::REFRESH, period, || SyncAction::WeatherRefresh);
        }

        let result = self
            .run_loop(&mut events, &mut render, &mut map_event, &mut handle_effect)
            .await;
        self.teardown();
        result
    }

    async fn run_loop<Ev, FRender, FEvent, FEffect, R>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<Ev>,
        render: &mut FRender,
        map_event: &mut FEvent,
        handle_effect: &mut FEffect,
    ) -> io::Result<()>
    where
        FRender: FnMut(&SyncState) -> io::Result<()>,
        FEvent: FnMut(Ev, &SyncState) -> R,
        R: Into<EventOutcome<SyncAction>>,
        FEffect: FnMut(SyncEffect, &mut EffectContext<'_, SyncAction>),
    {
        let mut events_open = true;

        loop {
            if self.should_render {
                render(self.store.state())?;
                self.should_render = false;
            }

            tokio::select! {
                event = events.recv(), if events_open => {
                    let Some(event) = event else {
                        tracing::debug!("Host event source closed");
                        events_open = false;
                        continue;
                    };
                    let outcome: EventOutcome<SyncAction> =
                        map_event(event, self.store.state()).into();
                    if outcome.needs_render {
                        self.should_render = true;
                    }
                    for action in outcome.actions {
                        let _ = self.action_tx.send(action);
                    }
                }

                Some(action) = self.action_rx.recv() => {
                    let shutdown = matches!(action, SyncAction::Shutdown);
                    self.dispatch(action, handle_effect);
                    if shutdown {
                        break;
                    }
                }

                else => break,
            }
        }

        Ok(())
    }

    fn dispatch<FEffect>(&mut self, action: SyncAction, handle_effect: &mut FEffect)
    where
        FEffect: FnMut(SyncEffect, &mut EffectContext<'_, SyncAction>),
    {
        let result = self.store.dispatch(action);
        if result.changed {
            self.should_render = true;
        }

        for effect in result.effects {
            match effect {
                SyncEffect::Connect { session, endpoint } => self.spawn_connect(session, endpoint),
                SyncEffect::Geolocate => self.spawn_geolocate(),
                other => {
                    let mut ctx = EffectContext {
                        action_tx: &self.action_tx,
                        tasks: &mut self.tasks,
                        needs_render: &mut self.should_render,
                    };
                    handle_effect(other, &mut ctx);
                }
            }
        }
    }

    fn spawn_connect(&mut self, session: SessionId, endpoint: Endpoint) {
        let action_tx = self.action_tx.clone();
        let timeout = self.config.connect_timeout;
        self.tasks.spawn(TaskKey::CONNECT, async move {
            match connection::connect(&endpoint, session, timeout, action_tx).await {
                Ok(session) => SyncAction::ConnectionDidOpen(session),
                Err(error) => SyncAction::ConnectionDidFail { session, error },
            }
        });
    }

    fn spawn_geolocate(&mut self) {
        let geolocator = Arc::clone(&self.geolocator);
        let timeout = self.config.geolocation_timeout;
        self.tasks.spawn(TaskKey::GEOLOCATE, async move {
            let located = tokio::time::timeout(timeout, geolocator.locate())
                .await
                .unwrap_or(Err(LocationError::Timeout));
            match located {
                Ok(location) => SyncAction::LocationDidResolve(location),
                Err(error) => SyncAction::LocationDidFail(error),
            }
        });
    }

    fn teardown(&mut self) {
        self.subscriptions.cancel_all();
        self.tasks.cancel_all();
        // Idempotent if Shutdown was already reduced
        self.store.dispatch(SyncAction::Shutdown);

        // Late results are dropped unapplied; dropping queued sessions
        // closes their sockets.
        let mut dropped = 0usize;
        while self.action_rx.try_recv().is_ok() {
            dropped += 1;
        }
        tracing::debug!(dropped, "Sync runtime stopped");
    }
}
