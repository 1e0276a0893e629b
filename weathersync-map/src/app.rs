//! The map application: layout, input routing and host-side effects

use crossterm::event::{KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Layout},
    Frame,
};
use weathersync::{EffectContext, EventOutcome, Location, Notice, SyncAction, SyncEffect, SyncState};

use crate::components::{
    Component, MapView, MapViewProps, StatusBar, StatusBarProps, WeatherPopup, WeatherPopupProps,
};
use crate::input::HostEvent;
use crate::reconnect::{Backoff, RECONNECT_TASK};

pub struct MapApp {
    map: MapView,
    popup: WeatherPopup,
    status: StatusBar,
    notice: Option<String>,
    reconnect: Option<Backoff>,
    /// Set by an explicit close; cleared when the user opens again.
    reconnect_held: bool,
}

impl MapApp {
    pub fn new(center: Location) -> Self {
        Self {
            map: MapView::new(center),
            popup: WeatherPopup,
            status: StatusBar,
            notice: None,
            reconnect: None,
            reconnect_held: false,
        }
    }

    /// Reconnect after failures and drops using `backoff`.
    pub fn with_reconnect(mut self, backoff: Backoff) -> Self {
        self.reconnect = Some(backoff);
        self
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    /// The latest notice shown in the status bar.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether retries are suspended after the user closed the connection.
    pub fn reconnect_held(&self) -> bool {
        self.reconnect_held
    }

    pub fn render(&mut self, frame: &mut Frame, state: &SyncState) {
        let [map_area, status_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

        let view = state.view();
        self.map.render(
            frame,
            map_area,
            MapViewProps {
                view,
                is_focused: true,
            },
        );

        let status = view.weather_status();
        let popup_area = WeatherPopup::area(map_area, status);
        self.popup
            .render(frame, popup_area, WeatherPopupProps { status });

        self.status.render(
            frame,
            status_area,
            StatusBarProps {
                connection: state.connection().state(),
                notice: self.notice.as_deref(),
            },
        );
    }

    pub fn map_event(&mut self, event: HostEvent, state: &SyncState) -> EventOutcome<SyncAction> {
        if let HostEvent::Resize(..) = event {
            return EventOutcome::needs_render();
        }

        if let HostEvent::Key(key) = &event {
            if key.kind != KeyEventKind::Press {
                return EventOutcome::ignored();
            }
            let global = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(SyncAction::Shutdown),
                KeyCode::Char('g') => Some(SyncAction::LocationRequest),
                KeyCode::Char('c') => {
                    self.reconnect_held = false;
                    Some(SyncAction::ConnectionOpen)
                }
                KeyCode::Char('x') => Some(SyncAction::ConnectionClose),
                KeyCode::Char('r') => Some(SyncAction::WeatherRefresh),
                _ => None,
            };
            if let Some(action) = global {
                return EventOutcome::action(action);
            }
        }

        let props = MapViewProps {
            view: state.view(),
            is_focused: true,
        };
        let outcome = EventOutcome::actions(self.map.handle_event(&event, props));
        match event {
            // Cursor and zoom are view-only
            HostEvent::Key(_) => outcome.with_render(),
            _ => outcome,
        }
    }

    pub fn handle_effect(&mut self, effect: SyncEffect, ctx: &mut EffectContext<'_, SyncAction>) {
        match effect {
            SyncEffect::PanMap(location) => self.map.pan_to(location),
            SyncEffect::Notify(notice) => {
                self.schedule_reconnect(&notice, ctx);
                self.notice = Some(notice.to_string());
            }
            SyncEffect::Connect { .. } | SyncEffect::Geolocate => {
                tracing::debug!(?effect, "Runtime effect reached the host; ignored");
                return;
            }
        }
        ctx.request_render();
    }

    fn schedule_reconnect(&mut self, notice: &Notice, ctx: &mut EffectContext<'_, SyncAction>) {
        let Some(backoff) = self.reconnect.as_mut() else {
            return;
        };
        match notice {
            Notice::Connected => {
                backoff.reset();
                ctx.tasks().cancel(&RECONNECT_TASK);
            }
            Notice::Closed => {
                self.reconnect_held = true;
                backoff.reset();
                ctx.tasks().cancel(&RECONNECT_TASK);
            }
            Notice::ConnectFailed(_) | Notice::Disconnected { .. } if self.reconnect_held => {
                tracing::debug!("Reconnect held after user close");
            }
            Notice::ConnectFailed(_) | Notice::Disconnected { .. } => {
                let delay = backoff.next_delay();
                tracing::info!(
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                ctx.tasks()
                    .spawn_after(RECONNECT_TASK, delay, async { SyncAction::ConnectionOpen });
            }
            Notice::LocationFailed(_) => {}
        }
    }
}
