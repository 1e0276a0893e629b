//! World map with the location marker and a crosshair cursor
//!
//! The view is a window of `360 / 2^zoom` degrees of longitude by
//! `180 / 2^zoom` degrees of latitude around `center`. Screen cells map back
//! to coordinates through the canvas area recorded at the last render, so a
//! mouse click lands where it was drawn.

use crossterm::event::{KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Map as WorldMap, MapResolution},
        Block, Borders,
    },
    Frame,
};
use weathersync::{Location, MapPoint, SyncAction, ViewState};

use super::Component;
use crate::input::HostEvent;

pub const MAX_ZOOM: u8 = 5;

/// Cursor steps across the visible width (or height).
const CURSOR_STEPS: f64 = 24.0;

pub const MARKER_SYMBOL: &str = "◉";
pub const CURSOR_SYMBOL: &str = "+";

pub struct MapViewProps<'a> {
    pub view: &'a ViewState,
    pub is_focused: bool,
}

#[derive(Debug, Clone)]
pub struct MapView {
    center: MapPoint,
    cursor: MapPoint,
    zoom: u8,
    /// Inner canvas area of the last render.
    canvas: Rect,
}

impl MapView {
    pub fn new(center: Location) -> Self {
        let center = MapPoint::from(center);
        let mut view = Self {
            center,
            cursor: center,
            zoom: 0,
            canvas: Rect::default(),
        };
        view.clamp_center();
        view
    }

    pub fn center(&self) -> MapPoint {
        self.center
    }

    pub fn cursor(&self) -> MapPoint {
        self.cursor
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    fn lon_span(&self) -> f64 {
        360.0 / f64::from(1u32 << self.zoom)
    }

    fn lat_span(&self) -> f64 {
        180.0 / f64::from(1u32 << self.zoom)
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let half = self.lon_span() / 2.0;
        [self.center.lng - half, self.center.lng + half]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        let half = self.lat_span() / 2.0;
        [self.center.lat - half, self.center.lat + half]
    }

    /// Zoom in around the cursor. Returns false at the closest zoom.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom >= MAX_ZOOM {
            return false;
        }
        self.zoom += 1;
        self.center = self.cursor;
        self.clamp_center();
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom == 0 {
            return false;
        }
        self.zoom -= 1;
        self.clamp_center();
        self.follow_cursor();
        true
    }

    /// Move the crosshair by whole steps; positive `dy` is north. The view
    /// scrolls to keep the crosshair visible.
    pub fn move_cursor(&mut self, dx: i8, dy: i8) {
        let step_lon = self.lon_span() / CURSOR_STEPS;
        let step_lat = self.lat_span() / CURSOR_STEPS;
        self.cursor.lng += f64::from(dx) * step_lon;
        self.cursor.lat = (self.cursor.lat + f64::from(dy) * step_lat).clamp(-90.0, 90.0);
        self.follow_cursor();
    }

    /// Fly to a location: centre the view and the crosshair on it.
    pub fn pan_to(&mut self, location: Location) {
        self.center = MapPoint::from(location);
        self.cursor = self.center;
        self.clamp_center();
    }

    /// The coordinate under a screen cell, if the cell is on the canvas.
    ///
    /// Longitudes are not wrapped here; a view scrolled across the
    /// antimeridian can report values past ±180.
    pub fn point_at(&self, column: u16, row: u16) -> Option<MapPoint> {
        let area = self.canvas;
        if area.width == 0
            || area.height == 0
            || column < area.x
            || column >= area.x + area.width
            || row < area.y
            || row >= area.y + area.height
        {
            return None;
        }
        let [west, _] = self.x_bounds();
        let [_, north] = self.y_bounds();
        let dx = (f64::from(column - area.x) + 0.5) * self.lon_span() / f64::from(area.width);
        let dy = (f64::from(row - area.y) + 0.5) * self.lat_span() / f64::from(area.height);
        Some(MapPoint::new(north - dy, west + dx))
    }

    fn clamp_center(&mut self) {
        let half = self.lat_span() / 2.0;
        self.center.lat = self.center.lat.clamp(-90.0 + half, 90.0 - half);
    }

    fn follow_cursor(&mut self) {
        let [west, east] = self.x_bounds();
        if self.cursor.lng < west {
            self.center.lng -= west - self.cursor.lng;
        } else if self.cursor.lng > east {
            self.center.lng += self.cursor.lng - east;
        }

        let [south, north] = self.y_bounds();
        if self.cursor.lat < south {
            self.center.lat -= south - self.cursor.lat;
        } else if self.cursor.lat > north {
            self.center.lat += self.cursor.lat - north;
        }
        self.clamp_center();

        // Keep the window within one turn of the globe
        if self.center.lng >= 180.0 {
            self.center.lng -= 360.0;
            self.cursor.lng -= 360.0;
        } else if self.center.lng < -180.0 {
            self.center.lng += 360.0;
            self.cursor.lng += 360.0;
        }
    }
}

impl Component<SyncAction> for MapView {
    type Props<'a> = MapViewProps<'a>;

    fn handle_event(
        &mut self,
        event: &HostEvent,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = SyncAction> {
        if !props.is_focused {
            return None;
        }

        match event {
            HostEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1, 0),
                KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1, 0),
                KeyCode::Up | KeyCode::Char('k') => self.move_cursor(0, 1),
                KeyCode::Down | KeyCode::Char('j') => self.move_cursor(0, -1),
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.zoom_in();
                }
                KeyCode::Char('-') => {
                    self.zoom_out();
                }
                KeyCode::Enter => return Some(SyncAction::MapClick(self.cursor)),
                _ => {}
            },
            HostEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                if let Some(point) = self.point_at(mouse.column, mouse.row) {
                    self.cursor = point;
                    return Some(SyncAction::MapClick(point));
                }
            }
            _ => {}
        }
        None
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let location = props.view.location();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
            .title(format!(" Map {location} "))
            .title_style(Style::default().fg(Color::Cyan).bold());
        self.canvas = block.inner(area);

        let cursor = self.cursor;
        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds(self.x_bounds())
            .y_bounds(self.y_bounds())
            .paint(move |ctx| {
                ctx.draw(&WorldMap {
                    resolution: MapResolution::High,
                    color: Color::Rgb(90, 130, 100),
                });
                ctx.layer();
                ctx.print(
                    cursor.lng,
                    cursor.lat,
                    Span::styled(CURSOR_SYMBOL, Style::default().fg(Color::Yellow)),
                );
                ctx.print(
                    location.lon(),
                    location.lat(),
                    Span::styled(MARKER_SYMBOL, Style::default().fg(Color::Red).bold()),
                );
            });
        frame.render_widget(canvas, area);
    }
}
