//! Helpers for testing the map UI without a terminal

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{backend::TestBackend, buffer::Buffer, Frame, Terminal};

use crate::input::HostEvent;

/// Renders into an in-memory buffer.
pub struct RenderHarness {
    terminal: Terminal<TestBackend>,
}

impl RenderHarness {
    pub fn new(width: u16, height: u16) -> Self {
        let terminal = Terminal::new(TestBackend::new(width, height))
            .expect("test backend never fails");
        Self { terminal }
    }

    /// Draw one frame and return its text, one line per row, no styles.
    pub fn render_to_string_plain<F>(&mut self, render: F) -> String
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal
            .draw(render)
            .expect("test backend never fails");
        buffer_to_string_plain(self.terminal.backend().buffer())
    }
}

pub fn buffer_to_string_plain(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

/// A key press with no modifiers.
pub fn key(code: KeyCode) -> HostEvent {
    HostEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub fn char_key(c: char) -> HostEvent {
    key(KeyCode::Char(c))
}

/// A left mouse button press at a screen cell.
pub fn left_click(column: u16, row: u16) -> HostEvent {
    HostEvent::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}
