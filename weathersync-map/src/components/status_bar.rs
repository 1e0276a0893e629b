use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use weathersync::ConnectionState;

use super::Component;

pub struct StatusBarProps<'a> {
    pub connection: ConnectionState,
    pub notice: Option<&'a str>,
}

/// Connection state, the latest notice and the key help on one line.
#[derive(Default)]
pub struct StatusBar;

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => Color::Green,
        ConnectionState::Connecting | ConnectionState::Closing => Color::Yellow,
        ConnectionState::Closed => Color::Red,
    }
}

impl Component for StatusBar {
    type Props<'a> = StatusBarProps<'a>;

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan).bold());
        let hint = |h: &'static str| Span::styled(h, Style::default().fg(Color::DarkGray));

        let mut spans = vec![
            Span::styled(
                format!(" ● {} ", props.connection),
                Style::default().fg(state_color(props.connection)).bold(),
            ),
        ];
        if let Some(notice) = props.notice {
            spans.push(Span::styled(
                format!("{notice}  "),
                Style::default().fg(Color::White),
            ));
        }
        spans.extend([
            key("enter"),
            hint(" pick  "),
            key("+/-"),
            hint(" zoom  "),
            key("g"),
            hint(" locate  "),
            key("c"),
            hint("/"),
            key("x"),
            hint(" connect/close  "),
            key("r"),
            hint(" refresh  "),
            key("q"),
            hint(" quit "),
        ]);

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
