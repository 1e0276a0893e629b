//! Weather popup anchored to the map

use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use weathersync::{WeatherPayload, WeatherStatus};

use super::Component;

pub const LOADING_TEXT: &str = "Loading...";
const MISSING: &str = "-";
const POPUP_WIDTH: u16 = 36;

pub struct WeatherPopupProps<'a> {
    pub status: WeatherStatus<'a>,
}

#[derive(Default)]
pub struct WeatherPopup;

impl WeatherPopup {
    /// Where the popup sits inside the map: the top-right corner, sized to
    /// its content.
    pub fn area(map: Rect, status: WeatherStatus<'_>) -> Rect {
        let height = popup_lines(status).len() as u16 + 2;
        let width = POPUP_WIDTH.min(map.width.saturating_sub(2));
        let height = height.min(map.height.saturating_sub(2));
        let x = map.x + map.width.saturating_sub(width + 1);
        Rect::new(x, map.y + 1, width, height)
    }
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn rows(payload: &WeatherPayload) -> Vec<String> {
    vec![
        payload.condition_text().unwrap_or(MISSING).to_string(),
        format!("Location : {}", payload.place_name().unwrap_or(MISSING)),
        format!("Temperature: {}°C", number(payload.temp_c())),
        format!("Precipitation: {} mm", number(payload.precip_mm())),
        format!("Wind Speed: {} km/hr", number(payload.wind_kph())),
        format!("Humidity: {} %", number(payload.humidity())),
        format!("Air quality (CO): {}", number(payload.air_quality_co())),
    ]
}

/// The popup text, one entry per row. Missing fields show as `-`.
pub fn popup_lines(status: WeatherStatus<'_>) -> Vec<String> {
    match status {
        WeatherStatus::Loading => vec![LOADING_TEXT.to_string()],
        WeatherStatus::Ready(payload) => rows(payload),
    }
}

impl Component for WeatherPopup {
    type Props<'a> = WeatherPopupProps<'a>;

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let mut lines = popup_lines(props.status).into_iter();
        let text: Vec<Line> = match props.status {
            WeatherStatus::Loading => lines
                .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::DarkGray).italic())))
                .collect(),
            WeatherStatus::Ready(_) => {
                let header = lines
                    .next()
                    .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Yellow).bold())));
                header.into_iter().chain(lines.map(Line::from)).collect()
            }
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan));

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(text).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> WeatherPayload {
        WeatherPayload::from_value(value).unwrap()
    }

    #[test]
    fn test_loading_lines() {
        assert_eq!(popup_lines(WeatherStatus::Loading), vec!["Loading..."]);
    }

    #[test]
    fn test_full_report_lines() {
        let p = payload(json!({
            "location": {"name": "Palghar"},
            "current": {
                "temp_c": 29.5,
                "precip_mm": 0.0,
                "wind_kph": 12.2,
                "humidity": 74,
                "condition": {"text": "Partly cloudy", "icon": "//cdn/116.png"},
                "air_quality": {"co": 270.4}
            }
        }));

        assert_eq!(
            popup_lines(WeatherStatus::Ready(&p)),
            vec![
                "Partly cloudy",
                "Location : Palghar",
                "Temperature: 29.5°C",
                "Precipitation: 0 mm",
                "Wind Speed: 12.2 km/hr",
                "Humidity: 74 %",
                "Air quality (CO): 270.4",
            ]
        );
    }

    #[test]
    fn test_missing_fields_show_dash() {
        let p = payload(json!({"current": {"temp_c": -3}}));
        let lines = popup_lines(WeatherStatus::Ready(&p));

        assert_eq!(lines[0], "-");
        assert_eq!(lines[1], "Location : -");
        assert_eq!(lines[2], "Temperature: -3°C");
        assert_eq!(lines[6], "Air quality (CO): -");
    }

    #[test]
    fn test_area_sits_in_top_right_corner() {
        let map = Rect::new(0, 0, 100, 30);
        let area = WeatherPopup::area(map, WeatherStatus::Loading);
        assert_eq!(area, Rect::new(63, 1, 36, 3));
    }

    #[test]
    fn test_area_shrinks_with_small_map() {
        let map = Rect::new(0, 0, 20, 6);
        let area = WeatherPopup::area(map, WeatherStatus::Loading);
        assert!(area.width <= 18);
        assert!(area.height <= 4);
        assert!(area.right() <= map.right());
    }
}
