//! Whole-screen render tests

use weathersync::testing::SyncHarness;
use weathersync::SyncState;
use weathersync_map::testing::RenderHarness;
use weathersync_map::MapApp;

const PAYLOAD: &str = r#"{
    "location": {"name": "Sydney"},
    "current": {
        "temp_c": 18.5,
        "precip_mm": 0.2,
        "wind_kph": 20.9,
        "humidity": 64,
        "condition": {"text": "Light rain", "icon": "//cdn/296.png"},
        "air_quality": {"co": 223.6}
    }
}"#;

fn render(app: &mut MapApp, state: &SyncState) -> String {
    let mut render = RenderHarness::new(100, 30);
    render.render_to_string_plain(|frame| app.render(frame, state))
}

#[test]
fn test_render_loading_before_first_report() {
    let h = SyncHarness::new();
    let mut app = MapApp::new(h.view().location());

    let output = render(&mut app, h.state());

    assert!(output.contains("Loading..."), "Should show loading text");
    assert!(output.contains("closed"), "Should show connection state");
    assert!(!output.contains("Temperature"));
}

#[test]
fn test_render_weather_report() {
    let mut h = SyncHarness::new();
    h.open();
    h.deliver(PAYLOAD);
    let mut app = MapApp::new(h.view().location());

    let output = render(&mut app, h.state());

    assert!(output.contains("Light rain"), "Should show condition");
    assert!(output.contains("Location : Sydney"), "Should show place");
    assert!(output.contains("Temperature: 18.5°C"));
    assert!(output.contains("Precipitation: 0.2 mm"));
    assert!(output.contains("Wind Speed: 20.9 km/hr"));
    assert!(output.contains("Humidity: 64 %"));
    assert!(output.contains("Air quality (CO): 223.6"));
    assert!(output.contains("open"));
    assert!(!output.contains("Loading..."));
}

#[test]
fn test_render_follows_clicked_location() {
    let mut h = SyncHarness::new();
    h.click(48.85, 2.35);
    let mut app = MapApp::new(h.view().location());

    let output = render(&mut app, h.state());

    assert!(output.contains("48.85000, 2.35000"));
}

#[test]
fn test_render_tiny_terminal_does_not_panic() {
    let h = SyncHarness::new();
    let mut app = MapApp::new(h.view().location());

    let mut render = RenderHarness::new(8, 4);
    let output = render.render_to_string_plain(|frame| app.render(frame, h.state()));
    assert_eq!(output.lines().count(), 4);
}
