//! weathersync-map: live weather for any point on a terminal world map
//!
//! Starts at `--lat/--lon`, asks for the device location once, and keeps one
//! WebSocket open to the weather service. Click the map (or press Enter at
//! the crosshair) to move; the popup shows whatever the service sends back.
//!
//! # Usage
//!
//! ```sh
//! # Default service at ws://localhost:8080, location from IP lookup
//! weathersync-map
//!
//! # Fixed start, no lookup, reconnect with backoff
//! weathersync-map --lat 48.85 --lon 2.35 --no-geolocate --reconnect
//! ```
//!
//! Logs go to `--log-dir` (default `./logs`); set `RUST_LOG` to override
//! `--log-level`.

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use weathersync::config::{DEFAULT_ENDPOINT, DEFAULT_LAT, DEFAULT_LON};
use weathersync::geolocation::DEFAULT_IP_LOOKUP_URL;
use weathersync::prelude::*;
use weathersync::Endpoint;
use weathersync_map::{logging, spawn_event_poller, Backoff, MapApp};

const POLL_TIMEOUT: Duration = Duration::from_millis(10);
const POLL_LOOP_SLEEP: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Retention {
    /// Keep the previous report until the new one arrives
    Retain,
    /// Show "Loading..." as soon as the location changes
    Reset,
}

impl From<Retention> for WeatherRetention {
    fn from(r: Retention) -> Self {
        match r {
            Retention::Retain => WeatherRetention::Retain,
            Retention::Reset => WeatherRetention::Reset,
        }
    }
}

/// Live weather on a terminal world map
#[derive(Parser, Debug)]
#[command(name = "weathersync-map")]
#[command(about = "Live weather for any point on a terminal world map")]
struct Args {
    /// Weather service endpoint (ws:// only)
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: Endpoint,

    /// Latitude shown before the device location is known
    #[arg(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude shown before the device location is known
    #[arg(long, default_value_t = DEFAULT_LON, allow_negative_numbers = true)]
    lon: f64,

    /// What the popup shows while a new location's weather is on its way
    #[arg(long, value_enum, default_value_t = Retention::Retain)]
    retention: Retention,

    /// Re-send the location every N seconds while connected (0 = never)
    #[arg(long, default_value_t = 0)]
    refresh_secs: u64,

    /// Reconnect with exponential backoff after failures and drops
    #[arg(long)]
    reconnect: bool,

    /// Skip the device location lookup
    #[arg(long)]
    no_geolocate: bool,

    /// IP geolocation service (ip-api response format)
    #[arg(long, default_value = DEFAULT_IP_LOOKUP_URL)]
    geolocation_url: String,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log level or filter directives, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn sync_config(&self) -> anyhow::Result<SyncConfig> {
        let start = Location::new(self.lat, self.lon).context("invalid --lat/--lon")?;
        let refresh = (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs));

        Ok(SyncConfig::new(self.endpoint.clone())
            .with_default_location(start)
            .with_retention(self.retention.into())
            .with_refresh_interval(refresh))
    }

    fn geolocator(&self) -> anyhow::Result<Arc<dyn Geolocator>> {
        if self.no_geolocate {
            return Ok(Arc::new(FixedGeolocator::unavailable()));
        }
        let geolocator = IpGeolocator::new(self.geolocation_url.as_str())
            .context("failed to set up geolocation")?;
        Ok(Arc::new(geolocator))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.sync_config()?;
    let geolocator = args.geolocator()?;
    let _log_guard = logging::init(&args.log_dir, &args.log_level)?;
    tracing::info!(endpoint = %config.endpoint, reconnect = args.reconnect, "Starting weathersync-map");

    // ===== Terminal setup =====
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config, geolocator, args.reconnect).await;

    // ===== Cleanup =====
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Exiting with error");
    }
    result
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: SyncConfig,
    geolocator: Arc<dyn Geolocator>,
    reconnect: bool,
) -> anyhow::Result<()> {
    let mut app = MapApp::new(config.default_location);
    if reconnect {
        app = app.with_reconnect(Backoff::default());
    }
    let ui = RefCell::new(app);

    let mut runtime = SyncRuntime::new(config, geolocator);
    runtime.enqueue(SyncAction::ConnectionOpen);
    runtime.enqueue(SyncAction::LocationRequest);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let poller = spawn_event_poller(event_tx, POLL_TIMEOUT, POLL_LOOP_SLEEP, cancel.clone());

    let result = runtime
        .run(
            event_rx,
            |state| {
                terminal
                    .draw(|frame| ui.borrow_mut().render(frame, state))
                    .map(|_| ())
            },
            |event, state| ui.borrow_mut().map_event(event, state),
            |effect, ctx| ui.borrow_mut().handle_effect(effect, ctx),
        )
        .await;

    cancel.cancel();
    let _ = poller.await;

    result.context("terminal I/O failed")
}
