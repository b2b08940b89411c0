use anyhow::{anyhow, Context, Result};
use clap::Parser;
use photobooth::camera::CameraBackendBuilder;
use photobooth::config::CameraSource;
use photobooth::error::EventBusError;
use photobooth::events::{EventFilter, EventMetrics, EventReceiver, PhotoboothEvent};
use photobooth::{
    CaptureSession, DirectoryOverlaySource, EventBus, Orientation, PhotoStore, PhotoboothConfig,
    SessionConfig,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "photobooth")]
#[command(about = "Mirrored selfie capture with a decorative frame overlay")]
#[command(version)]
#[command(long_about = "Opens a camera for the chosen orientation, loads the matching frame \
overlay, takes one mirrored photo with the overlay composited on top and saves it as a PNG.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, help = "Path to TOML configuration file (default: photobooth.toml)")]
    config: Option<String>,

    /// Photo orientation
    #[arg(short, long, default_value = "portrait", help = "Orientation: portrait or landscape")]
    orientation: Orientation,

    /// Override the camera backend
    #[arg(long, value_name = "SOURCE", value_parser = parse_camera_source, help = "Camera backend: synthetic or still")]
    source: Option<CameraSource>,

    /// Serve this picture as the camera sensor (implies --source still)
    #[arg(long, value_name = "PATH", help = "Picture file used by the still camera backend")]
    still: Option<String>,

    /// Override the output directory
    #[arg(long, value_name = "DIR", help = "Directory the photo is saved to")]
    output_dir: Option<String>,

    /// How long to wait for the overlay before shooting
    #[arg(long, value_name = "MS", default_value_t = 2000, help = "Milliseconds to wait for the overlay to load")]
    overlay_timeout_ms: u64,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening a camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", help = "Write logs to a file in addition to stderr")]
    log_file: Option<String>,
}

fn parse_camera_source(value: &str) -> std::result::Result<CameraSource, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "synthetic" => Ok(CameraSource::Synthetic),
        "still" => Ok(CameraSource::Still),
        other => Err(format!(
            "unknown camera source '{}', expected 'synthetic' or 'still'",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting photobooth v{}", env!("CARGO_PKG_VERSION"));
    let loaded = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            PhotoboothConfig::load_from_file(path)
        }
        None => {
            info!("Configuration file: photobooth.toml (default)");
            PhotoboothConfig::load()
        }
    };
    let mut config = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    apply_overrides(&mut config, &args);

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate().context("Invalid configuration")?;

    let path = run_once(
        config,
        args.orientation,
        Duration::from_millis(args.overlay_timeout_ms),
        args.debug,
    )
    .await
        .map_err(|e| {
            error!("Photo session failed: {}", e);
            e
        })?;

    println!("{}", path.display());
    Ok(())
}

fn apply_overrides(config: &mut PhotoboothConfig, args: &Args) {
    if let Some(source) = args.source {
        config.camera.source = source;
    }
    if let Some(still) = &args.still {
        config.camera.source = CameraSource::Still;
        config.camera.still_path = Some(still.clone());
    }
    if let Some(output_dir) = &args.output_dir {
        config.output.dir = output_dir.clone();
    }
}

/// Run one session: go live, wait briefly for the overlay, shoot once, save
async fn run_once(
    config: PhotoboothConfig,
    orientation: Orientation,
    overlay_timeout: Duration,
    debug_events: bool,
) -> Result<std::path::PathBuf> {
    let event_bus = if debug_events {
        Arc::new(EventBus::with_debug_logging(config.system.event_bus_capacity))
    } else {
        Arc::new(EventBus::new(config.system.event_bus_capacity))
    };
    let filter = if debug_events {
        EventFilter::All
    } else {
        EventFilter::Custom(is_notable_event)
    };
    let event_logger = spawn_event_logger(&event_bus, filter);

    let camera = CameraBackendBuilder::new()
        .config(config.camera.clone())
        .build()?;
    let overlay_source = Arc::new(DirectoryOverlaySource::from_config(&config.overlay));

    let (photo_tx, mut photo_rx) = mpsc::unbounded_channel();
    let mut session = CaptureSession::builder()
        .config(SessionConfig::from(&config))
        .camera(camera)
        .overlay_source(overlay_source)
        .event_bus(Arc::clone(&event_bus))
        .on_capture(move |photo| {
            if photo_tx.send(photo).is_err() {
                warn!("Photo delivered after the receiver was dropped");
            }
        })
        .build()?;

    session.start(orientation).await?;

    match tokio::time::timeout(overlay_timeout, session.wait_for_overlay()).await {
        Ok(state) => debug!("Overlay {} before capture", state.label()),
        Err(_) => warn!(
            "Overlay not ready after {}ms; shooting anyway",
            overlay_timeout.as_millis()
        ),
    }

    let captured = session.capture()?;
    info!(
        "Captured {}x{} {} photo",
        captured.width(),
        captured.height(),
        orientation
    );

    let delivered = photo_rx
        .recv()
        .await
        .ok_or_else(|| anyhow!("Capture callback was never invoked"))?;

    let store = PhotoStore::new(config.output.clone(), Arc::clone(&event_bus));
    let path = store.save(&delivered).await?;

    session.stop();
    drop(session);
    drop(store);
    drop(event_bus);

    // Background tasks may still hold the bus briefly
    if let Ok(Ok(metrics)) = tokio::time::timeout(Duration::from_millis(500), event_logger).await {
        debug!(
            "Event logger saw {} events ({} failures)",
            metrics.total_events,
            metrics.count("camera_failed") + metrics.count("overlay_failed")
        );
    }

    Ok(path)
}

/// Events worth logging outside debug mode
fn is_notable_event(event: &PhotoboothEvent) -> bool {
    matches!(
        event,
        PhotoboothEvent::CameraFailed { .. }
            | PhotoboothEvent::OverlayFailed { .. }
            | PhotoboothEvent::PhotoCaptured { .. }
            | PhotoboothEvent::PhotoSaved { .. }
    )
}

/// Log published events matching `filter` until the bus closes
fn spawn_event_logger(
    event_bus: &Arc<EventBus>,
    filter: EventFilter,
) -> tokio::task::JoinHandle<EventMetrics> {
    let mut receiver = EventReceiver::new(event_bus.subscribe(), filter, "event_logger".to_string());

    tokio::spawn(async move {
        let mut metrics = EventMetrics::default();
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    metrics.record_event(&event);
                    info!("Event: {}", event.description());
                }
                Err(EventBusError::Lagged { .. }) => continue,
                Err(EventBusError::ChannelClosed) => break,
            }
        }
        metrics
    })
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("photobooth={}", log_level)));

    let stderr_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let mut layers = vec![stderr_layer];
    let mut guard = None;

    if let Some(log_file) = &args.log_file {
        let path = Path::new(log_file);
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Invalid log file path: {}", log_file))?;
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
        );
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Photobooth Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Environment overrides use PHOTOBOOTH_<SECTION>__<KEY>, e.g. PHOTOBOOTH_OVERLAY__POLICY=block");
    println!();
    println!("{}", PhotoboothConfig::default().to_toml()?);
    Ok(())
}
