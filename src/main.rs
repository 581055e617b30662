//! Lightpaint appliance
//!
//! Opens the camera, starts the gesture scanner and serves the web UI
//! until Ctrl-C or a both-arms-up gesture.

use clap::Parser;
use lightpaint::{
    capture::{Camera, FileConfig, FrameSource, MockCamera, SharedCamera},
    exposure::CaptureOrchestrator,
    gallery::GalleryStore,
    gesture::{CaptureTrigger, GestureScanner, MockClassifier},
    metrics::MetricsRegistry,
    server::{AppContext, AppServer},
    RunState,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Gesture-triggered long-exposure camera.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the number of photos kept in the gallery.
    #[arg(long)]
    gallery_limit: Option<usize>,

    /// Start with gesture scanning enabled.
    #[arg(long)]
    scanner: bool,

    /// Use the synthetic camera instead of a hardware device.
    #[arg(long)]
    mock_camera: bool,
}

fn load_config(args: &Args) -> Result<FileConfig, String> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path).map_err(|e| e.to_string())?,
        None => FileConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.bind_addr.set_port(port);
    }
    if let Some(limit) = args.gallery_limit {
        config.gallery.limit = limit;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

#[cfg(feature = "camera")]
fn select_camera(mock: bool) -> Box<dyn Camera + Send> {
    if mock {
        Box::new(MockCamera::new())
    } else {
        Box::new(lightpaint::capture::NokhwaCamera::new())
    }
}

#[cfg(not(feature = "camera"))]
fn select_camera(mock: bool) -> Box<dyn Camera + Send> {
    if !mock {
        warn!("Built without the `camera` feature, using the synthetic camera");
    }
    Box::new(MockCamera::new())
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Lightpaint v{}", lightpaint::VERSION);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(RunState::with_scanner_active(args.scanner));

    let camera = match SharedCamera::open(select_camera(args.mock_camera), &config.capture) {
        Ok(camera) => Arc::new(camera),
        Err(e) => {
            error!("Failed to open camera: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        width = config.capture.width,
        height = config.capture.height,
        fps = config.capture.fps,
        "Camera opened"
    );
    let source: Arc<dyn FrameSource> = camera.clone();

    let gallery = match GalleryStore::open(config.gallery.clone(), Arc::clone(&state)) {
        Ok(gallery) => Arc::new(gallery),
        Err(e) => {
            error!("Failed to open gallery: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = Arc::new(
        CaptureOrchestrator::new(
            Arc::clone(&source),
            Arc::clone(&state),
            gallery.temp_path().to_path_buf(),
            config.exposure.clone(),
        )
        .with_jpeg_quality(config.capture.jpeg_quality),
    );

    warn!("No pose model configured, gesture control will not fire");
    let trigger: Arc<dyn CaptureTrigger> = orchestrator.clone();
    let scanner = GestureScanner::new(
        Arc::clone(&source),
        Box::new(MockClassifier::new()),
        trigger,
        Arc::clone(&state),
        config.gesture.clone(),
    );
    let scanner_stats = scanner.stats();
    let scanner = match scanner.spawn() {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start gesture scanner: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let quit = Arc::clone(&state);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Interrupt received, shutting down");
        quit.request_quit();
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let metrics = match MetricsRegistry::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            state.request_quit();
            scanner.join();
            return ExitCode::FAILURE;
        }
    };

    let context = AppContext {
        state: Arc::clone(&state),
        camera: source,
        orchestrator,
        gallery,
        metrics,
        scanner_stats: Some(scanner_stats),
        preview_interval: Duration::from_millis(config.server.preview_interval_ms),
        jpeg_quality: config.capture.jpeg_quality,
    };
    let server = AppServer::new(config.server.clone(), context);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            state.request_quit();
            scanner.join();
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());
    if let Err(ref e) = result {
        error!("HTTP server failed: {}", e);
    }

    // Unblocks the shutdown watcher if the server stopped on its own.
    state.request_quit();
    runtime.shutdown_timeout(Duration::from_secs(2));

    scanner.join();
    camera.release();
    info!("Camera released, exiting");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
