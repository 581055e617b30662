//! HTTP surface for the appliance.
//!
//! Thin request/response glue over the capture pipeline: trigger a
//! capture, poll status, keep or discard the result, browse the gallery,
//! watch the live MJPEG preview and scrape Prometheus metrics.

mod routes;

pub use routes::{multipart_chunk, router, MJPEG_BOUNDARY};

use crate::capture::{FrameSource, ServerConfig};
use crate::exposure::CaptureOrchestrator;
use crate::gallery::GalleryStore;
use crate::gesture::ScannerStats;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::state::RunState;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Everything the request handlers need, shared behind an `Arc`.
pub struct AppContext {
    pub state: Arc<RunState>,
    pub camera: Arc<dyn FrameSource>,
    pub orchestrator: Arc<CaptureOrchestrator>,
    pub gallery: Arc<GalleryStore>,
    pub metrics: MetricsRegistry,
    pub scanner_stats: Option<Arc<ScannerStats>>,
    pub preview_interval: Duration,
    pub jpeg_quality: u8,
}

impl AppContext {
    /// Collects a metrics snapshot from every component.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let scanner = self.scanner_stats.as_ref().map(|s| s.snapshot());
        let gallery_items = match self.gallery.count() {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count gallery items");
                0
            }
        };
        MetricsSnapshot::from_components(
            &self.state.snapshot(),
            &self.orchestrator.stats(),
            scanner.as_ref(),
            gallery_items,
        )
    }
}

/// HTTP server for the capture pipeline.
pub struct AppServer {
    config: ServerConfig,
    context: Arc<AppContext>,
}

impl AppServer {
    /// Creates a new server.
    pub fn new(config: ServerConfig, context: AppContext) -> Self {
        Self {
            config,
            context: Arc::new(context),
        }
    }

    /// Returns the shared handler context.
    pub fn context(&self) -> Arc<AppContext> {
        Arc::clone(&self.context)
    }

    /// Starts the HTTP server.
    ///
    /// Runs until shutdown is requested through the run state, then
    /// drains in-flight requests and returns.
    pub async fn run(self) -> Result<(), ServerError> {
        let state = Arc::clone(&self.context.state);
        let app = router(self.context);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "HTTP server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let waiter = Arc::clone(&state);
                if tokio::task::spawn_blocking(move || waiter.wait_for_quit())
                    .await
                    .is_err()
                {
                    tracing::warn!("Shutdown watcher failed");
                }
            })
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
