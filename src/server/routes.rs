//! Request handlers.

use super::AppContext;
use crate::capture::encode_jpeg;
use crate::exposure::CaptureError;
use crate::gallery::{GalleryError, GalleryItem};
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Multipart boundary used by the live preview.
pub const MJPEG_BOUNDARY: &str = "frame";

/// Builds the application router.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/capture", post(capture_handler))
        .route("/status", get(status_handler))
        .route("/keep", post(keep_handler))
        .route("/discard", post(discard_handler))
        .route("/temp.jpg", get(temp_image_handler))
        .route("/video_feed", get(video_feed_handler))
        .route("/gallery", get(gallery_handler))
        .route("/gallery/:id", get(gallery_item_handler))
        .route("/scanner", post(scanner_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(context)
}

/// Wraps one JPEG in a `multipart/x-mixed-replace` part.
pub fn multipart_chunk(jpeg: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(jpeg.len() + 64);
    payload.extend_from_slice(format!("--{MJPEG_BOUNDARY}\r\n").as_bytes());
    payload.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    payload.extend_from_slice(jpeg);
    payload.extend_from_slice(b"\r\n");
    payload
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn gallery_error_response(error: GalleryError) -> Response {
    let status = match error {
        GalleryError::NothingToPromote | GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::InvalidId(_) => StatusCode::BAD_REQUEST,
        GalleryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureParams {
    exposure: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CaptureResponse {
    image: &'static str,
    frames: usize,
    skipped: u32,
    width: u32,
    height: u32,
    exposure: u32,
}

/// Runs a capture; blocks a worker thread for the exposure duration.
async fn capture_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<CaptureParams>,
    form: Option<Form<CaptureParams>>,
) -> Response {
    let exposure = form
        .and_then(|Form(p)| p.exposure)
        .or(query.exposure)
        .unwrap_or(ctx.orchestrator.config().default_exposure_secs);

    let orchestrator = Arc::clone(&ctx.orchestrator);
    match tokio::task::spawn_blocking(move || orchestrator.capture(exposure)).await {
        Ok(Ok(outcome)) => Json(CaptureResponse {
            image: "/temp.jpg",
            frames: outcome.frames,
            skipped: outcome.skipped,
            width: outcome.width,
            height: outcome.height,
            exposure: outcome.exposure_secs,
        })
        .into_response(),
        Ok(Err(e)) => capture_error_response(e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn capture_error_response(error: CaptureError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, error.to_string())
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct StatusResponse {
    captured: bool,
    capture_in_progress: bool,
    scanner_active: bool,
}

async fn status_handler(State(ctx): State<Arc<AppContext>>) -> Json<StatusResponse> {
    let run = ctx.state.snapshot();
    Json(StatusResponse {
        captured: run.capture_done,
        capture_in_progress: run.capture_in_progress,
        scanner_active: run.scanner_active,
    })
}

async fn keep_handler(State(ctx): State<Arc<AppContext>>) -> Response {
    let gallery = Arc::clone(&ctx.gallery);
    match tokio::task::spawn_blocking(move || gallery.promote()).await {
        Ok(Ok(_)) => Redirect::to("/").into_response(),
        Ok(Err(e)) => gallery_error_response(e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn discard_handler(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.gallery.discard() {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => gallery_error_response(e),
    }
}

fn jpeg_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response()
}

async fn temp_image_handler(State(ctx): State<Arc<AppContext>>) -> Response {
    match tokio::fs::read(ctx.gallery.temp_path()).await {
        Ok(bytes) => jpeg_response(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "no captured image")
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Streams the live camera preview until the client disconnects or the
/// appliance shuts down.
async fn video_feed_handler(State(ctx): State<Arc<AppContext>>) -> Response {
    let stream = async_stream::stream! {
        let mut interval = tokio::time::interval(ctx.preview_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if ctx.state.quit_requested() {
                break;
            }

            let camera = Arc::clone(&ctx.camera);
            let quality = ctx.jpeg_quality;
            let encoded = tokio::task::spawn_blocking(move || {
                camera.latest_frame().map(|frame| encode_jpeg(&frame, quality))
            })
            .await;

            match encoded {
                Ok(Some(Ok(jpeg))) => {
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(multipart_chunk(&jpeg)));
                }
                Ok(Some(Err(e))) => tracing::warn!(error = %e, "Preview frame encoding failed"),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Preview worker failed");
                    break;
                }
            }
        }
    };

    let content_type = format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}");
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct GalleryListing {
    items: Vec<GalleryItem>,
}

async fn gallery_handler(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.gallery.list() {
        Ok(items) => Json(GalleryListing { items }).into_response(),
        Err(e) => gallery_error_response(e),
    }
}

async fn gallery_item_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Response {
    let path = match ctx.gallery.resolve(&id) {
        Ok(path) => path,
        Err(e) => return gallery_error_response(e),
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => jpeg_response(bytes),
        Err(e) => gallery_error_response(GalleryError::Io(e)),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScannerParams {
    active: bool,
}

async fn scanner_handler(
    State(ctx): State<Arc<AppContext>>,
    Form(params): Form<ScannerParams>,
) -> Json<StatusResponse> {
    ctx.state.set_scanner_active(params.active);
    status_handler(State(ctx)).await
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    ctx.metrics.update(&ctx.metrics_snapshot());

    match ctx.metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
