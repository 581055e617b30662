//! Hardware camera backed by `nokhwa`.
//!
//! The device is owned by a dedicated capture thread that keeps only the
//! most recent decoded frame. `capture()` never blocks on the hardware; it
//! hands out a copy of whatever frame arrived last.

use super::{Camera, CameraError, CaptureConfig, Frame};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex,
};
use std::thread;

type LatestSlot = Arc<Mutex<Option<Frame>>>;

/// Camera implementation for V4L2/AVFoundation/MSMF devices.
#[derive(Default)]
pub struct NokhwaCamera {
    latest: LatestSlot,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NokhwaCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_device(config: &CaptureConfig) -> Result<nokhwa::Camera, CameraError> {
    let format = CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.fps,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
    let mut device = nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested)
        .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?;
    device
        .open_stream()
        .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
    Ok(device)
}

fn capture_loop(mut device: nokhwa::Camera, latest: LatestSlot, stop: Arc<AtomicBool>) {
    let mut sequence = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let buffer = match device.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!(error = %e, "Camera frame read failed");
                continue;
            }
        };
        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode camera frame");
                continue;
            }
        };

        let (width, height) = decoded.dimensions();
        sequence += 1;
        let frame = Frame::new(decoded.into_raw(), width, height, sequence);
        if let Ok(mut slot) = latest.lock() {
            *slot = Some(frame);
        }
    }

    if let Err(e) = device.stop_stream() {
        tracing::warn!(error = %e, "Failed to stop camera stream");
    }
    tracing::info!(frames = sequence, "Camera capture thread stopped");
}

impl Camera for NokhwaCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.close();

        let (ready_tx, ready_rx) = mpsc::channel();
        let latest = Arc::clone(&self.latest);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let config = config.clone();

        // The device is created on the capture thread so it never crosses threads.
        let handle = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || match build_device(&config) {
                Ok(device) => {
                    let _ = ready_tx.send(Ok(()));
                    capture_loop(device, latest, stop_flag);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.stop = stop;
                self.handle = Some(handle);
                tracing::info!("Camera opened");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraError::OpenFailed("capture thread exited".into()))
            }
        }
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        if self.handle.is_none() {
            return Err(CameraError::NotInitialized);
        }
        let slot = self
            .latest
            .lock()
            .map_err(|_| CameraError::CaptureFailed("frame slot poisoned".into()))?;
        slot.clone().ok_or(CameraError::NoFrame)
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::SeqCst);
            let _ = handle.join();
            if let Ok(mut slot) = self.latest.lock() {
                *slot = None;
            }
            tracing::info!("Camera closed");
        }
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.close();
    }
}
