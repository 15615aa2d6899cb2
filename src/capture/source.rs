//! Screen capture source — the OS-facing layer.
//!
//! Everything above this file works on [`CapturedFrame`]s; only this file
//! talks to the display server (via `xcap`). The [`CaptureSource`] trait is
//! the seam the controller depends on, so tests and alternative sources
//! (e.g. a window-share picker) can stand in for the real screen.

use super::CapturedFrame;
use image::DynamicImage;
use xcap::Monitor;

/// Anything that can yield a still frame on request.
pub trait CaptureSource: Send + Sync {
    fn grab_frame(&self) -> Result<CapturedFrame, CaptureError>;
}

/// Captures the primary monitor.
pub struct ScreenSource;

impl CaptureSource for ScreenSource {
    /// Grab a full-resolution still of the primary monitor.
    ///
    /// If no monitor reports itself as primary (seen on some multi-head
    /// Linux setups), falls back to the first enumerated monitor.
    fn grab_frame(&self) -> Result<CapturedFrame, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| classify(&e.to_string()))?;

        let primary = monitors
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| Monitor::all().ok()?.into_iter().next())
            .ok_or(CaptureError::NoMonitor)?;

        let start = std::time::Instant::now();
        let image = primary
            .capture_image()
            .map_err(|e| classify(&e.to_string()))?;

        let frame = CapturedFrame::new(DynamicImage::ImageRgba8(image));
        log::info!(
            "[CAPTURE] Grabbed {}x{} frame in {}ms",
            frame.width(),
            frame.height(),
            start.elapsed().as_millis()
        );
        Ok(frame)
    }
}

/// Sort an xcap error into our taxonomy.
///
/// Capture backends report refused screen-recording permission as an opaque
/// string, so this is a best-effort match; anything unrecognized is a plain
/// capture failure.
fn classify(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied(message.to_string())
    } else {
        CaptureError::CaptureFailed(message.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Screen-recording access refused. The controller treats this as the
    /// user cancelling, not as an error to surface.
    #[error("screen capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("no monitor available")]
    NoMonitor,

    #[error("screen capture failed: {0}")]
    CaptureFailed(String),
}
