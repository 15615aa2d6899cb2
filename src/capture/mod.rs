//! Screen capture domain — frames, selection mapping, crop pipeline.
//!
//! This module owns everything between "grab the screen" and "hand a PNG
//! to the chat input": the captured still frame, the aspect-fit selection
//! transform ([`geometry`]), and the crop-and-encode step. The OS-facing
//! capture source lives in [`source`].

pub mod geometry;
pub mod source;

pub use geometry::{ContainerGeometry, PixelRect, RenderBox, SelectionRect, MIN_SELECTION_PX};
pub use source::{CaptureError, CaptureSource, ScreenSource};

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// A full-resolution still frame grabbed from the capture source.
///
/// Immutable once produced; held only for the lifetime of one crop session
/// and discarded after crop or cancel.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    image: DynamicImage,
}

impl CapturedFrame {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Decode an encoded frame (PNG, JPEG, ...) as delivered by a capture
    /// collaborator that hands over bytes instead of pixels.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, CropError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| CropError::DecodingFailed(e.to_string()))?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// PNG-encoded crop of a [`CapturedFrame`].
///
/// Either attached to the next outgoing message or sent to text
/// recognition; never persisted.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// What to do with a finalized crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Stage the crop as an image attachment on the next outgoing message.
    Attach,
    /// Send the crop to text recognition and append the result to the input.
    Recognize,
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("frame decoding failed: {0}")]
    DecodingFailed(String),

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Map a container-space selection onto the frame and crop it out.
///
/// Returns `Ok(None)` for degenerate selections (below the minimum size or
/// clamped to zero area by the letterbox bars) — callers treat that as a
/// silent no-op, per the error taxonomy.
pub fn crop_selection(
    frame: &CapturedFrame,
    container: ContainerGeometry,
    selection: SelectionRect,
) -> Result<Option<CroppedImage>, CropError> {
    let rect = match geometry::map_selection(frame.width(), frame.height(), container, selection) {
        Some(rect) => rect,
        None => return Ok(None),
    };

    let start = std::time::Instant::now();
    let cropped = frame.image.crop_imm(rect.x, rect.y, rect.w, rect.h);

    let mut png = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;

    log::info!(
        "[CAPTURE] Cropped {}x{} at {},{} in {}ms — {} bytes",
        rect.w,
        rect.h,
        rect.x,
        rect.y,
        start.elapsed().as_millis(),
        png.len()
    );

    Ok(Some(CroppedImage {
        png,
        width: rect.w,
        height: rect.h,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn frame(w: u32, h: u32) -> CapturedFrame {
        CapturedFrame::new(DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
    }

    fn container(w: f64, h: f64) -> ContainerGeometry {
        ContainerGeometry { width: w, height: h }
    }

    #[test]
    fn crop_produces_png_of_mapped_size() {
        let f = frame(4000, 1000);
        let c = container(1000.0, 500.0);
        let sel = SelectionRect { x: 100.0, y: 125.0, w: 200.0, h: 50.0 };

        let out = crop_selection(&f, c, sel).unwrap().unwrap();
        assert_eq!((out.width, out.height), (800, 200));
        // PNG magic bytes
        assert_eq!(&out.png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn undersized_selection_is_a_no_op() {
        let f = frame(4000, 1000);
        let c = container(1000.0, 500.0);
        let sel = SelectionRect { x: 100.0, y: 200.0, w: 9.0, h: 50.0 };
        assert!(crop_selection(&f, c, sel).unwrap().is_none());
    }

    #[test]
    fn selection_in_letterbox_bar_is_a_no_op() {
        let f = frame(4000, 1000);
        let c = container(1000.0, 500.0);
        let sel = SelectionRect { x: 100.0, y: 20.0, w: 200.0, h: 50.0 };
        assert!(crop_selection(&f, c, sel).unwrap().is_none());
    }

    #[test]
    fn frame_round_trips_through_encoding() {
        let f = frame(64, 48);
        let c = container(64.0, 48.0);
        let sel = SelectionRect { x: 0.0, y: 0.0, w: 64.0, h: 48.0 };
        let out = crop_selection(&f, c, sel).unwrap().unwrap();

        let reloaded = CapturedFrame::from_encoded(&out.png).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (64, 48));
    }
}
