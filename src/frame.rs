//! Decoded camera frames.
//!
//! A `Frame` is one decoded RGB image handed from a frame source to the
//! monitoring loop. Frames are read-only once captured: every bin in a cycle
//! analyzes the same frame, and nothing retains it past the end of the cycle.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// One decoded RGB frame.
///
/// There is no `Clone`; a frame is passed by reference to the analyzers and
/// dropped at the end of the cycle that read it.
pub struct Frame {
    image: RgbImage,

    /// Sequence number assigned by the source (1-based, per source lifetime).
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from tightly packed RGB bytes (`width * height * 3`).
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>, sequence: u64) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "rgb buffer has {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("rgb buffer does not match {}x{}", width, height))?;
        Ok(Self::new(image, sequence))
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}
