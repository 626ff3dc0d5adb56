use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as base64_engine, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Smallest region side accepted, in pixels. The smoothing and gradient
/// kernels need a 3x3 neighbourhood.
pub const MIN_REGION_SIDE: u32 = 3;

/// Pixel rectangle covering one bin in the camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the whole rectangle lies inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        right <= width as u64 && bottom <= height as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_REGION_SIDE || self.height < MIN_REGION_SIDE {
            return Err(anyhow!(
                "region {}x{} is smaller than {}x{}",
                self.width,
                self.height,
                MIN_REGION_SIDE,
                MIN_REGION_SIDE
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Copy the region out of the frame.
///
/// Fails instead of clamping when the region does not fit the frame, so a
/// misconfigured region never yields a ratio computed over the wrong pixels.
pub fn crop_region(frame: &Frame, region: &Region) -> Result<RgbImage> {
    region.validate()?;
    if !region.fits_within(frame.width(), frame.height()) {
        return Err(anyhow!(
            "region {} exceeds frame {}x{}",
            region,
            frame.width(),
            frame.height()
        ));
    }
    Ok(image::imageops::crop_imm(
        frame.image(),
        region.x,
        region.y,
        region.width,
        region.height,
    )
    .to_image())
}

/// Encode an image as JPEG and return it base64 (standard alphabet, padded).
pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(image)
        .context("encode region as jpeg")?;
    Ok(base64_engine.encode(jpeg))
}
