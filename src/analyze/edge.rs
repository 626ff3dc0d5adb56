use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::analyze::analyzer::RegionAnalyzer;
use crate::analyze::region::crop_region;
use crate::analyze::result::{Analysis, FillLevel};
use crate::frame::Frame;
use crate::monitor::BinConfig;

/// Smoothing and edge-detector parameters for one bin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeProfile {
    /// Gaussian sigma applied before edge detection. 1.1 matches a 5x5 kernel.
    pub blur_sigma: f32,
    /// Hysteresis thresholds of the Canny detector (gradient magnitude).
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeProfile {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

impl EdgeProfile {
    pub fn validate(&self) -> Result<()> {
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(anyhow!("blur_sigma must be > 0 (got {})", self.blur_sigma));
        }
        if !(self.low_threshold > 0.0 && self.low_threshold <= self.high_threshold) {
            return Err(anyhow!(
                "edge thresholds must satisfy 0 < low <= high (got {} / {})",
                self.low_threshold,
                self.high_threshold
            ));
        }
        Ok(())
    }
}

/// Edge-density fill estimator.
///
/// Crop → luma → Gaussian blur → Canny; the ratio is the share of edge pixels
/// in the region. A cluttered (full) bin shows many edges, an empty one few.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeDensityAnalyzer;

impl EdgeDensityAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl RegionAnalyzer for EdgeDensityAnalyzer {
    fn name(&self) -> &'static str {
        "edge-density"
    }

    fn analyze(&self, frame: &Frame, bin: &BinConfig) -> Result<Analysis> {
        let crop = crop_region(frame, &bin.region)?;
        let ratio = edge_ratio(&crop, &bin.edges)?;
        Ok(Analysis {
            ratio,
            fill: FillLevel::classify(ratio, &bin.thresholds),
        })
    }
}

/// Fraction of pixels Canny marks as edges in `crop`.
pub fn edge_ratio(crop: &RgbImage, profile: &EdgeProfile) -> Result<f64> {
    profile.validate()?;
    let total = crop.width() as u64 * crop.height() as u64;
    if total == 0 {
        return Err(anyhow!("cannot analyze an empty region"));
    }

    let gray: GrayImage = image::imageops::grayscale(crop);
    let smoothed = imageproc::filter::gaussian_blur_f32(&gray, profile.blur_sigma);
    let edges = imageproc::edges::canny(
        &smoothed,
        profile.low_threshold,
        profile.high_threshold,
    );

    let edge_pixels = edges.as_raw().iter().filter(|&&p| p != 0).count() as u64;
    Ok(edge_pixels as f64 / total as f64)
}
