//! Region analysis.
//!
//! Turns the pixels inside one bin's region into a fill ratio and a
//! `FillLevel`. The production backend measures edge density; the trait seam
//! lets the monitoring loop be driven by other estimators.

mod analyzer;
mod edge;
mod region;
mod result;

pub use analyzer::RegionAnalyzer;
pub use edge::{EdgeDensityAnalyzer, EdgeProfile};
pub use region::{crop_region, encode_jpeg_base64, Region, MIN_REGION_SIDE};
pub use result::{Analysis, FillLevel, FillThresholds};
