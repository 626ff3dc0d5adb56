use anyhow::Result;

use crate::analyze::result::Analysis;
use crate::frame::Frame;
use crate::monitor::BinConfig;

/// Fill estimator for one bin region.
///
/// Implementations must be stateless with respect to the frame: analyzing the
/// same frame and bin twice yields the same `Analysis`. Per-bin history lives
/// in `BinMonitor`, never in the analyzer.
pub trait RegionAnalyzer {
    /// Analyzer identifier for logs.
    fn name(&self) -> &'static str;

    /// Estimate the fill ratio of `bin`'s region in `frame`.
    ///
    /// An error means the frame or region could not be analyzed; the caller
    /// drops this bin from the current cycle.
    fn analyze(&self, frame: &Frame, bin: &BinConfig) -> Result<Analysis>;
}
