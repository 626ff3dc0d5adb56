use serde::{Deserialize, Serialize};

/// Fill classification of a bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillLevel {
    Empty,
    Half,
    Full,
}

impl FillLevel {
    /// Classify a ratio. Comparisons are strict: a ratio exactly at a
    /// threshold stays in the lower tier.
    pub fn classify(ratio: f64, thresholds: &FillThresholds) -> Self {
        if ratio > thresholds.full {
            FillLevel::Full
        } else if ratio > thresholds.half {
            FillLevel::Half
        } else {
            FillLevel::Empty
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FillLevel::Empty => "Empty",
            FillLevel::Half => "Half",
            FillLevel::Full => "Full",
        }
    }
}

impl std::fmt::Display for FillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-bin classification thresholds (edge ratio, 0..=1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillThresholds {
    pub full: f64,
    pub half: f64,
}

/// Output of a region analyzer for one bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Analysis {
    /// Edge pixels / total pixels within the region.
    pub ratio: f64,
    pub fill: FillLevel,
}
