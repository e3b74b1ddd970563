use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidFrame(pub &'static str);

impl std::fmt::Display for InvalidFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid depth frame: {}", self.0)
    }
}

impl std::error::Error for InvalidFrame {}

/// Aggregate reading of one depth camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawDepthFrame")]
pub struct DepthFrame {
    width: u32,
    height: u32,
    min_distance: f64,
    max_distance: f64,
    timestamp_ms: u64,
}

#[derive(Deserialize)]
struct RawDepthFrame {
    width: u32,
    height: u32,
    min_distance_meters: f64,
    max_distance_meters: f64,
    timestamp_ms: u64,
}

impl TryFrom<RawDepthFrame> for DepthFrame {
    type Error = InvalidFrame;

    fn try_from(raw: RawDepthFrame) -> Result<Self, Self::Error> {
        DepthFrame::new(
            raw.width,
            raw.height,
            raw.min_distance_meters,
            raw.max_distance_meters,
            raw.timestamp_ms,
        )
    }
}

impl DepthFrame {
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(
        width: u32,
        height: u32,
        min_distance: f64,
        max_distance: f64,
        timestamp_ms: u64,
    ) -> Result<Self, InvalidFrame> {
        if width == 0 || height == 0 {
            return Err(InvalidFrame("frame dimensions must be at least 1x1"));
        }
        if !(min_distance >= 0.0 && max_distance >= 0.0) {
            return Err(InvalidFrame("distances must be non-negative"));
        }
        Ok(Self { width, height, min_distance, max_distance, timestamp_ms })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn min_distance(&self) -> f64 { self.min_distance }
    pub fn max_distance(&self) -> f64 { self.max_distance }
    pub fn timestamp_ms(&self) -> u64 { self.timestamp_ms }
}
