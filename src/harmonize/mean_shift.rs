//! Lightness-only mean shift with gain

use super::{ChannelStats, ChannelTransfer, ColorHarmonizer};

/// Shifts lightness by `target_mean − gain · source_mean`
///
/// Chroma channels are untouched. A gain above one darkens bright subjects
/// placed on darker backgrounds more than a plain mean match would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanShiftHarmonizer {
    pub gain: f64,
}

impl MeanShiftHarmonizer {
    #[must_use]
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }
}

impl Default for MeanShiftHarmonizer {
    fn default() -> Self {
        Self::new(1.7)
    }
}

impl ColorHarmonizer for MeanShiftHarmonizer {
    fn name(&self) -> &'static str {
        "mean-shift"
    }

    fn plan(&self, source: &ChannelStats, target: &ChannelStats) -> ChannelTransfer {
        let mut transfer = ChannelTransfer::identity();
        transfer.offset[0] = target.mean[0] - self.gain * source.mean[0];
        transfer
    }
}
