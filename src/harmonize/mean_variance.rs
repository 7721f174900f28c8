//! Per-channel mean and standard deviation transfer

use super::{ChannelStats, ChannelTransfer, ColorHarmonizer};

/// Matches mean and standard deviation of every Lab channel
///
/// `out = (value − source_mean) · target_std / source_std + target_mean`,
/// with a zero source deviation treated as one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanVarianceHarmonizer;

impl ColorHarmonizer for MeanVarianceHarmonizer {
    fn name(&self) -> &'static str {
        "mean-variance"
    }

    fn plan(&self, source: &ChannelStats, target: &ChannelStats) -> ChannelTransfer {
        let mut transfer = ChannelTransfer::identity();
        for c in 0..3 {
            let source_std = if source.std[c] == 0.0 { 1.0 } else { source.std[c] };
            let scale = target.std[c] / source_std;
            transfer.scale[c] = scale;
            transfer.offset[c] = target.mean[c] - source.mean[c] * scale;
        }
        transfer
    }
}
