//! Cumulative distribution functions derived from histograms.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::image::Channel;
use crate::stats::histogram::{BINS, Histogram};

/// Normalize one channel's bucket counts into a cumulative distribution.
///
/// Entry `v` is the fraction of pixels whose value is `<= v`. The running sum
/// is evaluated from value 0 upward, so the final entry is exactly `1.0`.
///
/// # Errors
/// - [`MatchError::EmptyImage`] when `total` is zero.
/// - [`MatchError::InvalidBuffer`] when `counts` is not [`BINS`] long.
pub fn normalize(counts: &[u64], total: u64) -> Result<Vec<f64>> {
    if total == 0 {
        return Err(MatchError::EmptyImage);
    }
    if counts.len() != BINS {
        return Err(MatchError::InvalidBuffer(format!(
            "expected {BINS} histogram buckets, got {}",
            counts.len()
        )));
    }

    let total = total as f64;
    let mut running = 0u64;
    Ok(counts
        .iter()
        .map(|&c| {
            running += c;
            running as f64 / total
        })
        .collect())
}

/// Cumulative distributions for the R, G, and B channels.
///
/// Each channel holds [`BINS`] non-decreasing fractions in `[0, 1]` ending at
/// exactly `1.0`. Deserialized values are checked against the same rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCdf")]
pub struct Cdf {
    channels: [Vec<f64>; 3],
}

#[derive(Deserialize)]
struct RawCdf {
    channels: [Vec<f64>; 3],
}

impl TryFrom<RawCdf> for Cdf {
    type Error = MatchError;

    fn try_from(raw: RawCdf) -> Result<Self> {
        for (channel, values) in Channel::ALL.iter().zip(&raw.channels) {
            check_channel(*channel, values)?;
        }
        Ok(Self {
            channels: raw.channels,
        })
    }
}

fn check_channel(channel: Channel, values: &[f64]) -> Result<()> {
    if values.len() != BINS {
        return Err(MatchError::InvalidBuffer(format!(
            "{channel} distribution has {} entries, expected {BINS}",
            values.len()
        )));
    }
    if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(MatchError::InvalidBuffer(format!(
            "{channel} distribution has values outside [0, 1]"
        )));
    }
    if values.windows(2).any(|w| w[0] > w[1]) {
        return Err(MatchError::InvalidBuffer(format!(
            "{channel} distribution decreases"
        )));
    }
    if values[BINS - 1] != 1.0 {
        return Err(MatchError::InvalidBuffer(format!(
            "{channel} distribution does not end at 1.0"
        )));
    }
    Ok(())
}

impl Cdf {
    /// Normalize all three channels of a histogram.
    pub fn from_histogram(histogram: &Histogram) -> Result<Self> {
        let total = histogram.pixel_count();
        let [r, g, b] = Channel::ALL.map(|c| normalize(histogram.channel(c), total));
        Ok(Self {
            channels: [r?, g?, b?],
        })
    }

    /// The distribution for one channel. Always [`BINS`] entries.
    pub fn channel(&self, channel: Channel) -> &[f64] {
        &self.channels[channel.index()]
    }
}
