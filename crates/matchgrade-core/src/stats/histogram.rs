//! Per-channel RGB histogram computation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::image::{Channel, PixelBuffer, SAMPLES_PER_PIXEL};

/// Number of buckets per channel (one per 8-bit value).
pub const BINS: usize = 256;

/// Pixel count above which counting is split across rayon workers.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Pixels per parallel work unit.
const CHUNK_PIXELS: usize = 1 << 14;

type Counts = [[u64; BINS]; 3];

/// Bucket counts for the R, G, and B channels (256 bins each).
///
/// Each channel's counts sum to the pixel count of the image it was built
/// from. Alpha samples are not counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHistogram")]
pub struct Histogram {
    bins: [Vec<u64>; 3],
    pixel_count: u64,
}

#[derive(Deserialize)]
struct RawHistogram {
    bins: [Vec<u64>; 3],
    pixel_count: u64,
}

impl TryFrom<RawHistogram> for Histogram {
    type Error = MatchError;

    fn try_from(raw: RawHistogram) -> Result<Self> {
        for (channel, counts) in Channel::ALL.iter().zip(&raw.bins) {
            if counts.len() != BINS {
                return Err(MatchError::InvalidBuffer(format!(
                    "{channel} histogram has {} buckets, expected {BINS}",
                    counts.len()
                )));
            }
            let sum = counts.iter().try_fold(0u64, |acc, &c| acc.checked_add(c));
            if sum != Some(raw.pixel_count) {
                return Err(MatchError::InvalidBuffer(format!(
                    "{channel} histogram counts do not sum to {} pixels",
                    raw.pixel_count
                )));
            }
        }
        Ok(Self {
            bins: raw.bins,
            pixel_count: raw.pixel_count,
        })
    }
}

impl Histogram {
    /// Build a histogram from a validated pixel buffer.
    pub fn from_buffer(buffer: &PixelBuffer) -> Self {
        Self::from_counts(count(buffer.pixels()), buffer.pixel_count() as u64)
    }

    /// Build a histogram from flat RGBA samples.
    ///
    /// Fails with [`MatchError::InvalidBuffer`] when the slice length is not
    /// a whole number of pixels.
    pub fn from_samples(samples: &[u8]) -> Result<Self> {
        if samples.len() % SAMPLES_PER_PIXEL != 0 {
            return Err(MatchError::InvalidBuffer(format!(
                "{} samples is not a multiple of {SAMPLES_PER_PIXEL}",
                samples.len()
            )));
        }
        let pixels: &[[u8; 4]] = bytemuck::cast_slice(samples);
        Ok(Self::from_counts(count(pixels), pixels.len() as u64))
    }

    fn from_counts(counts: Counts, pixel_count: u64) -> Self {
        let bins = counts.map(|c| c.to_vec());
        tracing::debug!(pixel_count, "histogram built");
        Self { bins, pixel_count }
    }

    /// Bucket counts for one channel. Always [`BINS`] entries.
    pub fn channel(&self, channel: Channel) -> &[u64] {
        &self.bins[channel.index()]
    }

    /// Number of pixels counted.
    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    /// Largest bucket across all channels, for display normalization.
    pub fn peak(&self) -> u64 {
        self.bins
            .iter()
            .flat_map(|c| c.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

fn count(pixels: &[[u8; 4]]) -> Counts {
    if pixels.len() < PARALLEL_THRESHOLD {
        return count_sequential(pixels);
    }

    pixels
        .par_chunks(CHUNK_PIXELS)
        .map(count_sequential)
        .reduce(
            || [[0; BINS]; 3],
            |mut acc, part| {
                for (dst, src) in acc.iter_mut().zip(part.iter()) {
                    for (d, s) in dst.iter_mut().zip(src.iter()) {
                        *d += s;
                    }
                }
                acc
            },
        )
}

fn count_sequential(pixels: &[[u8; 4]]) -> Counts {
    let mut counts = [[0u64; BINS]; 3];
    for px in pixels {
        counts[0][px[0] as usize] += 1;
        counts[1][px[1] as usize] += 1;
        counts[2][px[2] as usize] += 1;
    }
    counts
}
