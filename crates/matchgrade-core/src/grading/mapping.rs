//! Histogram matching: monotonic value-to-value channel mappings.
//!
//! For each source value `v` the mapping picks the smallest reference value
//! whose cumulative fraction reaches the source's cumulative fraction at `v`.
//!
//! # Algorithm
//! A two-pointer sweep over both distributions:
//! ```text
//! cursor = 0
//! for v in 0..=255:
//!     while cursor < 255 and ref_cdf[cursor] < src_cdf[v]: cursor += 1
//!     mapping[v] = cursor
//! ```
//! The cursor never moves backward, so the mapping is non-decreasing even
//! across plateaus in either distribution.
//!
//! # Complexity
//! O(256) per channel.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::image::Channel;
use crate::stats::cdf::Cdf;
use crate::stats::histogram::BINS;

/// A 256-entry source-value to target-value table for one channel.
///
/// Always non-decreasing in the source value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct ChannelMapping {
    table: Vec<u8>,
}

impl ChannelMapping {
    /// The mapping that sends every value to itself.
    pub fn identity() -> Self {
        Self {
            table: (0..=u8::MAX).collect(),
        }
    }

    /// Wrap an explicit table. Returns `None` unless it holds [`BINS`]
    /// non-decreasing entries.
    pub fn from_table(table: Vec<u8>) -> Option<Self> {
        let mapping = Self { table };
        (mapping.table.len() == BINS && mapping.is_monotonic()).then_some(mapping)
    }

    /// Match a source distribution against a reference distribution.
    ///
    /// Both slices must hold [`BINS`] non-decreasing entries, as produced by
    /// [`crate::stats::cdf::normalize`]. Fails with
    /// [`MatchError::InvalidBuffer`] on any other length.
    pub fn from_cdfs(source: &[f64], reference: &[f64]) -> Result<Self> {
        if source.len() != BINS || reference.len() != BINS {
            return Err(MatchError::InvalidBuffer(format!(
                "distributions must hold {BINS} entries, got {} and {}",
                source.len(),
                reference.len()
            )));
        }

        let last = BINS - 1;
        let mut cursor = 0usize;
        let table = source
            .iter()
            .map(|&level| {
                while cursor < last && reference[cursor] < level {
                    cursor += 1;
                }
                cursor as u8
            })
            .collect();
        Ok(Self { table })
    }

    /// Target value for `value`.
    pub fn get(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Evaluate the mapping on the normalized `[0, 1]` domain.
    ///
    /// `x` is scaled to `[0, 255]`, the two neighbouring entries are linearly
    /// interpolated, and the result is scaled back to `[0, 1]`. The identity
    /// mapping returns `x` unchanged.
    pub fn sample(&self, x: f32) -> f32 {
        let pos = x.clamp(0.0, 1.0) * 255.0;
        let lo = (pos.floor() as usize).min(BINS - 1);
        let hi = (lo + 1).min(BINS - 1);
        let frac = pos - lo as f32;
        let a = self.table[lo] as f32;
        let b = self.table[hi] as f32;
        (a + (b - a) * frac) / 255.0
    }

    /// The full table, indexed by source value.
    pub fn as_slice(&self) -> &[u8] {
        &self.table
    }

    /// Whether the table never decreases.
    pub fn is_monotonic(&self) -> bool {
        self.table.windows(2).all(|w| w[0] <= w[1])
    }

    /// Whether every value maps to itself.
    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(i, &v)| i == v as usize)
    }
}

impl TryFrom<Vec<u8>> for ChannelMapping {
    type Error = MatchError;

    fn try_from(table: Vec<u8>) -> Result<Self> {
        Self::from_table(table).ok_or_else(|| {
            MatchError::InvalidBuffer(format!(
                "mapping table must hold {BINS} non-decreasing entries"
            ))
        })
    }
}

impl From<ChannelMapping> for Vec<u8> {
    fn from(mapping: ChannelMapping) -> Self {
        mapping.table
    }
}

/// The red, green, and blue mappings for one source/reference pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMappings {
    /// Red channel mapping.
    pub red: ChannelMapping,
    /// Green channel mapping.
    pub green: ChannelMapping,
    /// Blue channel mapping.
    pub blue: ChannelMapping,
}

impl ChannelMappings {
    /// Identity on all three channels.
    pub fn identity() -> Self {
        Self {
            red: ChannelMapping::identity(),
            green: ChannelMapping::identity(),
            blue: ChannelMapping::identity(),
        }
    }

    /// Run the channel mapper once per channel.
    pub fn derive(source: &Cdf, reference: &Cdf) -> Result<Self> {
        let [red, green, blue] = Channel::ALL
            .map(|c| ChannelMapping::from_cdfs(source.channel(c), reference.channel(c)));
        Ok(Self {
            red: red?,
            green: green?,
            blue: blue?,
        })
    }

    /// Mapping for one channel.
    pub fn channel(&self, channel: Channel) -> &ChannelMapping {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}
