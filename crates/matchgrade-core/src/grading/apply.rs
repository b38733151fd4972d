//! Intensity-blended application of channel mappings to a pixel buffer.

use rayon::prelude::*;

use crate::error::{MatchError, Result};
use crate::grading::mapping::{ChannelMapping, ChannelMappings};
use crate::image::{Channel, PixelBuffer, SAMPLES_PER_PIXEL};
use crate::stats::histogram::BINS;

/// Pixel count above which grading is split across rayon workers.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Pixels per parallel work unit.
const CHUNK_PIXELS: usize = 1 << 14;

/// Reject intensities outside `[0, 1]`, including NaN.
pub fn check_intensity(intensity: f32) -> Result<()> {
    if (0.0..=1.0).contains(&intensity) {
        Ok(())
    } else {
        Err(MatchError::InvalidIntensity(intensity))
    }
}

/// Blend one mapped value with its source: `src + (mapped - src) * intensity`.
pub fn blend(source: f32, mapped: f32, intensity: f32) -> f32 {
    source + (mapped - source) * intensity
}

/// Fold the intensity blend into a 256-entry table for one channel.
///
/// Each channel's output depends only on that channel's input value, so the
/// per-pixel work reduces to three table lookups.
fn blended_table(mapping: &ChannelMapping, intensity: f32) -> [u8; BINS] {
    std::array::from_fn(|v| {
        let out = blend(v as f32, mapping.get(v as u8) as f32, intensity);
        out.round().clamp(0.0, 255.0) as u8
    })
}

/// Grade `source` with `mappings`, blended by `intensity`.
///
/// Returns a new buffer of identical dimensions. Alpha is forced to 255.
/// Intensity 0 leaves RGB untouched; intensity 1 applies the full mapping.
pub fn apply_mappings(
    source: &PixelBuffer,
    mappings: &ChannelMappings,
    intensity: f32,
) -> Result<PixelBuffer> {
    check_intensity(intensity)?;

    let tables = Channel::ALL.map(|c| blended_table(mappings.channel(c), intensity));
    let mut out = source.as_bytes().to_vec();

    let grade = |chunk: &mut [u8]| {
        for px in chunk.chunks_exact_mut(SAMPLES_PER_PIXEL) {
            px[0] = tables[0][px[0] as usize];
            px[1] = tables[1][px[1] as usize];
            px[2] = tables[2][px[2] as usize];
            px[3] = u8::MAX;
        }
    };

    if source.pixel_count() >= PARALLEL_THRESHOLD {
        out.par_chunks_mut(CHUNK_PIXELS * SAMPLES_PER_PIXEL)
            .for_each(grade);
    } else {
        grade(out.as_mut_slice());
    }

    tracing::debug!(
        width = source.width(),
        height = source.height(),
        intensity,
        "applied channel mappings"
    );
    PixelBuffer::new(source.width(), source.height(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> PixelBuffer {
        let data = (0..48u32)
            .flat_map(|i| {
                [(i * 5) as u8, (255 - i * 3) as u8, (i * i % 256) as u8, (i % 7) as u8]
            })
            .collect();
        PixelBuffer::new(8, 6, data).unwrap()
    }

    fn upper_half() -> ChannelMappings {
        // Squash into the upper half.
        let table: Vec<u8> = (0..=255u16).map(|v| (128 + v / 2) as u8).collect();
        let mapping = ChannelMapping::from_table(table).unwrap();
        ChannelMappings {
            red: mapping.clone(),
            green: mapping.clone(),
            blue: mapping,
        }
    }

    #[test]
    fn test_zero_intensity_preserves_rgb_and_forces_alpha() {
        let src = sample_image();
        let out = apply_mappings(&src, &upper_half(), 0.0).unwrap();
        for (a, b) in src.pixels().iter().zip(out.pixels()) {
            assert_eq!(a[..3], b[..3]);
            assert_eq!(b[3], 255);
        }
    }

    #[test]
    fn test_full_intensity_applies_mapping() {
        let src = sample_image();
        let mappings = upper_half();
        let out = apply_mappings(&src, &mappings, 1.0).unwrap();
        for (a, b) in src.pixels().iter().zip(out.pixels()) {
            for c in Channel::ALL {
                let i = c.index();
                assert_eq!(b[i], mappings.channel(c).get(a[i]));
            }
        }
    }

    #[test]
    fn test_half_intensity_rounds_midpoint() {
        let src = PixelBuffer::filled(2, 2, [0, 100, 255, 0]);
        let out = apply_mappings(&src, &upper_half(), 0.5).unwrap();
        // red: 0 -> 128, halfway 64; green: 100 -> 178, halfway 139;
        // blue: 255 -> 255.
        assert_eq!(out.pixels()[0], [64, 139, 255, 255]);
    }

    #[test]
    fn test_output_keeps_dimensions() {
        let src = sample_image();
        let out = apply_mappings(&src, &ChannelMappings::identity(), 0.7).unwrap();
        assert_eq!(out.width(), 8);
        assert_eq!(out.height(), 6);
        assert_eq!(out.as_bytes().len(), src.as_bytes().len());
    }

    #[test]
    fn test_out_of_range_intensity_is_rejected() {
        let src = sample_image();
        for bad in [-0.1, 1.5, f32::NAN] {
            let err = apply_mappings(&src, &ChannelMappings::identity(), bad).unwrap_err();
            assert!(matches!(err, MatchError::InvalidIntensity(_)));
        }
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        let n = PARALLEL_THRESHOLD + 123;
        let data = (0..n)
            .flat_map(|i| [(i % 256) as u8, (i / 5 % 256) as u8, (i / 11 % 256) as u8, 0])
            .collect();
        let big = PixelBuffer::new(n as u32, 1, data).unwrap();
        let mappings = upper_half();
        let out = apply_mappings(&big, &mappings, 0.25).unwrap();

        let tables = Channel::ALL.map(|c| blended_table(mappings.channel(c), 0.25));
        for (a, b) in big.pixels().iter().zip(out.pixels()) {
            let expected = [
                tables[0][a[0] as usize],
                tables[1][a[1] as usize],
                tables[2][a[2] as usize],
                255,
            ];
            assert_eq!(*b, expected);
        }
    }
}
