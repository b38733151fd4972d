//! Stateless end-to-end entry points.
//!
//! Each call derives fresh statistics from the two buffers it is given:
//! 1. Histogram and CDF for source and reference (independent, run in parallel)
//! 2. One channel mapping per channel
//! 3. Either the graded preview or the synthesized LUT

use crate::error::Result;
use crate::grading::apply::apply_mappings;
use crate::grading::mapping::ChannelMappings;
use crate::image::PixelBuffer;
use crate::stats::{Cdf, Histogram};
use crate::transform::lut::LutGrid;
use crate::transform::params::GradeParams;

/// Histogram and CDF of a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    /// Per-channel bucket counts.
    pub histogram: Histogram,
    /// Per-channel cumulative distributions.
    pub cdf: Cdf,
}

impl ImageStats {
    /// Build both statistics. Fails with `EmptyImage` for zero pixels.
    pub fn compute(buffer: &PixelBuffer) -> Result<Self> {
        let histogram = Histogram::from_buffer(buffer);
        let cdf = Cdf::from_histogram(&histogram)?;
        Ok(Self { histogram, cdf })
    }
}

/// Derive the three channel mappings that match `source` to `reference`.
pub fn derive_mappings(source: &PixelBuffer, reference: &PixelBuffer) -> Result<ChannelMappings> {
    let (src, reference) = rayon::join(
        || ImageStats::compute(source),
        || ImageStats::compute(reference),
    );
    let mappings = ChannelMappings::derive(&src?.cdf, &reference?.cdf)?;
    tracing::debug!("derived channel mappings");
    Ok(mappings)
}

/// Grade `source` toward `reference` at the given intensity.
pub fn grade(source: &PixelBuffer, reference: &PixelBuffer, intensity: f32) -> Result<PixelBuffer> {
    let mappings = derive_mappings(source, reference)?;
    apply_mappings(source, &mappings, intensity)
}

/// Synthesize the LUT for the `source` to `reference` match.
pub fn synthesize_lut(
    source: &PixelBuffer,
    reference: &PixelBuffer,
    params: &GradeParams,
) -> Result<LutGrid> {
    params.validate()?;
    let mappings = derive_mappings(source, reference)?;
    LutGrid::synthesize(&mappings, params.intensity, params.lut_size)
}

/// Export the `source` to `reference` match as `.cube` text.
pub fn export_cube(
    source: &PixelBuffer,
    reference: &PixelBuffer,
    params: &GradeParams,
) -> Result<String> {
    let lut = synthesize_lut(source, reference, params)?;
    Ok(lut.to_cube_string(&params.lut_title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    fn ramp(width: u32, lo: u8, hi: u8) -> PixelBuffer {
        let span = (hi - lo) as u32;
        let data = (0..width)
            .flat_map(|x| {
                let v = lo + (x * span / (width - 1)) as u8;
                [v, hi - (v - lo), v, 255]
            })
            .collect();
        PixelBuffer::new(width, 1, data).unwrap()
    }

    #[test]
    fn test_grade_pushes_source_toward_reference() {
        let source = ramp(64, 20, 80);
        let reference = ramp(64, 150, 230);
        let graded = grade(&source, &reference, 1.0).unwrap();

        let mean = |buf: &PixelBuffer| {
            buf.pixels().iter().map(|p| p[0] as f64).sum::<f64>() / buf.pixel_count() as f64
        };
        assert!(mean(&graded) > 140.0, "graded red mean {}", mean(&graded));
    }

    #[test]
    fn test_grade_at_zero_intensity_returns_source_rgb() {
        let source = ramp(32, 0, 255);
        let reference = ramp(32, 100, 120);
        let graded = grade(&source, &reference, 0.0).unwrap();
        assert_eq!(graded, source);
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        let source = ramp(8, 0, 100);
        let empty = PixelBuffer::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(
            grade(&source, &empty, 1.0),
            Err(MatchError::EmptyImage)
        ));
        assert!(matches!(
            export_cube(&empty, &source, &GradeParams::default()),
            Err(MatchError::EmptyImage)
        ));
    }

    #[test]
    fn test_exported_lut_reproduces_preview() {
        let source = ramp(128, 0, 255);
        let reference = ramp(128, 60, 200);
        let params = GradeParams {
            intensity: 0.8,
            lut_size: 65,
            ..GradeParams::default()
        };

        let graded = grade(&source, &reference, params.intensity).unwrap();
        let lut = synthesize_lut(&source, &reference, &params).unwrap();

        for (src, out) in source.pixels().iter().zip(graded.pixels()) {
            let rgb = [src[0], src[1], src[2]].map(|v| v as f32 / 255.0);
            let via_lut = lut.apply(rgb).map(|v| v * 255.0);
            for c in 0..3 {
                let diff = (via_lut[c] - out[c] as f32).abs();
                assert!(diff <= 3.0, "channel {c}: lut {} vs preview {}", via_lut[c], out[c]);
            }
        }
    }

    #[test]
    fn test_export_cube_uses_real_mappings() {
        let source = PixelBuffer::filled(4, 4, [50, 50, 50, 255]);
        let reference = PixelBuffer::filled(4, 4, [200, 200, 200, 255]);
        let cube = export_cube(&source, &reference, &GradeParams::default()).unwrap();
        let identity = LutGrid::identity(33).unwrap().to_cube_string("Matched Grade");
        assert_ne!(cube, identity);
        assert!(cube.starts_with("TITLE \"Matched Grade\"\nLUT_3D_SIZE 33\n\n"));
    }
}
