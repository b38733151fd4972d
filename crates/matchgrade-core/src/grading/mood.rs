//! One-sentence mood description of a reference image.
//!
//! The description is cosmetic. Callers log a [`MoodError`] and carry on; it
//! never changes or blocks grading results.
//!
//! # Algorithm
//! 1. Compute mean R, G, B, per-pixel saturation, and luminance spread
//! 2. Convert the mean color to CIE LCh
//! 3. Bucket lightness, hue, saturation, and spread into words

use palette::{FromColor, LinSrgb, Lch, Srgb};

use crate::image::PixelBuffer;

/// Errors from a mood describer.
#[derive(Debug, thiserror::Error)]
pub enum MoodError {
    #[error("cannot describe an image with no pixels")]
    EmptyImage,
}

/// Produces a short textual description of a reference image's look.
pub trait MoodDescriber: Send + Sync {
    /// Describe `reference` in one sentence.
    fn describe(&self, reference: &PixelBuffer) -> Result<String, MoodError>;
}

/// Local describer based on color statistics. Needs no network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteMoodDescriber;

impl MoodDescriber for PaletteMoodDescriber {
    fn describe(&self, reference: &PixelBuffer) -> Result<String, MoodError> {
        let stats = ColorStats::compute(reference).ok_or(MoodError::EmptyImage)?;

        let mean = Srgb::new(stats.mean[0], stats.mean[1], stats.mean[2]);
        let linear: LinSrgb = mean.into_linear();
        let lch: Lch = Lch::from_color(linear);

        let tone = match lch.l {
            l if l < 30.0 => "dark, low-key",
            l if l > 70.0 => "bright, airy",
            _ => "balanced",
        };
        let temperature = if lch.chroma < 8.0 {
            "neutral"
        } else {
            match lch.hue.into_positive_degrees() {
                h if h < 100.0 || h >= 345.0 => "warm",
                h if h < 160.0 => "green-tinted",
                h if h < 320.0 => "cool",
                _ => "magenta-tinted",
            }
        };
        let colors = match stats.saturation {
            s if s < 0.12 => "muted",
            s if s > 0.35 => "vivid",
            _ => "natural",
        };
        let contrast = match stats.luma_stddev {
            d if d < 0.12 => "soft",
            d if d > 0.25 => "punchy",
            _ => "moderate",
        };

        Ok(format!(
            "A {tone}, {temperature} look with {colors} colors and {contrast} contrast."
        ))
    }
}

struct ColorStats {
    mean: [f32; 3],
    saturation: f32,
    luma_stddev: f32,
}

impl ColorStats {
    fn compute(image: &PixelBuffer) -> Option<Self> {
        if image.is_empty() {
            return None;
        }

        let n = image.pixel_count() as f64;
        let mut sum = [0.0_f64; 3];
        let mut sat_sum = 0.0_f64;
        let mut luma_sum = 0.0_f64;
        let mut luma_sq = 0.0_f64;

        for px in image.pixels() {
            let rgb = [px[0], px[1], px[2]].map(|v| v as f64 / 255.0);
            for c in 0..3 {
                sum[c] += rgb[c];
            }
            let max = rgb[0].max(rgb[1]).max(rgb[2]);
            let min = rgb[0].min(rgb[1]).min(rgb[2]);
            if max > 1e-10 {
                sat_sum += (max - min) / max;
            }
            let luma = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
            luma_sum += luma;
            luma_sq += luma * luma;
        }

        let luma_mean = luma_sum / n;
        let variance = (luma_sq / n) - luma_mean * luma_mean;
        Some(Self {
            mean: sum.map(|s| (s / n) as f32),
            saturation: (sat_sum / n) as f32,
            luma_stddev: variance.max(0.0).sqrt() as f32,
        })
    }
}
