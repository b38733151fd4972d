//! 3D LUT synthesis, application, and `.cube` file I/O.
//!
//! # Format
//! ```text
//! TITLE "Matched Grade"
//! LUT_3D_SIZE 33
//!
//! 0.000000 0.000000 0.000000
//! 0.031250 0.000000 0.000000
//! ...
//! ```
//! Red varies fastest, then green, then blue.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{MatchError, Result};
use crate::grading::apply::{blend, check_intensity};
use crate::grading::mapping::{ChannelMapping, ChannelMappings};
use crate::image::PixelBuffer;

/// Default grid resolution per axis.
pub const DEFAULT_LUT_SIZE: u32 = 33;

/// Largest accepted grid resolution per axis.
pub const MAX_LUT_SIZE: u32 = 256;

/// Fails with [`MatchError::InvalidLutSize`] outside `2..=MAX_LUT_SIZE`.
pub fn check_lut_size(size: u32) -> Result<()> {
    if (2..=MAX_LUT_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(MatchError::InvalidLutSize(size))
    }
}

/// A 3D lookup table sampled on a regular grid over `[0, 1]³`.
#[derive(Debug, Clone, PartialEq)]
pub struct LutGrid {
    size: u32,
    data: Vec<[f32; 3]>,
}

impl LutGrid {
    /// Grid whose every entry equals its own coordinate.
    pub fn identity(size: u32) -> Result<Self> {
        Self::synthesize(&ChannelMappings::identity(), 1.0, size)
    }

    /// Sample `mappings`, blended by `intensity`, on a `size`³ grid.
    ///
    /// Each axis value `i / (size - 1)` goes through the corresponding
    /// channel mapping on the normalized domain and is blended with the
    /// unmodified value exactly as the pixel grader does.
    pub fn synthesize(mappings: &ChannelMappings, intensity: f32, size: u32) -> Result<Self> {
        check_lut_size(size)?;
        check_intensity(intensity)?;

        let n = size as usize;
        let scale = (n - 1) as f32;
        let axis = |mapping: &ChannelMapping| -> Vec<f32> {
            (0..n)
                .map(|i| {
                    let x = i as f32 / scale;
                    blend(x, mapping.sample(x), intensity)
                })
                .collect()
        };
        let (red, green, blue) = (
            axis(&mappings.red),
            axis(&mappings.green),
            axis(&mappings.blue),
        );

        let mut data = Vec::with_capacity(n * n * n);
        for b in &blue {
            for g in &green {
                for r in &red {
                    data.push([*r, *g, *b]);
                }
            }
        }

        tracing::debug!(size, intensity, "synthesized 3D LUT");
        Ok(Self { size, data })
    }

    /// Grid resolution per axis.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Entries in `.cube` order (red fastest). Length = size³.
    pub fn entries(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Entry at grid coordinates `(r, g, b)`.
    pub fn at(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let n = self.size as usize;
        self.data[r + g * n + b * n * n]
    }

    /// Apply this LUT to an RGB triple using trilinear interpolation.
    ///
    /// Inputs are clamped to `[0, 1]`.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = self.size as usize;
        let scale = (n - 1) as f32;

        let split = |v: f32| {
            let pos = v.clamp(0.0, 1.0) * scale;
            let lo = (pos.floor() as usize).min(n - 2);
            (lo, pos - lo as f32)
        };
        let (r0, fr) = split(rgb[0]);
        let (g0, fg) = split(rgb[1]);
        let (b0, fb) = split(rgb[2]);

        let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };

        let c00 = lerp(self.at(r0, g0, b0), self.at(r0 + 1, g0, b0), fr);
        let c10 = lerp(self.at(r0, g0 + 1, b0), self.at(r0 + 1, g0 + 1, b0), fr);
        let c01 = lerp(self.at(r0, g0, b0 + 1), self.at(r0 + 1, g0, b0 + 1), fr);
        let c11 = lerp(self.at(r0, g0 + 1, b0 + 1), self.at(r0 + 1, g0 + 1, b0 + 1), fr);

        let c0 = lerp(c00, c10, fg);
        let c1 = lerp(c01, c11, fg);
        lerp(c0, c1, fb)
    }

    /// Apply this LUT to every pixel of `source`. Alpha is forced to 255.
    pub fn apply_to_buffer(&self, source: &PixelBuffer) -> Result<PixelBuffer> {
        let data = source
            .pixels()
            .iter()
            .flat_map(|px| {
                let rgb = self.apply([px[0], px[1], px[2]].map(|v| v as f32 / 255.0));
                let [r, g, b] = rgb.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8);
                [r, g, b, u8::MAX]
            })
            .collect();
        PixelBuffer::new(source.width(), source.height(), data)
    }

    /// Serialize as `.cube` text.
    pub fn write_cube<W: Write>(&self, title: &str, mut writer: W) -> Result<()> {
        write!(writer, "{}", CubeText { lut: self, title })?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize as an in-memory `.cube` document.
    pub fn to_cube_string(&self, title: &str) -> String {
        CubeText { lut: self, title }.to_string()
    }

    /// Save this LUT to a `.cube` file.
    pub fn save_cube(&self, path: &Path, title: &str) -> Result<()> {
        let file = File::create(path)?;
        self.write_cube(title, BufWriter::new(file))?;
        tracing::info!("wrote {}³ LUT to {}", self.size, path.display());
        Ok(())
    }

    /// Load a 3D LUT from a `.cube` file.
    pub fn load_cube(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::parse_cube(BufReader::new(file))
    }

    /// Parse `.cube` text.
    ///
    /// Comments, `TITLE`, and `DOMAIN_MIN`/`DOMAIN_MAX` lines are accepted;
    /// domains other than `[0, 1]` and 1D LUTs are rejected.
    pub fn parse_cube<R: BufRead>(reader: R) -> Result<Self> {
        let mut size: Option<u32> = None;
        let mut data: Vec<[f32; 3]> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("TITLE") {
                continue;
            }

            if let Some(rest) = line.strip_prefix("LUT_3D_SIZE") {
                let n: u32 = rest
                    .trim()
                    .parse()
                    .map_err(|_| MatchError::CubeParse(format!("bad size: {line}")))?;
                check_lut_size(n)?;
                size = Some(n);
            } else if line.starts_with("LUT_1D_SIZE") {
                return Err(MatchError::CubeParse("expected 3D LUT, found 1D".into()));
            } else if let Some(rest) = line.strip_prefix("DOMAIN_MIN") {
                check_domain(rest, 0.0)?;
            } else if let Some(rest) = line.strip_prefix("DOMAIN_MAX") {
                check_domain(rest, 1.0)?;
            } else {
                data.push(parse_triple(line)?);
            }
        }

        let size = size.ok_or_else(|| MatchError::CubeParse("missing LUT_3D_SIZE".into()))?;
        let expected = (size as usize)
            .checked_pow(3)
            .ok_or_else(|| MatchError::CubeParse(format!("LUT_3D_SIZE {size} is too large")))?;
        if data.len() != expected {
            return Err(MatchError::CubeParse(format!(
                "expected {expected} entries, found {}",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }
}

/// `.cube` rendering of a grid under a title.
struct CubeText<'a> {
    lut: &'a LutGrid,
    title: &'a str,
}

impl fmt::Display for CubeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TITLE \"{}\"", self.title.replace('"', "'"))?;
        writeln!(f, "LUT_3D_SIZE {}", self.lut.size)?;
        writeln!(f)?;
        for [r, g, b] in &self.lut.data {
            writeln!(f, "{r:.6} {g:.6} {b:.6}")?;
        }
        Ok(())
    }
}

fn parse_triple(line: &str) -> Result<[f32; 3]> {
    let mut values = line.split_whitespace().map(|s| {
        s.parse::<f32>()
            .map_err(|_| MatchError::CubeParse(format!("bad value {s:?} in {line:?}")))
    });
    let mut next = || {
        values
            .next()
            .unwrap_or_else(|| Err(MatchError::CubeParse(format!("short line: {line:?}"))))
    };
    let triple = [next()?, next()?, next()?];
    if values.next().is_some() {
        return Err(MatchError::CubeParse(format!("extra values in {line:?}")));
    }
    Ok(triple)
}

fn check_domain(rest: &str, expected: f32) -> Result<()> {
    let domain = parse_triple(rest.trim())?;
    if domain.iter().any(|v| (v - expected).abs() > 1e-6) {
        return Err(MatchError::CubeParse(format!(
            "unsupported domain {domain:?}, only [0, 1] is supported"
        )));
    }
    Ok(())
}
