//! Pixel buffer representation consumed and produced by the engine.

use std::fmt;

use crate::error::{MatchError, Result};

/// Number of 8-bit samples per pixel (R, G, B, A).
pub const SAMPLES_PER_PIXEL: usize = 4;

/// Color channels graded by the engine. Alpha is never graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red, sample offset 0.
    Red,
    /// Green, sample offset 1.
    Green,
    /// Blue, sample offset 2.
    Blue,
}

impl Channel {
    /// All graded channels in sample order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Offset of this channel within an RGBA pixel.
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Row-major RGBA8 image. `data.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA8 samples, validating them against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(SAMPLES_PER_PIXEL))
            .ok_or_else(|| {
                MatchError::InvalidBuffer(format!("dimensions {width}x{height} overflow"))
            })?;
        if data.len() != expected {
            return Err(MatchError::InvalidBuffer(format!(
                "{width}x{height} RGBA image needs {expected} samples, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Fill a `width` x `height` image with one RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let data = rgba.repeat(count);
        Self { width, height, data }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.data.len() / SAMPLES_PER_PIXEL
    }

    /// Whether the image holds zero pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat RGBA samples.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Samples grouped per pixel.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }

    /// Consume the buffer, returning the flat RGBA samples.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
