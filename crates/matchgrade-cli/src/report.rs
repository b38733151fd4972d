//! JSON summary of a grading run.
//!
//! Written with `--report` so that other tools can pick up the derived
//! mappings without re-running the match.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use matchgrade_core::{ChannelMappings, GradeParams, PixelBuffer};

/// Pixel dimensions of an input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl From<&PixelBuffer> for Dimensions {
    fn from(buffer: &PixelBuffer) -> Self {
        Self {
            width: buffer.width(),
            height: buffer.height(),
        }
    }
}

/// Everything a grading run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Source image dimensions.
    pub source: Dimensions,
    /// Reference image dimensions.
    pub reference: Dimensions,
    /// Parameters the run used.
    pub params: GradeParams,
    /// Derived per-channel mappings (256 entries each).
    pub mappings: ChannelMappings,
    /// Graded preview path, if written.
    pub preview_path: Option<String>,
    /// LUT path, if written.
    pub lut_path: Option<String>,
    /// Mood sentence, when requested and available.
    pub mood: Option<String>,
}

impl RunReport {
    /// Write the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!("wrote report to {}", path.display());
        Ok(())
    }
}
