//! Matchgrade Core: reference-based color grading engine.
//!
//! This crate contains histogram construction, cumulative distributions,
//! monotonic channel matching, intensity-blended grading, and 3D LUT
//! synthesis with `.cube` I/O. No codec, GPU, or UI dependencies: it reads
//! and writes plain RGBA8 buffers.

pub mod error;
pub mod grading;
pub mod image;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod transform;

// Re-exports for convenience.
pub use error::{MatchError, Result};
pub use grading::{
    ChannelMapping, ChannelMappings, MoodDescriber, MoodError, PaletteMoodDescriber,
};
pub use image::{Channel, PixelBuffer};
pub use pipeline::{ImageStats, derive_mappings, export_cube, grade, synthesize_lut};
pub use session::GradingSession;
pub use stats::{Cdf, Histogram};
pub use transform::lut::{DEFAULT_LUT_SIZE, LutGrid, MAX_LUT_SIZE};
pub use transform::params::GradeParams;
