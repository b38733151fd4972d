//! Error type shared by every stage of the matching engine.

/// Errors produced while building statistics, grading, or exporting LUTs.
///
/// Every variant is terminal for the request that raised it. The engine never
/// falls back to an identity mapping or identity LUT in place of an error.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Pixel data is malformed (wrong length or channel count).
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),
    /// The image holds no pixels, so its distribution is undefined.
    #[error("image has no pixels; cumulative distribution is undefined")]
    EmptyImage,
    /// LUT grid resolution outside `2..=256`.
    #[error("invalid LUT size {0}: grid resolution must be within 2..=256")]
    InvalidLutSize(u32),
    /// Blend factor outside `[0, 1]` or not a number.
    #[error("invalid intensity {0}: must be within [0, 1]")]
    InvalidIntensity(f32),
    /// A session was asked to grade before both images were loaded.
    #[error("no {0} image loaded")]
    MissingImage(&'static str),
    /// The image-decode collaborator could not produce a pixel buffer.
    #[error("failed to decode image: {0}")]
    DecodeFailure(String),
    /// Malformed `.cube` text.
    #[error("malformed .cube data: {0}")]
    CubeParse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MatchError>;
