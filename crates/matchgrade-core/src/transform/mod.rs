//! Export side of the pipeline: grade parameters and 3D LUT synthesis.

pub mod lut;
pub mod params;
