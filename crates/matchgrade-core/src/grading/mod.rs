//! Grading stages: channel matching, intensity-blended application, and the
//! reference mood describer.

pub mod apply;
pub mod mapping;
pub mod mood;

pub use apply::apply_mappings;
pub use mapping::{ChannelMapping, ChannelMappings};
pub use mood::{MoodDescriber, MoodError, PaletteMoodDescriber};
