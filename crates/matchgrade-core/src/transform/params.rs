//! Parameters shared by the preview and export paths.
//!
//! `GradeParams` is the single request-level configuration: the preview
//! grader reads `intensity`, the LUT synthesizer reads all three fields.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grading::apply::check_intensity;
use crate::transform::lut::{DEFAULT_LUT_SIZE, check_lut_size};

/// Default `TITLE` written into exported `.cube` files.
pub const DEFAULT_LUT_TITLE: &str = "Matched Grade";

/// Blend strength and LUT export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeParams {
    /// Blend between source (0.0) and fully matched (1.0). Default: 1.0.
    pub intensity: f32,
    /// LUT grid resolution per axis. Default: 33.
    pub lut_size: u32,
    /// `TITLE` of the exported `.cube` document.
    pub lut_title: String,
}

impl Default for GradeParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            lut_size: DEFAULT_LUT_SIZE,
            lut_title: DEFAULT_LUT_TITLE.to_string(),
        }
    }
}

impl GradeParams {
    /// Set intensity from the UI's integer percentage. Values above 100 clamp.
    pub fn with_intensity_percent(mut self, percent: u8) -> Self {
        self.intensity = f32::from(percent.min(100)) / 100.0;
        self
    }

    /// Intensity as a 0-100 percentage, rounded.
    pub fn intensity_percent(&self) -> u8 {
        (self.intensity.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Check intensity and LUT size before any work starts.
    pub fn validate(&self) -> Result<()> {
        check_intensity(self.intensity)?;
        check_lut_size(self.lut_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    #[test]
    fn test_default_is_full_strength_33() {
        let params = GradeParams::default();
        assert_eq!(params.intensity, 1.0);
        assert_eq!(params.lut_size, 33);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_percent_conversion() {
        let params = GradeParams::default().with_intensity_percent(40);
        approx::assert_relative_eq!(params.intensity, 0.4);
        assert_eq!(params.intensity_percent(), 40);
        assert_eq!(GradeParams::default().with_intensity_percent(250).intensity, 1.0);
        assert_eq!(GradeParams::default().with_intensity_percent(0).intensity, 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_size = GradeParams {
            lut_size: 1,
            ..GradeParams::default()
        };
        assert!(matches!(bad_size.validate(), Err(MatchError::InvalidLutSize(1))));

        let huge = GradeParams {
            lut_size: 3_000_000,
            ..GradeParams::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(MatchError::InvalidLutSize(3_000_000))
        ));

        let bad_intensity = GradeParams {
            intensity: 1.01,
            ..GradeParams::default()
        };
        assert!(matches!(
            bad_intensity.validate(),
            Err(MatchError::InvalidIntensity(_))
        ));
    }
}
