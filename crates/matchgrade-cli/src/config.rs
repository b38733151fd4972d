//! Grade parameter resolution for the CLI.
//!
//! Layers, lowest to highest priority:
//! 1. `GradeParams::default()`
//! 2. A JSON params file (`--params`)
//! 3. Environment (`MATCHGRADE_INTENSITY`, `MATCHGRADE_LUT_SIZE`)
//! 4. Command-line flags

use std::path::Path;

use anyhow::{Context, Result, bail};
use matchgrade_core::GradeParams;

/// Environment variable holding the intensity as a 0-100 percentage.
const ENV_INTENSITY: &str = "MATCHGRADE_INTENSITY";
/// Environment variable holding the LUT grid size.
const ENV_LUT_SIZE: &str = "MATCHGRADE_LUT_SIZE";

/// Values read from the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    /// Intensity percentage, 0-100.
    pub intensity_percent: Option<u8>,
    /// LUT grid resolution.
    pub lut_size: Option<u32>,
}

impl EnvConfig {
    /// Read the process environment.
    ///
    /// Unset variables are skipped. Set variables must parse, and the
    /// intensity must lie in 0-100 like the `--intensity` flag.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let intensity_percent = match lookup(ENV_INTENSITY) {
            Some(raw) => Some(parse_percent(&raw)?),
            None => None,
        };
        let lut_size = match lookup(ENV_LUT_SIZE) {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{ENV_LUT_SIZE}={raw:?} is not a grid size"))?,
            ),
            None => None,
        };
        Ok(Self {
            intensity_percent,
            lut_size,
        })
    }
}

fn parse_percent(raw: &str) -> Result<u8> {
    let percent: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("{ENV_INTENSITY}={raw:?} is not a percentage"))?;
    if percent > 100 {
        bail!("{ENV_INTENSITY}={percent} is outside 0-100");
    }
    Ok(percent as u8)
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// Intensity percentage, 0-100.
    pub intensity_percent: Option<u8>,
    /// LUT grid resolution.
    pub lut_size: Option<u32>,
    /// `.cube` title.
    pub title: Option<String>,
}

/// Load a params file. Missing fields take their defaults.
pub fn load_params_file(path: &Path) -> Result<GradeParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read params file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse params file {}", path.display()))
}

/// Merge all layers and validate the result.
pub fn resolve_params(
    params_file: Option<&Path>,
    env: &EnvConfig,
    cli: &CliOverrides,
) -> Result<GradeParams> {
    let mut params = match params_file {
        Some(path) => load_params_file(path)?,
        None => GradeParams::default(),
    };

    if let Some(percent) = cli.intensity_percent.or(env.intensity_percent) {
        params = params.with_intensity_percent(percent);
    }
    if let Some(size) = cli.lut_size.or(env.lut_size) {
        params.lut_size = size;
    }
    if let Some(title) = &cli.title {
        params.lut_title = title.clone();
    }

    params.validate().context("invalid grade parameters")?;
    tracing::debug!(?params, "resolved grade parameters");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_lookup_parses_set_values() {
        let env = EnvConfig::from_lookup(|key| match key {
            ENV_INTENSITY => Some(" 35 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(env.intensity_percent, Some(35));
        assert_eq!(env.lut_size, None);
    }

    #[test]
    fn test_env_rejects_out_of_range_intensity() {
        for raw in ["150", "101", "-5", "lots"] {
            let result = EnvConfig::from_lookup(|key| match key {
                ENV_INTENSITY => Some(raw.to_string()),
                _ => None,
            });
            assert!(result.is_err(), "{raw} should be rejected");
        }
        let env = EnvConfig::from_lookup(|key| (key == ENV_INTENSITY).then(|| "100".to_string()));
        assert_eq!(env.unwrap().intensity_percent, Some(100));
    }

    #[test]
    fn test_env_rejects_unparseable_lut_size() {
        let result = EnvConfig::from_lookup(|key| (key == ENV_LUT_SIZE).then(|| "big".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = EnvConfig {
            intensity_percent: Some(20),
            lut_size: Some(17),
        };
        let cli = CliOverrides {
            intensity_percent: Some(70),
            ..CliOverrides::default()
        };
        let params = resolve_params(None, &env, &cli).unwrap();
        assert!((params.intensity - 0.7).abs() < 1e-6);
        assert_eq!(params.lut_size, 17);
        assert_eq!(params.lut_title, "Matched Grade");
    }

    #[test]
    fn test_params_file_is_the_base_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "lut_size": 65, "lut_title": "Dusk" }"#).unwrap();

        let params =
            resolve_params(Some(&path), &EnvConfig::default(), &CliOverrides::default()).unwrap();
        assert_eq!(params.lut_size, 65);
        assert_eq!(params.lut_title, "Dusk");
        assert_eq!(params.intensity, 1.0);
    }

    #[test]
    fn test_invalid_lut_size_is_rejected() {
        let cli = CliOverrides {
            lut_size: Some(1),
            ..CliOverrides::default()
        };
        assert!(resolve_params(None, &EnvConfig::default(), &cli).is_err());
    }

    #[test]
    fn test_malformed_params_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "{ intensity: ").unwrap();
        assert!(load_params_file(&path).is_err());
    }
}
