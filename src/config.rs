use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::Scaler;

pub const ENV_SCALE: &str = "FIGURE_PREP_SCALE";
pub const ENV_SEQUENCE_OFFSET: &str = "FIGURE_PREP_SEQUENCE_OFFSET";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// RGB
    pub color: [u8; 3],
    pub stroke: u32,
}

impl StrokeStyle {
    pub const fn new(color: [u8; 3], stroke: u32) -> Self {
        Self { color, stroke }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview down-scale factor; also maps pointer positions back.
    pub scale_factor: f64,
    /// Directory created under the chosen root; never treated as input.
    pub output_dir: String,
    /// Annotated copies land in `<output_dir>/<bbox_dir>/<subdir>`.
    pub bbox_dir: String,
    pub cropped_prefix: String,
    pub extensions: Vec<String>,
    /// Added to the trailing number of each file stem when renumbering.
    pub sequence_offset: i64,
    pub sequence_width: usize,
    /// Index into the combined image list used to choose the crop region.
    pub reference_index: usize,
    /// Index into the first selected subdirectory used as bbox template.
    pub template_index: usize,
    pub bbox_style: StrokeStyle,
    pub preview_style: StrokeStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale_factor: 0.5,
            output_dir: "processed".to_string(),
            bbox_dir: "bbox".to_string(),
            cropped_prefix: "cropped_".to_string(),
            extensions: ["png", "jpg", "jpeg", "bmp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            sequence_offset: 70,
            sequence_width: 5,
            reference_index: 0,
            template_index: 0,
            bbox_style: StrokeStyle::new([255, 0, 0], 3),
            preview_style: StrokeStyle::new([0, 255, 0], 2),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `FIGURE_PREP_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var(ENV_SCALE) {
            self.scale_factor = parse_env(ENV_SCALE, &value)?;
        }
        if let Ok(value) = env::var(ENV_SEQUENCE_OFFSET) {
            self.sequence_offset = parse_env(ENV_SEQUENCE_OFFSET, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Scaler::new(self.scale_factor)?;

        if self.output_dir.trim().is_empty() || self.bbox_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "output_dir and bbox_dir must not be empty".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one image extension is required".to_string(),
            ));
        }
        if !(1..=20).contains(&self.sequence_width) {
            return Err(ConfigError::Invalid(format!(
                "sequence_width must be between 1 and 20, got {}",
                self.sequence_width
            )));
        }
        if self.bbox_style.stroke == 0 || self.preview_style.stroke == 0 {
            return Err(ConfigError::Invalid(
                "stroke widths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scaler(&self) -> Result<Scaler, ConfigError> {
        Scaler::new(self.scale_factor)
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scale_factor, 0.5);
        assert_eq!(config.sequence_offset, 70);
        assert_eq!(config.sequence_width, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("figure-prep.json");
        fs::write(&path, r#"{ "sequence_offset": 0, "extensions": ["PNG"] }"#).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.sequence_offset, 0);
        assert_eq!(config.output_dir, "processed");
        assert!(config.accepts_extension("png"));
        assert!(!config.accepts_extension("jpg"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ scale_factor: ").unwrap();

        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scale_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sequence_width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_value() {
        assert_eq!(parse_env::<i64>(ENV_SEQUENCE_OFFSET, " 12 ").unwrap(), 12);
        assert!(parse_env::<f64>(ENV_SCALE, "half").is_err());
    }
}
