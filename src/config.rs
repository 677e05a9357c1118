// src/config.rs - Tunable parameters for boundary extraction
//
// Every threshold below was tuned empirically on scanned plans and should be
// recalibrated against a real test corpus before being treated as optimal.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{BoundaryError, Result};

/// Smallest polygon the extractor will ever return
pub const MIN_POLYGON_POINTS: usize = 4;

/// Largest polygon the extractor will ever return
pub const MAX_POLYGON_POINTS: usize = 20;

/// Configuration for floor plan boundary extraction
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default)]
    pub write_debug_images: bool,

    // Contrast enhancement (tiled histogram equalization)
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f64,

    #[serde(default = "default_clahe_tile_grid")]
    pub clahe_tile_grid: u32,

    // Adaptive threshold strategy
    #[serde(default = "default_adaptive_block_size")]
    pub adaptive_block_size: u32,

    #[serde(default = "default_adaptive_offset")]
    pub adaptive_offset: i32,

    // Edge-based strategy
    #[serde(default = "default_blur_kernel_size")]
    pub blur_kernel_size: u32,

    #[serde(default = "default_canny_low_threshold")]
    pub canny_low_threshold: f32,

    #[serde(default = "default_canny_high_threshold")]
    pub canny_high_threshold: f32,

    // Multi-level threshold strategy
    #[serde(default = "default_multi_level_thresholds")]
    pub multi_level_thresholds: Vec<u8>,

    /// Side length of the square structuring element shared by all strategies
    #[serde(default = "default_morph_kernel_size")]
    pub morph_kernel_size: u32,

    // Candidate filtering
    #[serde(default = "default_min_area_ratio")]
    pub min_area_ratio: f64,

    #[serde(default = "default_max_area_ratio")]
    pub max_area_ratio: f64,

    #[serde(default = "default_min_solidity")]
    pub min_solidity: f64,

    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f64,

    // Polygon simplification
    #[serde(default = "default_simplify_epsilon_ratio")]
    pub simplify_epsilon_ratio: f64,

    #[serde(default = "default_resample_target_points")]
    pub resample_target_points: usize,

    #[serde(default = "default_capped_target_points")]
    pub capped_target_points: usize,

    // Fallback rectangle inset: margins are width / divisor and height / divisor
    #[serde(default = "default_fallback_margin_divisor")]
    pub fallback_margin_divisor: f64,
}

fn default_input_path() -> String {
    "./input".to_string()
}

fn default_output_base_dir() -> String {
    "./output".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_clahe_clip_limit() -> f64 {
    2.0
}

fn default_clahe_tile_grid() -> u32 {
    8
}

fn default_adaptive_block_size() -> u32 {
    15
}

fn default_adaptive_offset() -> i32 {
    8
}

fn default_blur_kernel_size() -> u32 {
    3
}

fn default_canny_low_threshold() -> f32 {
    30.0
}

fn default_canny_high_threshold() -> f32 {
    100.0
}

fn default_multi_level_thresholds() -> Vec<u8> {
    vec![100, 150, 200]
}

fn default_morph_kernel_size() -> u32 {
    3
}

fn default_min_area_ratio() -> f64 {
    0.01
}

fn default_max_area_ratio() -> f64 {
    0.85 // anything larger is usually the page border
}

fn default_min_solidity() -> f64 {
    0.2
}

fn default_max_aspect_ratio() -> f64 {
    10.0
}

fn default_simplify_epsilon_ratio() -> f64 {
    0.012
}

fn default_resample_target_points() -> usize {
    8
}

fn default_capped_target_points() -> usize {
    15
}

fn default_fallback_margin_divisor() -> f64 {
    8.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            write_debug_images: false,
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_tile_grid: default_clahe_tile_grid(),
            adaptive_block_size: default_adaptive_block_size(),
            adaptive_offset: default_adaptive_offset(),
            blur_kernel_size: default_blur_kernel_size(),
            canny_low_threshold: default_canny_low_threshold(),
            canny_high_threshold: default_canny_high_threshold(),
            multi_level_thresholds: default_multi_level_thresholds(),
            morph_kernel_size: default_morph_kernel_size(),
            min_area_ratio: default_min_area_ratio(),
            max_area_ratio: default_max_area_ratio(),
            min_solidity: default_min_solidity(),
            max_aspect_ratio: default_max_aspect_ratio(),
            simplify_epsilon_ratio: default_simplify_epsilon_ratio(),
            resample_target_points: default_resample_target_points(),
            capped_target_points: default_capped_target_points(),
            fallback_margin_divisor: default_fallback_margin_divisor(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BoundaryError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| BoundaryError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Load configuration from a TOML file, or fall back to defaults when it does not exist
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::info!("Config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the numeric parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.clahe_clip_limit > 0.0) {
            return Err(BoundaryError::Config(
                "clahe_clip_limit must be > 0.0".to_string(),
            ));
        }

        if self.clahe_tile_grid == 0 {
            return Err(BoundaryError::Config(
                "clahe_tile_grid must be > 0".to_string(),
            ));
        }

        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(BoundaryError::Config(
                "adaptive_block_size must be an odd number >= 3".to_string(),
            ));
        }

        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(BoundaryError::Config(
                "blur_kernel_size must be an odd number > 0".to_string(),
            ));
        }

        if self.canny_low_threshold < 0.0 || self.canny_low_threshold > self.canny_high_threshold {
            return Err(BoundaryError::Config(
                "canny thresholds must satisfy 0.0 <= low <= high".to_string(),
            ));
        }

        if self.multi_level_thresholds.is_empty() {
            return Err(BoundaryError::Config(
                "multi_level_thresholds must not be empty".to_string(),
            ));
        }

        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 || self.morph_kernel_size > 511 {
            return Err(BoundaryError::Config(
                "morph_kernel_size must be an odd number between 1 and 511".to_string(),
            ));
        }

        if self.min_area_ratio < 0.0 || self.min_area_ratio > self.max_area_ratio || self.max_area_ratio > 1.0 {
            return Err(BoundaryError::Config(
                "area ratios must satisfy 0.0 <= min_area_ratio <= max_area_ratio <= 1.0".to_string(),
            ));
        }

        if self.min_solidity < 0.0 || self.min_solidity > 1.0 {
            return Err(BoundaryError::Config(
                "min_solidity must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.max_aspect_ratio < 1.0 {
            return Err(BoundaryError::Config(
                "max_aspect_ratio must be >= 1.0".to_string(),
            ));
        }

        if !(self.simplify_epsilon_ratio > 0.0) {
            return Err(BoundaryError::Config(
                "simplify_epsilon_ratio must be > 0.0".to_string(),
            ));
        }

        if self.resample_target_points < MIN_POLYGON_POINTS || self.resample_target_points > MAX_POLYGON_POINTS {
            return Err(BoundaryError::Config(format!(
                "resample_target_points must be between {} and {}",
                MIN_POLYGON_POINTS, MAX_POLYGON_POINTS
            )));
        }

        if self.capped_target_points < MIN_POLYGON_POINTS || self.capped_target_points > MAX_POLYGON_POINTS {
            return Err(BoundaryError::Config(format!(
                "capped_target_points must be between {} and {}",
                MIN_POLYGON_POINTS, MAX_POLYGON_POINTS
            )));
        }

        // Margins of width/2 or more would collapse the rectangle
        if !(self.fallback_margin_divisor > 2.0) {
            return Err(BoundaryError::Config(
                "fallback_margin_divisor must be > 2.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BoundaryError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("adaptive_block_size = 21\nmin_solidity = 0.3\n").unwrap();
        assert_eq!(config.adaptive_block_size, 21);
        assert_eq!(config.min_solidity, 0.3);
        assert_eq!(config.canny_high_threshold, 100.0);
        assert_eq!(config.multi_level_thresholds, vec![100, 150, 200]);
    }

    #[test]
    fn test_even_block_size_rejected() {
        let config = Config { adaptive_block_size: 14, ..Config::default() };
        assert!(matches!(config.validate(), Err(BoundaryError::Config(_))));
    }

    #[test]
    fn test_inverted_area_ratios_rejected() {
        let config = Config { min_area_ratio: 0.9, max_area_ratio: 0.5, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capped_points_above_polygon_limit_rejected() {
        let config = Config { capped_target_points: 21, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config { canny_low_threshold: 42.0, ..Config::default() };
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "min_area_ratio = \"lots\"").unwrap();

        match Config::from_file(&path) {
            Err(BoundaryError::ConfigLoad { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigLoad error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
