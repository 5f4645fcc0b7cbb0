//! Configuration for report sessions.
//!
//! Options are built in code with the `with_*` builder methods, or loaded from
//! an optional `.anotest/config.toml` in the project root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AnotestError, Result};

/// How rendered diagrams are embedded in the report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Rasterize the SVG to PNG through the external converter
    #[default]
    Png,
    /// Embed the SVG as is
    Svg,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(format!("unknown image format '{}' (expected png or svg)", other)),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Append chapter durations to history lines
    pub show_duration: bool,
    /// How long `stop_capture` waits for captured output
    pub capture_timeout_ms: u64,
    /// Language tag of quoted code fences
    pub code_language: String,
    /// Embedding format of rendered diagrams
    pub image_format: ImageFormat,
    /// Directory receiving intermediate diagram artifacts (svg/png/url)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    pub diagram: DiagramConfig,
    pub raster: RasterConfig,
}

/// Settings of the diagram template and the `d2` invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub program: String,
    pub layout_engine: String,
    pub sketch: bool,
    pub direction: String,
    pub pad: u32,
}

/// Settings of the SVG to PNG converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub program: String,
    pub density: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_duration: false,
            capture_timeout_ms: 3_000,
            code_language: "rust".to_string(),
            image_format: ImageFormat::default(),
            artifacts_dir: None,
            diagram: DiagramConfig::default(),
            raster: RasterConfig::default(),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            program: "d2".to_string(),
            layout_engine: "elk".to_string(),
            sketch: true,
            direction: "right".to_string(),
            pad: 100,
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            program: "convert".to_string(),
            density: 50,
        }
    }
}

impl ReportOptions {
    /// Load config from `.anotest/config.toml` in the given root directory.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".anotest").join("config.toml");
        match Self::load_from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| AnotestError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| AnotestError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AnotestError::Config {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })
    }

    pub fn with_duration(mut self) -> Self {
        self.show_duration = true;
        self
    }

    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.code_language = language.into();
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ReportOptions::default();
        assert!(!config.show_duration);
        assert_eq!(config.capture_timeout(), Duration::from_secs(3));
        assert_eq!(config.code_language, "rust");
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.diagram.layout_engine, "elk");
        assert!(config.diagram.sketch);
        assert_eq!(config.diagram.direction, "right");
        assert_eq!(config.raster.density, 50);
    }

    #[test]
    fn test_builder_options() {
        let config = ReportOptions::default()
            .with_duration()
            .with_capture_timeout(Duration::from_millis(250))
            .with_language("go")
            .with_image_format(ImageFormat::Svg)
            .with_artifacts_dir("/tmp/anotest");
        assert!(config.show_duration);
        assert_eq!(config.capture_timeout_ms, 250);
        assert_eq!(config.code_language, "go");
        assert_eq!(config.image_format, ImageFormat::Svg);
        assert_eq!(config.artifacts_dir, Some(PathBuf::from("/tmp/anotest")));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().expect("temp dir");
        let config = ReportOptions::load(temp.path());
        assert_eq!(config, ReportOptions::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join(".anotest");
        std::fs::create_dir_all(&dir).expect("create .anotest");

        let mut file = std::fs::File::create(dir.join("config.toml")).expect("create config");
        writeln!(
            file,
            r#"
show_duration = true
image_format = "svg"

[diagram]
layout_engine = "dagre"
sketch = false

[raster]
density = 96
"#
        )
        .expect("write config");

        let config = ReportOptions::load(temp.path());
        assert!(config.show_duration);
        assert_eq!(config.image_format, ImageFormat::Svg);
        assert_eq!(config.diagram.layout_engine, "dagre");
        assert!(!config.diagram.sketch);
        // untouched keys keep their defaults
        assert_eq!(config.diagram.direction, "right");
        assert_eq!(config.raster.program, "convert");
        assert_eq!(config.raster.density, 96);
    }

    #[test]
    fn test_invalid_config_is_an_error_but_load_falls_back() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join(".anotest");
        std::fs::create_dir_all(&dir).expect("create .anotest");
        std::fs::write(dir.join("config.toml"), "show_duration = \"maybe\"").expect("write");

        let err = ReportOptions::load_from_path(&dir.join("config.toml")).unwrap_err();
        assert!(matches!(err, AnotestError::Config { .. }));
        assert_eq!(ReportOptions::load(temp.path()), ReportOptions::default());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = ReportOptions::default().to_toml().expect("serialize");
        assert!(text.contains("capture_timeout_ms = 3000"));
        let parsed: ReportOptions = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, ReportOptions::default());
    }

    #[test]
    fn test_image_format_from_str() {
        assert_eq!("PNG".parse::<ImageFormat>(), Ok(ImageFormat::Png));
        assert_eq!("svg".parse::<ImageFormat>(), Ok(ImageFormat::Svg));
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
