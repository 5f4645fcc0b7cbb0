//! SVG to PNG conversion and inline image encoding.

use std::borrow::Cow;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::RasterConfig;
use crate::diagram::run_with_stdin;
use crate::error::{AnotestError, Result};

/// Turns SVG text into PNG bytes.
pub trait Rasterizer {
    fn rasterize(&self, svg: &str) -> Result<Vec<u8>>;
}

/// Rasterizer backed by ImageMagick's `convert`.
#[derive(Debug, Clone, Default)]
pub struct ConvertRasterizer {
    config: RasterConfig,
}

impl ConvertRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.config.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Rasterizer for ConvertRasterizer {
    fn rasterize(&self, svg: &str) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-density")
            .arg(self.config.density.to_string())
            .arg("/dev/stdin")
            .arg("png:-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = run_with_stdin(&mut cmd, &self.config.program, svg.as_bytes())?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(AnotestError::Rasterize {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::debug!("rasterized {} bytes of SVG into {} bytes of PNG", svg.len(), output.stdout.len());
        Ok(output.stdout)
    }
}

/// Percent-encode `bytes` into a `data:` URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let payload: Cow<'_, str> = urlencoding::encode_binary(bytes);
    format!("data:{},{}", mime, payload)
}

/// Write the intermediate files of diagram number `index` for debugging.
pub fn write_artifacts(dir: &Path, index: usize, svg: &str, png: Option<&[u8]>, url: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(format!("diagram-{}.svg", index)), svg)?;
    if let Some(png) = png {
        std::fs::write(dir.join(format!("diagram-{}.png", index)), png)?;
    }
    std::fs::write(dir.join(format!("diagram-{}.url", index)), url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_url_is_percent_encoded() {
        let url = encode_data_url("image/png", &[0x89, b'P', b'N', b'G', b' ', b'/']);
        assert_eq!(url, "data:image/png,%89PNG%20%2F");
    }

    #[test]
    fn svg_data_url_keeps_unreserved_chars() {
        let url = encode_data_url("image/svg+xml", b"<svg a-b_c.d~e/>");
        assert!(url.starts_with("data:image/svg+xml,%3Csvg%20a-b_c.d~e%2F%3E"));
    }

    #[test]
    fn artifacts_land_in_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("artifacts");
        write_artifacts(&dir, 3, "<svg/>", Some(&[1, 2, 3]), "data:image/png,%01").unwrap();

        assert_eq!(std::fs::read_to_string(dir.join("diagram-3.svg")).unwrap(), "<svg/>");
        assert_eq!(std::fs::read(dir.join("diagram-3.png")).unwrap(), vec![1, 2, 3]);
        assert!(dir.join("diagram-3.url").exists());
    }

    #[test]
    fn svg_only_artifacts_skip_png() {
        let temp = TempDir::new().unwrap();
        write_artifacts(temp.path(), 1, "<svg/>", None, "data:image/svg+xml,").unwrap();
        assert!(!temp.path().join("diagram-1.png").exists());
    }

    #[test]
    fn missing_converter_is_a_spawn_error() {
        let raster = ConvertRasterizer::new(RasterConfig {
            program: "anotest-no-such-convert".into(),
            density: 50,
        });
        assert!(matches!(
            raster.rasterize("<svg/>").unwrap_err(),
            AnotestError::ToolSpawn { .. }
        ));
    }

    #[test]
    fn rasterizes_when_convert_is_installed() {
        let raster = ConvertRasterizer::default();
        if !raster.is_available() {
            eprintln!("convert not on PATH, skipping");
            return;
        }
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="red"/></svg>"#;
        let Ok(png) = raster.rasterize(svg) else {
            // some ImageMagick policies forbid /dev/stdin; nothing to assert then
            return;
        };
        assert_eq!(&png[1..4], b"PNG");
    }
}
