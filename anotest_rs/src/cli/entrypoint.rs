//! Command handlers behind the `anot` binary.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::config::{ImageFormat, ReportOptions};
use crate::diagram::{D2Renderer, DiagramRenderer};
use crate::progress::{self, Spinner};
use crate::raster::{ConvertRasterizer, Rasterizer, encode_data_url, write_artifacts};
use crate::snippet::quote_file;

/// Install the stderr subscriber; `RUST_LOG` wins over `--log-level`.
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let options = ReportOptions::load(&cli.root);
    debug!(?options, "effective configuration");

    match cli.command {
        Command::Diagram {
            input,
            output,
            format,
            artifacts,
            svg,
        } => {
            let source = read_input(&input)?;
            let format = format.unwrap_or(options.image_format);
            let artifacts = artifacts.or(options.artifacts_dir.clone());
            let text = if svg {
                render_svg(&options, &source)?
            } else {
                let url = render_data_url(&options, &source, format, artifacts.as_deref())?;
                format!("\n\n![image]({})\n\n", url)
            };
            emit(output.as_deref(), &text)
        }
        Command::Snippet {
            file,
            from,
            to,
            lang,
        } => {
            if to <= from {
                bail!("--to ({}) must come after --from ({})", to, from);
            }
            let code = quote_file(&file, from, to)
                .with_context(|| format!("reading {}", file.display()))?;
            let lang = lang.unwrap_or(options.code_language);
            emit(None, &format!("```{}\n{}\n```\n", lang, code))
        }
        Command::Config => emit(None, &options.to_toml()?),
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading diagram from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("reading {}", input))
}

fn render_svg(options: &ReportOptions, source: &str) -> Result<String> {
    let spinner = Spinner::new("rendering diagram");
    match D2Renderer::new(options.diagram.clone()).render_svg(source) {
        Ok(svg) => {
            spinner.finish_success("diagram rendered");
            Ok(svg)
        }
        Err(e) => {
            spinner.finish_error("diagram failed");
            Err(e.into())
        }
    }
}

fn render_data_url(
    options: &ReportOptions,
    source: &str,
    format: ImageFormat,
    artifacts: Option<&Path>,
) -> Result<String> {
    let svg = render_svg(options, source)?;
    let (url, png) = match format {
        ImageFormat::Png => {
            let png = ConvertRasterizer::new(options.raster.clone())
                .rasterize(&svg)
                .context("converting SVG to PNG")?;
            (encode_data_url(format.mime(), &png), Some(png))
        }
        ImageFormat::Svg => (encode_data_url(format.mime(), svg.as_bytes()), None),
    };
    if let Some(dir) = artifacts {
        write_artifacts(dir, 1, &svg, png.as_deref(), &url)?;
        progress::success(&format!("artifacts written to {}", dir.display()));
    }
    Ok(url)
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            file.write_all(text.as_bytes())?;
            progress::success(&format!("appended to {}", path.display()));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
