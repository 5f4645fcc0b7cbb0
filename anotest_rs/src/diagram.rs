//! Diagram rendering through the `d2` toolchain.
//!
//! Every diagram is wrapped in a fixed preamble (layout engine, sketch mode,
//! direction) before it reaches the compiler, so report authors only write
//! the shapes and connections.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::DiagramConfig;
use crate::error::{AnotestError, Result};

/// Turns diagram source into SVG text.
pub trait DiagramRenderer {
    fn render_svg(&self, source: &str) -> Result<String>;
}

/// Wrap caller source in the fixed diagram template.
pub fn wrap_source(source: &str, config: &DiagramConfig) -> String {
    format!(
        "vars: {{\n  d2-config: {{\n    layout-engine: {layout}\n    sketch: {sketch}\n  }}\n}}\n\ndirection: {direction}\n\n{source}\n",
        layout = config.layout_engine,
        sketch = config.sketch,
        direction = config.direction,
        source = source,
    )
}

/// Renderer backed by the `d2` command line tool.
#[derive(Debug, Clone, Default)]
pub struct D2Renderer {
    config: DiagramConfig,
}

impl D2Renderer {
    pub fn new(config: DiagramConfig) -> Self {
        Self { config }
    }

    /// True when the configured program can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl DiagramRenderer for D2Renderer {
    fn render_svg(&self, source: &str) -> Result<String> {
        let script = wrap_source(source, &self.config);
        tracing::debug!(program = %self.config.program, "rendering diagram:\n{}", script);

        let mut cmd = Command::new(&self.config.program);
        if self.config.sketch {
            cmd.arg("--sketch");
        }
        cmd.arg("--pad")
            .arg(self.config.pad.to_string())
            .arg("-")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = run_with_stdin(&mut cmd, &self.config.program, script.as_bytes())?;
        if !output.status.success() {
            return Err(AnotestError::DiagramCompile {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let svg = String::from_utf8(output.stdout)
            .map_err(|e| AnotestError::DiagramRender(format!("SVG is not UTF-8: {}", e)))?;
        if !svg.contains("<svg") {
            return Err(AnotestError::DiagramRender(
                "renderer produced no <svg> document".to_string(),
            ));
        }
        Ok(svg)
    }
}

/// Spawn `cmd`, feed `input` on stdin and collect its output.
pub(crate) fn run_with_stdin(
    cmd: &mut Command,
    program: &str,
    input: &[u8],
) -> Result<std::process::Output> {
    let mut child = cmd.spawn().map_err(|source| AnotestError::ToolSpawn {
        program: program.to_string(),
        source,
    })?;
    if let Some(mut stdin) = child.stdin.take() {
        // A tool that exits early closes its stdin; the exit status tells the story.
        if let Err(e) = stdin.write_all(input) {
            tracing::debug!("{} closed stdin early: {}", program, e);
        }
    }
    Ok(child.wait_with_output()?)
}
