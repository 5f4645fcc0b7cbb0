//! The report session and the chapter scopes handed to test bodies.
//!
//! ```rust,no_run
//! use anotest::{AnnotatedReport, ReportOptions};
//!
//! let mut report = AnnotatedReport::create("~/notes/demo.md", ReportOptions::default().with_duration())?;
//! report.story("showcase", |s| -> anotest::Result<()> {
//!     s.chapter("intro", "what this is about", |s| -> anotest::Result<()> {
//!         s.comment("plain paragraph")?.br()?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! # Ok::<(), anotest::AnotestError>(())
//! ```

use std::any::Any;
use std::fs::File;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::chapter::{ChapterPath, IntoOutcome, Outcome, RunStats, Summary};
use crate::config::{ImageFormat, ReportOptions};
use crate::diagram::{D2Renderer, DiagramRenderer};
use crate::error::{AnotestError, Result};
use crate::fs_utils::{expand_home, open_report, resolve_source, short_path};
use crate::raster::{ConvertRasterizer, Rasterizer, encode_data_url, write_artifacts};
use crate::snippet::{CaptureSink, OutputCapture, SourceLocation, dedent, quote_file};
use crate::writer::{MarkdownWriter, make_link, make_str_path};

/// Code sample between a start call and its stop call.
struct ActiveCode {
    name: String,
    comment: String,
    start: SourceLocation,
    output: Option<OutputCapture>,
}

/// One report run: output file, options, adapters and bookkeeping.
///
/// Counters and history accumulate over every story told by the same report.
pub struct AnnotatedReport<W: Write = File> {
    writer: MarkdownWriter<W>,
    options: ReportOptions,
    stats: RunStats,
    renderer: Box<dyn DiagramRenderer>,
    rasterizer: Box<dyn Rasterizer>,
    code: Option<ActiveCode>,
    diagrams: usize,
    cwd: PathBuf,
}

impl AnnotatedReport<File> {
    /// Create the report file at `path` (`~/` expands to the home directory).
    pub fn create(path: &str, options: ReportOptions) -> Result<Self> {
        let path = expand_home(path)?;
        let file = open_report(&path)?;
        debug!("writing report to {}", path.display());
        Ok(Self::new(file, options))
    }
}

impl<W: Write> AnnotatedReport<W> {
    /// Report over any writer, with the default `d2`/`convert` adapters.
    pub fn new(out: W, options: ReportOptions) -> Self {
        let renderer = Box::new(D2Renderer::new(options.diagram.clone()));
        let rasterizer = Box::new(ConvertRasterizer::new(options.raster.clone()));
        Self {
            writer: MarkdownWriter::new(out),
            options,
            stats: RunStats::default(),
            renderer,
            rasterizer,
            code: None,
            diagrams: 0,
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }

    pub fn with_renderer(mut self, renderer: impl DiagramRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    /// Directory used to resolve and shorten quoted source paths.
    pub fn with_source_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = dir.into();
        self
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Flush and hand back the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer.into_inner())
    }

    /// Scope at the top of the chapter tree.
    pub fn scope(&mut self) -> Scope<'_, W> {
        Scope {
            report: self,
            path: ChapterPath::root(),
        }
    }

    /// Top-level heading, the body, then the summary line and the history.
    pub fn story<R, F>(&mut self, title: &str, body: F) -> Result<Summary>
    where
        F: FnOnce(&mut Scope<'_, W>) -> R,
        R: IntoOutcome,
    {
        self.writer.story_heading(title)?;

        let fails_before = self.stats.fails();
        let started = Instant::now();
        let outcome = {
            let mut scope = self.scope();
            run_isolated(title, || body(&mut scope))
        };
        let elapsed = started.elapsed();
        self.abandon_code("story");

        let outcome = if self.stats.fails() > fails_before {
            Outcome::Failed
        } else {
            outcome
        };
        let summary = self.stats.summary(outcome, elapsed);

        self.writer.raw(&format!("{}\n\n", summary.headline()))?;
        for entry in self.stats.history() {
            self.writer.raw(&entry.render(self.options.show_duration))?;
        }
        self.writer.flush()?;

        if outcome.is_pass() {
            info!("Congratulations!!! story '{}' passed", title);
        } else {
            warn!(
                "story '{}' failed: {} of {} chapters failed",
                title, summary.failed, summary.total
            );
        }
        Ok(summary)
    }

    fn render_diagram(&mut self, source: &str) -> Result<String> {
        let svg = self.renderer.render_svg(source)?;
        self.diagrams += 1;

        let format = self.options.image_format;
        let (url, png) = match format {
            ImageFormat::Png => {
                let png = self.rasterizer.rasterize(&svg)?;
                (encode_data_url(format.mime(), &png), Some(png))
            }
            ImageFormat::Svg => (encode_data_url(format.mime(), svg.as_bytes()), None),
        };

        if let Some(dir) = &self.options.artifacts_dir {
            write_artifacts(dir, self.diagrams, &svg, png.as_deref(), &url)?;
        }
        Ok(url)
    }

    fn begin_code(
        &mut self,
        name: &str,
        comment: &str,
        start: SourceLocation,
        output: Option<OutputCapture>,
    ) -> Result<()> {
        if let Some(active) = &self.code {
            return Err(AnotestError::CaptureAlreadyActive(active.name.clone()));
        }
        debug!(name, file = %start.file.display(), line = start.line, "code sample started");
        self.code = Some(ActiveCode {
            name: name.to_string(),
            comment: comment.to_string(),
            start,
            output,
        });
        Ok(())
    }

    fn end_code(&mut self, comment: Option<&str>, stop: SourceLocation, write_output: bool) -> Result<()> {
        let active = self.code.take().ok_or(AnotestError::NoActiveCapture)?;
        if stop.file != active.start.file {
            warn!(
                "code sample '{}' started in {} but stopped in {}",
                active.name,
                active.start.file.display(),
                stop.file.display()
            );
        }

        let captured = active
            .output
            .and_then(|capture| capture.finish(self.options.capture_timeout()));

        let path = resolve_source(&active.start.file, &self.cwd).ok_or_else(|| {
            AnotestError::SourceRead {
                path: active.start.file.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "source file not found"),
            }
        })?;
        let code = quote_file(&path, active.start.line, stop.line).map_err(|source| {
            AnotestError::SourceRead {
                path: path.clone(),
                source,
            }
        })?;

        let link = format!(
            "[[{}]]: [{} - {}]",
            short_path(&path, &self.cwd),
            active.start.line,
            stop.line
        );
        let text = comment.unwrap_or(&active.comment);
        self.writer.code_header(&active.name, Some(&link), text)?;
        self.writer.code_block(&self.options.code_language, &code)?;

        if let Some(output) = captured.filter(|text| write_output && !text.is_empty()) {
            self.writer.captured_output(&output)?;
        }
        Ok(())
    }

    /// Drop a sample left open by a body that bailed out early.
    fn abandon_code(&mut self, at: &str) {
        if let Some(active) = self.code.take() {
            warn!("code sample '{}' was never stopped ({} ended)", active.name, at);
            if let Some(capture) = active.output {
                capture.finish(std::time::Duration::ZERO);
            }
        }
    }
}

/// Where a test body writes: the report plus its own chapter path.
pub struct Scope<'a, W: Write> {
    report: &'a mut AnnotatedReport<W>,
    path: ChapterPath,
}

impl<W: Write> Scope<'_, W> {
    pub fn path(&self) -> &ChapterPath {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn options(&self) -> &ReportOptions {
        &self.report.options
    }

    pub fn stats(&self) -> &RunStats {
        &self.report.stats
    }

    /// Run `body` as a nested chapter with its heading one level below this scope.
    ///
    /// A chapter fails when its body panics, returns `Err`/`false`, or when
    /// one of its own nested chapters failed.
    pub fn chapter<R, F>(&mut self, name: &str, title: &str, body: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Scope<'_, W>) -> R,
        R: IntoOutcome,
    {
        let path = self.path.child(name);
        // Counted only once the heading is out, so every counted chapter finishes.
        self.report.writer.chapter_heading(path.depth(), name, title)?;
        self.report.stats.enter();

        let span = tracing::info_span!("chapter", path = %path);
        let _entered = span.enter();

        let fails_before = self.report.stats.fails();
        let started = Instant::now();
        let outcome = {
            let mut child = Scope {
                report: &mut *self.report,
                path: path.clone(),
            };
            run_isolated(name, || body(&mut child))
        };
        let elapsed = started.elapsed();

        let outcome = if self.report.stats.fails() > fails_before {
            Outcome::Failed
        } else {
            outcome
        };
        if !outcome.is_pass() {
            self.report.abandon_code(name);
        }

        debug!(%path, %outcome, ?elapsed, "chapter finished");
        self.report.stats.finish(path, outcome, elapsed);
        Ok(outcome)
    }

    pub fn comment(&mut self, text: &str) -> Result<&mut Self> {
        self.report.writer.comment(text)?;
        Ok(self)
    }

    pub fn br(&mut self) -> Result<&mut Self> {
        self.report.writer.br()?;
        Ok(self)
    }

    pub fn heading(&mut self, text: &str) -> Result<&mut Self> {
        self.report.writer.heading(self.path.depth() + 2, text)?;
        Ok(self)
    }

    /// Inline link markup to an anchor in the report.
    pub fn link(&self, title: &str, anchor: &str) -> String {
        make_link(title, anchor)
    }

    /// Anchor form of a displayed chapter path.
    pub fn str_path(&self, path: &str) -> String {
        make_str_path(path)
    }

    /// Render `source` and embed the image inline.
    pub fn diagram(&mut self, source: &str) -> Result<&mut Self> {
        let url = self.report.render_diagram(source)?;
        self.report.writer.image("image", &url)?;
        Ok(self)
    }

    /// Render `source` to SVG text without touching the report.
    pub fn diagram_svg(&self, source: &str) -> Result<String> {
        self.report.renderer.render_svg(source)
    }

    /// Start quoting the lines that follow this call.
    #[track_caller]
    pub fn start_code(&mut self, name: &str, comment: &str) -> Result<&mut Self> {
        let start = SourceLocation::caller();
        self.report.begin_code(name, comment, start, None)?;
        Ok(self)
    }

    /// Quote the lines since `start_code` (or `start_capture`, dropping its output).
    #[track_caller]
    pub fn stop_code(&mut self) -> Result<&mut Self> {
        let stop = SourceLocation::caller();
        self.report.end_code(None, stop, false)?;
        Ok(self)
    }

    #[track_caller]
    pub fn stop_code_with(&mut self, comment: &str) -> Result<&mut Self> {
        let stop = SourceLocation::caller();
        self.report.end_code(Some(comment), stop, false)?;
        Ok(self)
    }

    /// Like `start_code`, and returns the sink whose output is quoted too.
    #[track_caller]
    pub fn start_capture(&mut self, name: &str, comment: &str) -> Result<CaptureSink> {
        let start = SourceLocation::caller();
        if let Some(active) = &self.report.code {
            return Err(AnotestError::CaptureAlreadyActive(active.name.clone()));
        }
        let (capture, sink) = OutputCapture::start();
        self.report.begin_code(name, comment, start, Some(capture))?;
        Ok(sink)
    }

    #[track_caller]
    pub fn stop_capture(&mut self) -> Result<&mut Self> {
        let stop = SourceLocation::caller();
        self.report.end_code(None, stop, true)?;
        Ok(self)
    }

    #[track_caller]
    pub fn stop_capture_with(&mut self, comment: &str) -> Result<&mut Self> {
        let stop = SourceLocation::caller();
        self.report.end_code(Some(comment), stop, true)?;
        Ok(self)
    }

    /// Quote caller-supplied code; no source file is involved.
    pub fn snippet(&mut self, name: &str, comment: &str, code: &str) -> Result<&mut Self> {
        let lines: Vec<&str> = code.lines().collect();
        let body = dedent(&lines);
        self.report.writer.code_header(name, None, comment)?;
        self.report
            .writer
            .code_block(&self.report.options.code_language, &body)?;
        Ok(self)
    }

    /// Quote lines strictly between `start` and `stop` of `file`.
    pub fn quote_lines(
        &mut self,
        name: &str,
        comment: &str,
        start: SourceLocation,
        stop: usize,
    ) -> Result<&mut Self> {
        let stop = SourceLocation::new(start.file.clone(), stop);
        self.report.begin_code(name, comment, start, None)?;
        self.report.end_code(None, stop, false)?;
        Ok(self)
    }
}

/// Run a body the way a sub-test runs: a panic fails it, nothing more.
fn run_isolated<R: IntoOutcome>(name: &str, body: impl FnOnce() -> R) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result.into_outcome(),
        Err(payload) => {
            error!("'{}' panicked: {}", name, panic_message(payload.as_ref()));
            Outcome::Failed
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
