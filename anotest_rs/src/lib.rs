//! # anotest
//!
//! **Annotated test reports** - tests that read like a story.
//!
//! A report session turns a test run into a Markdown document: chapters and
//! sub-chapters become headings, code samples are quoted straight from the
//! test source, their output is captured next to them, and diagrams written
//! in [D2](https://d2lang.com) are rendered and embedded inline. After the
//! story, a summary line and the per-chapter pass/fail history close the
//! document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anotest::{AnnotatedReport, ReportOptions};
//! use std::io::Write;
//!
//! let mut report = AnnotatedReport::create("target/story.md", ReportOptions::default())?;
//! let summary = report.story("showcase", |s| -> anotest::Result<()> {
//!     s.chapter("diagram", "how the parts talk", |s| -> anotest::Result<()> {
//!         s.diagram("client -> server: request")?;
//!         Ok(())
//!     })?;
//!     s.chapter("sample", "a quoted listing", |s| -> anotest::Result<()> {
//!         let mut out = s.start_capture("listing 1", "prints a greeting")?;
//!         writeln!(out, "hello world!")?;
//!         s.stop_capture()?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! assert_eq!(summary.failed, 0);
//! # Ok::<(), anotest::AnotestError>(())
//! ```
//!
//! ## External tools
//!
//! Diagrams go through the `d2` CLI and, for PNG embedding, ImageMagick's
//! `convert`. Both sit behind the [`DiagramRenderer`] and [`Rasterizer`]
//! traits, so tests (or other toolchains) can plug in their own.

// ============================================================================
// Core Modules
// ============================================================================

/// Chapter paths, outcomes, history and the run summary.
pub mod chapter;

/// Report options and the `.anotest/config.toml` loader.
pub mod config;

/// Diagram template and the `d2` adapter.
pub mod diagram;

/// Error type shared by every operation.
pub mod error;

/// Home expansion, report file creation, source path resolution.
pub mod fs_utils;

/// SVG to PNG conversion and `data:` URL encoding.
pub mod raster;

/// The report session and chapter scopes.
pub mod report;

/// Source line quoting, dedent and output capture.
pub mod snippet;

/// Markdown fragments.
pub mod writer;

// ============================================================================
// CLI Support
// ============================================================================

/// Terminal status lines and spinner used by the `anot` binary.
pub mod progress;

/// `anot` command implementations.
pub mod cli;

pub use chapter::{ChapterPath, HistoryEntry, IntoOutcome, Outcome, RunStats, Summary};
pub use config::{DiagramConfig, ImageFormat, RasterConfig, ReportOptions};
pub use diagram::{D2Renderer, DiagramRenderer};
pub use error::{AnotestError, Result};
pub use raster::{ConvertRasterizer, Rasterizer};
pub use report::{AnnotatedReport, Scope};
pub use snippet::{CaptureSink, SourceLocation};
pub use writer::{make_link, make_str_path};
