//! Error type shared by every report operation.

use std::path::PathBuf;

/// Errors produced while building a report.
#[derive(Debug, thiserror::Error)]
pub enum AnotestError {
    /// The `~/` prefix could not be expanded
    #[error("cannot resolve home directory for {0}")]
    HomeDir(String),

    /// The report file could not be created
    #[error("open report {path}: {source}")]
    OpenReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the report (or a pipe) failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external tool could not be started
    #[error("failed to spawn {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The diagram compiler rejected the source
    #[error("diagram compile failed ({status}): {stderr}")]
    DiagramCompile { status: String, stderr: String },

    /// The diagram compiler succeeded but produced no SVG
    #[error("diagram render failed: {0}")]
    DiagramRender(String),

    /// The raster converter failed
    #[error("rasterize failed ({status}): {stderr}")]
    Rasterize { status: String, stderr: String },

    /// The source file quoted by a code block could not be read
    #[error("read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `start_code`/`start_capture` called while another capture is open
    #[error("code capture '{0}' is still active")]
    CaptureAlreadyActive(String),

    /// `stop_code`/`stop_capture` called without a matching start
    #[error("no active code capture")]
    NoActiveCapture,

    /// Invalid configuration file
    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AnotestError>;
