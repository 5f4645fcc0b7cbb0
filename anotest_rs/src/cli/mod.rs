//! `anot` command line: the report building blocks, usable from a shell.
//!
//! - `anot diagram` renders a D2 file and prints the Markdown image line
//! - `anot snippet` quotes a dedented line range as a fenced block
//! - `anot config` prints the effective configuration

pub mod entrypoint;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ImageFormat;

#[derive(Parser, Debug)]
#[command(name = "anot")]
#[command(about = "Annotated test report helpers: diagrams, snippets, config")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Project root holding `.anotest/config.toml`
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a D2 diagram and emit the inline Markdown image
    Diagram {
        /// Diagram source file, `-` for stdin
        input: String,
        /// Append the Markdown to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Embedding format (png needs ImageMagick `convert`)
        #[arg(long)]
        format: Option<ImageFormat>,
        /// Keep the svg/png/url intermediates in this directory
        #[arg(long)]
        artifacts: Option<PathBuf>,
        /// Print the raw SVG instead of Markdown
        #[arg(long)]
        svg: bool,
    },
    /// Print the lines strictly between --from and --to as a fenced block
    Snippet {
        file: PathBuf,
        /// Line of the opening marker (1-based)
        #[arg(long)]
        from: usize,
        /// Line of the closing marker (1-based)
        #[arg(long)]
        to: usize,
        /// Fence language tag (defaults to the configured one)
        #[arg(long)]
        lang: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}
