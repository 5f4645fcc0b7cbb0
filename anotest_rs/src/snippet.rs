//! Quoting source lines and capturing the output of code samples.
//!
//! A code sample is the range of lines strictly between a start call and a
//! stop call in the same file. The quoted text is dedented so the fence shows
//! the code at its own indentation, not the test's.

use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// File and line of a start/stop call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the (tracked) caller.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line() as usize)
    }
}

/// Lines strictly between the 1-based lines `start` and `stop`.
///
/// Out-of-range bounds are clamped; an empty or inverted range yields nothing.
pub fn extract_lines(source: &str, start: usize, stop: usize) -> Vec<&str> {
    let lines: Vec<&str> = source.split('\n').collect();
    let from = start.min(lines.len());
    let to = stop.saturating_sub(1).min(lines.len());
    if from >= to {
        return Vec::new();
    }
    lines[from..to].to_vec()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Strip the common leading whitespace of non-blank lines; blank lines become empty.
///
/// Input with no non-blank line yields a single empty body.
pub fn dedent<S: AsRef<str>>(lines: &[S]) -> String {
    let min_indent = lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !line.trim_start_matches([' ', '\t']).is_empty())
        .map(indent_of)
        .min();

    let Some(min_indent) = min_indent else {
        return String::new();
    };

    lines
        .iter()
        .map(AsRef::as_ref)
        .map(|line| {
            if line.trim_start_matches([' ', '\t']).is_empty() {
                ""
            } else {
                &line[min_indent..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read `path` and return the dedented lines between `start` and `stop`.
pub fn quote_file(path: &Path, start: usize, stop: usize) -> io::Result<String> {
    let source = std::fs::read_to_string(path)?;
    let source = source.replace("\r\n", "\n");
    let lines = extract_lines(&source, start, stop);
    tracing::debug!(
        file = %path.display(),
        start,
        stop,
        lines = lines.len(),
        "quoting code sample"
    );
    Ok(dedent(&lines))
}

type SharedSender = Arc<Mutex<Option<Sender<Vec<u8>>>>>;

/// Writer handed to code under test while an output capture is active.
///
/// Clones share one channel, so they can be moved into threads. Once the
/// capture stops, writes fail with `BrokenPipe`.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: SharedSender,
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx
                .send(buf.to_vec())
                .map(|_| buf.len())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "capture reader gone")),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "capture already stopped",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An output capture in flight: the sink plus the reader's completion slot.
#[derive(Debug)]
pub struct OutputCapture {
    tx: SharedSender,
    done: Receiver<String>,
}

impl OutputCapture {
    /// Open a sink and start the background reader.
    pub fn start() -> (Self, CaptureSink) {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let (done_tx, done) = mpsc::sync_channel::<String>(1);

        thread::spawn(move || {
            let mut buf = Vec::new();
            for chunk in rx {
                buf.extend_from_slice(&chunk);
            }
            // The receiver is gone when the capture was abandoned.
            let _ = done_tx.send(String::from_utf8_lossy(&buf).into_owned());
        });

        let tx = Arc::new(Mutex::new(Some(tx)));
        let sink = CaptureSink { tx: Arc::clone(&tx) };
        (Self { tx, done }, sink)
    }

    /// Close the sink and wait up to `timeout` for everything written to it.
    ///
    /// Returns `None` when nothing was written or the reader does not finish in time.
    pub fn finish(self, timeout: Duration) -> Option<String> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match self.done.recv_timeout(timeout) {
            Ok(text) if text.is_empty() => None,
            Ok(text) => Some(text),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("captured output not delivered within {:?}, dropping it", timeout);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Capture whose reader never delivers, for exercising the timeout path.
    #[cfg(test)]
    pub(crate) fn stalled() -> (Self, mpsc::SyncSender<String>) {
        let (done_tx, done) = mpsc::sync_channel::<String>(1);
        let capture = Self {
            tx: Arc::new(Mutex::new(None)),
            done,
        };
        (capture, done_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "fn demo() {\n    let a = 1;\n\n        let b = 2;\n    a + b\n}\n";

    #[test]
    fn extracts_lines_between_calls() {
        // start call on line 1, stop call on line 6
        let lines = extract_lines(SAMPLE, 1, 6);
        assert_eq!(
            lines,
            vec!["    let a = 1;", "", "        let b = 2;", "    a + b"]
        );
    }

    #[test]
    fn adjacent_calls_yield_nothing() {
        assert!(extract_lines(SAMPLE, 2, 3).is_empty());
        assert!(extract_lines(SAMPLE, 4, 2).is_empty());
        assert!(extract_lines("", 0, 0).is_empty());
    }

    #[test]
    fn out_of_range_is_clamped() {
        let lines = extract_lines("a\nb\nc", 1, 100);
        assert_eq!(lines, vec!["b", "c"]);
        assert!(extract_lines("a\nb", 50, 60).is_empty());
    }

    #[test]
    fn dedent_strips_minimum_indent() {
        let lines = extract_lines(SAMPLE, 1, 6);
        assert_eq!(dedent(&lines), "let a = 1;\n\n    let b = 2;\na + b");
    }

    #[test]
    fn dedent_handles_tabs_and_whitespace_only_lines() {
        let lines = ["\t\tx := 1", "  \t ", "\t\t\ty := 2"];
        assert_eq!(dedent(&lines), "x := 1\n\n\ty := 2");
    }

    #[test]
    fn dedent_is_idempotent() {
        let lines = extract_lines(SAMPLE, 1, 6);
        let once = dedent(&lines);
        let twice = dedent(&once.split('\n').collect::<Vec<_>>());
        assert_eq!(once, twice);
    }

    #[test]
    fn all_blank_range_is_an_empty_body() {
        assert_eq!(dedent(&["", "   ", "\t"]), "");
        assert_eq!(dedent::<&str>(&[]), "");
    }

    #[test]
    fn caller_location_points_here() {
        let here = line!() as usize + 1;
        let location = SourceLocation::caller();
        assert_eq!(location.line, here);
        assert!(location.file.ends_with("snippet.rs"));
    }

    #[test]
    fn capture_collects_writes_from_threads() {
        let (capture, sink) = OutputCapture::start();
        let mut out = sink.clone();
        writeln!(out, "hello world!").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut out = sink.clone();
                thread::spawn(move || writeln!(out, "line {}", i).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = capture.finish(Duration::from_secs(3)).expect("delivered");
        assert!(text.starts_with("hello world!\n"));
        for i in 0..4 {
            assert!(text.contains(&format!("line {}\n", i)));
        }
    }

    #[test]
    fn capture_without_output_is_absent() {
        let (capture, _sink) = OutputCapture::start();
        assert_eq!(capture.finish(Duration::from_secs(3)), None);
    }

    #[test]
    fn slow_reader_is_dropped_after_timeout() {
        let (capture, done_tx) = OutputCapture::stalled();
        assert_eq!(capture.finish(Duration::from_millis(20)), None);
        // the reader side outlived the wait; a late delivery has nowhere to go
        assert!(done_tx.try_send("late".into()).is_err());
    }

    #[test]
    fn trailing_blank_lines_are_kept() {
        let (capture, mut sink) = OutputCapture::start();
        write!(sink, "a\n\n\n").unwrap();
        assert_eq!(capture.finish(Duration::from_secs(3)).as_deref(), Some("a\n\n\n"));
    }

    #[test]
    fn writes_after_stop_are_rejected() {
        let (capture, mut sink) = OutputCapture::start();
        write!(sink, "kept").unwrap();
        assert_eq!(capture.finish(Duration::from_secs(3)).as_deref(), Some("kept"));

        let err = write!(sink, "late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
