//! Chapter paths, outcomes and the run bookkeeping behind the summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::progress::format_duration;

/// Position of a chapter in the story, as an owned value.
///
/// Every chapter derives its own path from its parent's, so nothing is pushed
/// or popped and sibling chapters cannot disturb each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChapterPath {
    segments: Vec<String>,
}

impl ChapterPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `a.b.c`, the key of the duration table.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Markdown anchor form (`a > b` without separators).
    pub fn anchor(&self) -> String {
        self.segments.concat()
    }
}

impl fmt::Display for ChapterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(" > "))
    }
}

/// Result of one chapter (or story) body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Outcome::Passed => "✅",
            Outcome::Failed => "❌",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Passed => "pass",
            Outcome::Failed => "fail",
        })
    }
}

/// What a chapter body may return.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Passed
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> Outcome {
        if self { Outcome::Passed } else { Outcome::Failed }
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl<E: fmt::Display> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(()) => Outcome::Passed,
            Err(e) => {
                tracing::error!("chapter body returned an error: {}", e);
                Outcome::Failed
            }
        }
    }
}

/// One finished chapter, in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub path: ChapterPath,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl HistoryEntry {
    /// Markdown line replayed after the summary.
    pub fn render(&self, show_duration: bool) -> String {
        if show_duration {
            format!(
                "{}: {} {} - {}\n\n",
                self.path,
                self.outcome.icon(),
                self.outcome,
                format_duration(self.duration)
            )
        } else {
            format!("{}: {} {}\n\n", self.path, self.outcome.icon(), self.outcome)
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.outcome)
    }
}

/// Counters, durations and history of a run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    total: usize,
    fails: usize,
    durations: BTreeMap<String, Duration>,
    history: Vec<HistoryEntry>,
}

impl RunStats {
    /// Count a chapter as soon as it is entered.
    pub fn enter(&mut self) {
        self.total += 1;
    }

    /// Record a finished chapter.
    pub fn finish(&mut self, path: ChapterPath, outcome: Outcome, duration: Duration) {
        if !outcome.is_pass() {
            self.fails += 1;
        }
        self.durations.insert(path.dotted(), duration);
        self.history.push(HistoryEntry {
            path,
            outcome,
            duration,
        });
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fails(&self) -> usize {
        self.fails
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn duration_of(&self, dotted: &str) -> Option<Duration> {
        self.durations.get(dotted).copied()
    }

    pub fn durations(&self) -> &BTreeMap<String, Duration> {
        &self.durations
    }

    pub fn summary(&self, outcome: Outcome, elapsed: Duration) -> Summary {
        Summary {
            total: self.total,
            passed: self.total - self.fails,
            failed: self.fails,
            elapsed,
            outcome,
        }
    }
}

/// Aggregate written after a story body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl Summary {
    /// Percentage of passed chapters; `0.0` when no chapter ran.
    pub fn success_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.passed as f64 / self.total as f64
    }

    pub fn failure_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 - self.success_percent()
    }

    /// The `# Summary(...)` line.
    pub fn headline(&self) -> String {
        format!(
            "# Summary(total: {} success: {}({:.1} %) failed: {}({:.1} %)) - {}",
            self.total,
            self.passed,
            self.success_percent(),
            self.failed,
            self.failure_percent(),
            format_duration(self.elapsed)
        )
    }
}
