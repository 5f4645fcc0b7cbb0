//! Path helpers for the report file and for quoted source files.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{AnotestError, Result};

/// Expand a leading `~/` to the current user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    expand_home_with(path, dirs::home_dir())
}

/// Same as [`expand_home`] with an explicit home directory.
pub fn expand_home_with(path: &str, home: Option<PathBuf>) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = home.ok_or_else(|| AnotestError::HomeDir(path.to_string()))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Create (or truncate) the report file, write-only.
pub fn open_report(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|source| AnotestError::OpenReport {
        path: path.to_path_buf(),
        source,
    })
}

/// Locate a source file recorded by `file!()`/`Location::caller()`.
///
/// Those paths are relative to the directory rustc ran in (the workspace
/// root), while tests run from the package directory, so each ancestor of
/// `cwd` is tried in turn.
pub fn resolve_source(recorded: &Path, cwd: &Path) -> Option<PathBuf> {
    if recorded.is_absolute() {
        return recorded.exists().then(|| recorded.to_path_buf());
    }
    cwd.ancestors()
        .map(|dir| dir.join(recorded))
        .find(|candidate| candidate.is_file())
}

/// Display form of `path` relative to `cwd` when it lives below it.
pub fn short_path(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
