//! End-to-end tests for the `anot` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get path to test fixtures
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn anot() -> Command {
    cargo_bin_cmd!("anot")
}

fn d2_available() -> bool {
    std::process::Command::new("d2")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        anot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("diagram"))
            .stdout(predicate::str::contains("snippet"));
    }

    #[test]
    fn shows_version() {
        anot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod snippet {
    use super::*;

    #[test]
    fn prints_dedented_block() {
        let file = fixtures_path().join("sample.rs");
        anot()
            .arg("snippet")
            .arg(&file)
            .args(["--from", "2", "--to", "7"])
            .assert()
            .success()
            .stdout(predicate::eq(
                "```rust\nlet greeting = \"hello\";\nif !greeting.is_empty() {\n    println!(\"{greeting} world!\");\n}\n```\n",
            ));
    }

    #[test]
    fn uses_requested_language() {
        let file = fixtures_path().join("sample.rs");
        anot()
            .arg("snippet")
            .arg(&file)
            .args(["--from", "1", "--to", "3", "--lang", "text"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("```text\n// snippet:start\n```"));
    }

    #[test]
    fn rejects_inverted_range() {
        let file = fixtures_path().join("sample.rs");
        anot()
            .arg("snippet")
            .arg(&file)
            .args(["--from", "5", "--to", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("must come after"));
    }

    #[test]
    fn missing_file_fails() {
        anot()
            .args(["snippet", "does/not/exist.rs", "--from", "1", "--to", "4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does/not/exist.rs"));
    }
}

mod config {
    use super::*;

    #[test]
    fn prints_defaults_outside_a_project() {
        let temp = TempDir::new().unwrap();
        anot()
            .arg("config")
            .arg("--root")
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("show_duration = false"))
            .stdout(predicate::str::contains("layout_engine = \"elk\""));
    }

    #[test]
    fn reads_project_config() {
        anot()
            .arg("config")
            .arg("--root")
            .arg(fixtures_path().join("project"))
            .assert()
            .success()
            .stdout(predicate::str::contains("show_duration = true"))
            .stdout(predicate::str::contains("code_language = \"go\""))
            .stdout(predicate::str::contains("layout_engine = \"dagre\""));
    }
}

mod diagram {
    use super::*;

    #[test]
    fn missing_input_fails() {
        anot()
            .args(["diagram", "no-such-diagram.d2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no-such-diagram.d2"));
    }

    #[test]
    fn renders_svg_data_url_into_file() {
        if !d2_available() {
            eprintln!("d2 not on PATH, skipping");
            return;
        }
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("report.md");
        let artifacts = temp.path().join("artifacts");

        anot()
            .arg("diagram")
            .arg(fixtures_path().join("sequence.d2"))
            .args(["--format", "svg"])
            .arg("--output")
            .arg(&out)
            .arg("--artifacts")
            .arg(&artifacts)
            .assert()
            .success();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("![image](data:image/svg+xml,"));
        assert!(artifacts.join("diagram-1.svg").exists());
    }

    #[test]
    fn raw_svg_from_stdin() {
        if !d2_available() {
            return;
        }
        anot()
            .args(["diagram", "-", "--svg"])
            .write_stdin("a -> b")
            .assert()
            .success()
            .stdout(predicate::str::contains("<svg"));
    }
}
