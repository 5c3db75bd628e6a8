//! Integration tests for the avivar binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use std::path::{Path, PathBuf};

use predicates::prelude::*;

fn write_trace(dir: &Path, source_path: &Path, error: Option<&str>) -> PathBuf {
    let trace = serde_json::json!({
        "version": 1,
        "python": "3.11.9",
        "error": error,
        "units": [{
            "path": source_path,
            "root": {
                "name": "<module>",
                "instructions": [{
                    "opname": "BINARY_OP_ADD_INT",
                    "is_jump_target": false,
                    "lineno": 1,
                    "end_lineno": 1,
                    "col_offset": 0,
                    "end_col_offset": 5
                }],
                "children": []
            }
        }]
    });
    let path = dir.join("trace.json");
    std::fs::write(&path, trace.to_string()).unwrap();
    path
}

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("avivar").unwrap()
}

#[test]
fn test_run_emits_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("mod.py");
    std::fs::write(&source, "x = 1\ny = 2\n").unwrap();
    let trace = write_trace(dir.path(), &source, None);

    cmd()
        .arg("run")
        .arg("--trace")
        .arg(&trace)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\":\"x = 1\""))
        .stdout(predicate::str::contains("\"specialized\":1"));
}

#[test]
fn test_run_writes_html_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("mod.py");
    std::fs::write(&source, "x = 1\ny = 2\n").unwrap();
    let trace = write_trace(dir.path(), &source, None);
    let out = dir.path().join("reports");

    cmd()
        .arg("run")
        .arg("--trace")
        .arg(&trace)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let report = out.join("mod.html");
    let html = std::fs::read_to_string(&report).unwrap();
    assert!(html.contains("<pre>"));
    assert!(html.contains("x = 1"));
}

#[test]
fn test_run_reports_missing_targets() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("mod.py");
    std::fs::write(&source, "x = 1\n").unwrap();
    let trace = write_trace(dir.path(), &source, None);

    cmd()
        .arg("run")
        .arg("--trace")
        .arg(&trace)
        .arg("--targets")
        .arg(dir.path().join("other.py"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no source files found"));
}

#[test]
fn test_run_surfaces_upstream_failure_after_report() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("mod.py");
    std::fs::write(&source, "x = 1\ny = 2\n").unwrap();
    let trace = write_trace(
        dir.path(),
        &source,
        Some("ZeroDivisionError: division by zero"),
    );

    cmd()
        .arg("run")
        .arg("--trace")
        .arg(&trace)
        .arg("--json")
        .assert()
        .failure()
        // The report is still emitted before the failure surfaces.
        .stdout(predicate::str::contains("\"source\":\"x = 1\""))
        .stderr(predicate::str::contains("ZeroDivisionError"));
}

#[test]
fn test_run_rejects_theme_with_json() {
    cmd()
        .arg("run")
        .arg("--trace")
        .arg("t.json")
        .arg("--json")
        .arg("--dark")
        .assert()
        .failure();
}

#[test]
fn test_help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("watch"));
}
