//! Integration tests for the `wiretwin` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn wiretwin_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wiretwin"));
    cmd.env("RUST_LOG", "error");
    cmd.env_remove("WIRETWIN_ARCHIVE");
    cmd.env_remove("WIRETWIN_CONFIG");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_archive(dir: &Path) -> PathBuf {
    let entry = |id: &str, headers: Value| {
        json!({
            "id": id,
            "url": format!("https://shop.example.com/api/items?cb={id}"),
            "http_version": "HTTP/1.1",
            "request": {"method": "GET", "headers": headers},
            "response": {"status": 200, "headers": [], "body": "e30="},
        })
    };
    let archive = json!({
        "active_session": "s1",
        "sessions": {
            "s1": [
                entry("a", json!([["User-Agent", "Mozilla/5.0"], ["Accept", "*/*"]])),
                entry("b", json!([["Accept", "*/*"]])),
                entry("c", json!([["User-Agent", "Mozilla/5.0"], ["Accept", "*/*"]])),
            ]
        }
    });
    write(
        dir,
        "capture.json",
        &serde_json::to_string_pretty(&archive).unwrap(),
    )
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

mod fingerprint {
    use super::*;

    #[test]
    fn test_fingerprint_prints_entry_summary() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());

        let output = wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .args(["fingerprint", "a"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let fp = stdout_json(&output);
        assert_eq!(fp["entry_summary"]["entry_id"], "a");
        assert_eq!(fp["entry_summary"]["method"], "GET");
        assert_eq!(fp["entry_summary"]["host"], "shop.example.com");
    }

    #[test]
    fn test_fingerprint_requires_archive() {
        wiretwin_cmd()
            .args(["fingerprint", "a"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--archive"));
    }

    #[test]
    fn test_unknown_entry_fails() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());

        wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .args(["fingerprint", "missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing"));
    }
}

mod diff {
    use super::*;

    #[test]
    fn test_diff_reports_missing_header() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());

        let output = wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .args(["diff", "a", "b"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let result = stdout_json(&output);
        assert_eq!(
            result["important_diffs"]["headers_missing"],
            json!(["user-agent"])
        );
        assert_eq!(result["important_diffs"]["headers_extra"], json!([]));
    }

    #[test]
    fn test_diff_of_identical_entries_is_empty() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());

        let output = wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .args(["diff", "a", "c"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let result = stdout_json(&output);
        let important = &result["important_diffs"];
        assert_eq!(important["headers_missing"], json!([]));
        assert_eq!(important["headers_value_changed"], json!([]));
        assert!(important.get("header_order_changes").is_none());
    }

    #[test]
    fn test_diff_can_skip_header_comparison() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());

        let output = wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .args(["diff", "a", "b", "--no-headers", "--no-header-order"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let result = stdout_json(&output);
        assert_eq!(result["important_diffs"]["headers_missing"], json!([]));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(dir.path());
        let config = write(dir.path(), "wiretwin.yaml", "fingerprint:\n  max_bytes: 0\n");

        wiretwin_cmd()
            .arg("--archive")
            .arg(&archive)
            .arg("--config")
            .arg(&config)
            .args(["diff", "a", "b"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("max_bytes"));
    }
}

mod schema {
    use super::*;

    const RECORD: &str = "type Reading struct {\n\tStatus string `json:\"status\"`\n\tValue  *int   `json:\"value\"`\n}\n";

    #[test]
    fn test_validate_passes_valid_samples() {
        let dir = TempDir::new().unwrap();
        let schema = write(dir.path(), "reading.go", RECORD);
        let sample = write(dir.path(), "ok.json", r#"{"status":"ok","value":null}"#);

        wiretwin_cmd()
            .args(["schema", "validate"])
            .arg(&schema)
            .arg(&sample)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"valid\": true"));
    }

    #[test]
    fn test_validate_exits_one_on_invalid_sample() {
        let dir = TempDir::new().unwrap();
        let schema = write(dir.path(), "reading.go", RECORD);
        let good = write(dir.path(), "ok.json", r#"{"status":"ok","value":1}"#);
        let bad = write(dir.path(), "bad.json", r#"{"status":null,"value":1}"#);

        let output = wiretwin_cmd()
            .args(["schema", "validate"])
            .arg(&schema)
            .arg(&good)
            .arg(&bad)
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let report = stdout_json(&output);
        assert_eq!(report["valid"], false);
        assert_eq!(report["samples"][0]["valid"], true);
        assert_eq!(
            report["samples"][1]["errors"],
            json!(["/status: expected string, got null"])
        );
    }

    #[test]
    fn test_validate_needs_format_for_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let schema = write(dir.path(), "schema.txt", "z.object({ a: z.string() })");
        let sample = write(dir.path(), "s.json", r#"{"a":"x"}"#);

        wiretwin_cmd()
            .args(["schema", "validate"])
            .arg(&schema)
            .arg(&sample)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--format"));

        wiretwin_cmd()
            .args(["schema", "validate", "--format", "fluent-dsl"])
            .arg(&schema)
            .arg(&sample)
            .assert()
            .success();
    }

    #[test]
    fn test_forbidden_type_is_fatal() {
        let dir = TempDir::new().unwrap();
        let schema = write(dir.path(), "bad.go", "type T struct { X any }");
        let sample = write(dir.path(), "s.json", "{}");

        wiretwin_cmd()
            .args(["schema", "validate"])
            .arg(&schema)
            .arg(&sample)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid schema"));
    }

    #[test]
    fn test_infer_marks_nullable_keys_optional() {
        let dir = TempDir::new().unwrap();
        let samples = [
            write(dir.path(), "1.json", r#"{"id":1,"name":"a"}"#),
            write(dir.path(), "2.json", r#"{"id":2,"name":null}"#),
            write(dir.path(), "3.json", r#"{"id":3,"name":"c"}"#),
        ];

        let output = wiretwin_cmd()
            .args(["schema", "infer", "--nullable-optional"])
            .args(&samples)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let result = stdout_json(&output);
        assert_eq!(result["sample_count"], 3);
        assert_eq!(result["all_match"], false);
        assert_eq!(result["schema"]["required"], json!(["id"]));
    }

    #[test]
    fn test_stats_reports_fields() {
        let dir = TempDir::new().unwrap();
        let schema = write(dir.path(), "reading.go", RECORD);
        let samples = [
            write(dir.path(), "1.json", r#"{"status":"ok","value":1}"#),
            write(dir.path(), "2.json", r#"{"status":"ok","value":null}"#),
        ];

        let output = wiretwin_cmd()
            .args(["schema", "stats"])
            .arg(&schema)
            .args(&samples)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let stats = stdout_json(&output);
        let paths: Vec<&str> = stats
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["status", "value"]);
        assert_eq!(stats[1]["null"], 1);
        assert_eq!(stats[1]["present"], 2);
    }
}
