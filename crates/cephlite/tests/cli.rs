// Copyright 2026 The Cephlite Authors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests for the cephlite binary.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

/// Run the binary with `args`, logging disabled.
fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cephlite"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run cephlite")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_place_reference_topology() {
    let json = stdout_json(&run(&["--format", "json", "place", "--pg", "100"]));
    assert_eq!(json["pg"], 100);
    assert_eq!(json["devices"], serde_json::json!(["osd.0", "osd.2"]));

    let json = stdout_json(&run(&["--format", "json", "place", "--pg", "101"]));
    assert_eq!(json["devices"], serde_json::json!(["osd.0", "osd.3"]));
}

#[test]
fn test_place_text_output() {
    let output = run(&["place", "--pg", "100"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PG 100"));
    assert!(stdout.contains("osd.0"));
    assert!(stdout.contains("host_node2"));
}

#[test]
fn test_unknown_rule_fails() {
    let output = run(&["place", "--pg", "1", "--rule", "erasure_rule"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rule 'erasure_rule' not found"), "stderr: {stderr}");
}

#[test]
fn test_object_is_stable() {
    let args = ["--format", "json", "object", "--pool", "rbd", "--object", "vm-disk-1"];
    let first = stdout_json(&run(&args));
    let second = stdout_json(&run(&args));

    assert_eq!(first, second);
    assert!(first["pg"].as_u64().unwrap() < 128);
    assert_eq!(first["devices"].as_array().unwrap().len(), 2);
}

#[test]
fn test_map_covers_every_device() {
    let json = stdout_json(&run(&["--format", "json", "map", "--pgs", "64"]));

    assert_eq!(json["pg_count"], 64);
    assert_eq!(json["undersized"], 64);
    assert_eq!(json["mappings"].as_array().unwrap().len(), 64);

    let distribution = json["distribution"].as_object().unwrap();
    assert_eq!(distribution.len(), 4);
    let total: u64 = distribution.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(total, 128);
}

#[test]
fn test_show_with_config_file() {
    let file = write_config(
        r#"
root = "dc"

[placement]
rule = "any"

[[devices]]
id = 10

[[devices]]
id = 11
weight = 2.5

[[buckets]]
name = "dc"
type = "root"
items = ["osd.10", "osd.11"]

[[rules]]
name = "any"
steps = [
  { op = "take", item = "dc" },
  { op = "chooseleaf", num = 2, type = "host" },
  { op = "emit" },
]
"#,
    );
    let path = file.path().to_str().unwrap();

    let json = stdout_json(&run(&["--config", path, "--format", "json", "show"]));
    assert_eq!(json["root"], "dc");
    assert_eq!(json["device_count"], 2);
    assert_eq!(json["buckets"][0]["id"], -1);
    assert_eq!(json["rules"], serde_json::json!(["any"]));

    let json = stdout_json(&run(&["--config", path, "--format", "json", "place", "--pg", "7"]));
    assert_eq!(json["devices"], serde_json::json!(["osd.10", "osd.11"]));
}

#[test]
fn test_invalid_topology_fails() {
    let file = write_config(
        r#"
[[buckets]]
name = "a"
type = "host"
items = ["b"]

[[buckets]]
name = "b"
type = "host"
items = ["a"]
"#,
    );

    let output = run(&["--config", file.path().to_str().unwrap(), "show"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle"), "stderr: {stderr}");
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let output = run(&["--config", path.to_str().unwrap(), "show"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}
