// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn bramble() -> Command {
    Command::cargo_bin("bramble").expect("binary builds")
}

#[test]
fn simulate_json_reports_every_requested_strategy() {
    let output = bramble()
        .args(["simulate", "--entries", "120", "--steps", "4", "--workers", "2"])
        .args(["--strategy", "tree,sap,grid", "--json"])
        .output()
        .expect("run bramble");
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let reports = reports.as_array().expect("array of reports");
    assert_eq!(reports.len(), 3);
    let names: Vec<_> = reports.iter().map(|r| r["strategy"].as_str().unwrap()).collect();
    assert_eq!(names, ["tree", "sort-and-sweep", "uniform-grid"]);
    let finals: Vec<_> = reports.iter().map(|r| r["final_pairs"].as_u64().unwrap()).collect();
    assert!(finals.windows(2).all(|w| w[0] == w[1]), "strategies disagree: {finals:?}");
}

#[test]
fn simulate_table_lists_strategy() {
    bramble()
        .args(["simulate", "--entries", "50", "--steps", "2", "--strategy", "brute"])
        .assert()
        .success()
        .stdout(predicate::str::contains("brute-force"));
}

#[test]
fn verify_succeeds_on_generated_scene() {
    bramble()
        .args(["verify", "--entries", "200", "--steps", "5", "--workers", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sort-and-sweep").and(predicate::str::contains("ok")));
}

#[test]
fn verify_json_has_no_mismatches() {
    let output = bramble()
        .args(["verify", "--entries", "80", "--steps", "3", "--single-threaded", "--json"])
        .output()
        .expect("run bramble");
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(outcome["mismatches"].as_array().map(Vec::len), Some(0));
    assert_eq!(outcome["strategies"].as_array().map(Vec::len), Some(4));
}

#[test]
fn invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "growth_factor": 0.5 }}"#).expect("write config");
    bramble()
        .args(["simulate", "--entries", "10", "--steps", "1", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("growth_factor"));
}

#[test]
fn malformed_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "not json").expect("write config");
    bramble()
        .args(["verify", "--entries", "10", "--config"])
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn defaults_prints_config_json() {
    let output = bramble().arg("defaults").output().expect("run bramble");
    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert!((config["growth_factor"].as_f64().unwrap() - 1.4).abs() < 1e-6);
    assert_eq!(config["min_leaf_occupancy"], 2);
    assert!(config["looper"].is_object());
}
