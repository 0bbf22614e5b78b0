mod common;

use assert_cmd::Command;
use board_pose::FrameReport;
use predicates::prelude::*;
use std::fs;

use common::{blank, frontal, pinhole_config, render};

#[test]
fn annotates_a_frame_directory_and_writes_a_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    fs::create_dir(&frames).expect("mkdir");

    let cfg = pinhole_config();
    render(&cfg, &frontal(&cfg))
        .save(frames.join("000.png"))
        .expect("save");
    blank().save(frames.join("001.png")).expect("save");

    let config_path = dir.path().join("config.json");
    cfg.write_json(&config_path).expect("config");
    let out = dir.path().join("out");
    let report = dir.path().join("report.json");

    Command::cargo_bin("board-pose")
        .expect("binary")
        .arg(&frames)
        .arg("--config")
        .arg(&config_path)
        .arg("--output")
        .arg(&out)
        .arg("--report")
        .arg(&report)
        .arg("--log-level")
        .arg("warn")
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2 frames posed"));

    assert!(out.join("frame_000000.png").is_file());
    assert!(out.join("frame_000001.png").is_file());

    let reports: Vec<FrameReport> =
        serde_json::from_str(&fs::read_to_string(&report).expect("read")).expect("json");
    assert_eq!(reports.len(), 2);
    assert!(reports[0].detected && !reports[1].detected);
}

#[test]
fn missing_input_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("board-pose")
        .expect("binary")
        .arg(dir.path().join("missing"))
        .arg("--output")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_config_fails_fast() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frame = dir.path().join("frame.png");
    blank().save(&frame).expect("save");

    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{ "pattern": { "cols": 0, "rows": 7, "cell_size": 0.025 } }"#)
        .expect("write");

    Command::cargo_bin("board-pose")
        .expect("binary")
        .arg(&frame)
        .arg("--config")
        .arg(&config_path)
        .arg("--output")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern"));
}
