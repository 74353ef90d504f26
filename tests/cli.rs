use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn headless_run_prints_the_scene_summary() {
    let mut cmd = Command::cargo_bin("sphere-field").expect("binary exists");
    cmd.arg("--headless");
    cmd.assert()
        .success()
        .stdout(contains("Generated sphere mesh: 400 vertices, 2400 indices"))
        .stdout(contains("of 100 spheres (radius 0.40)"))
        .stdout(contains("Lights: 2 point, 1 directional, 1 spot, rim enabled"));
}

#[test]
fn headless_run_honors_a_custom_assets_dir() {
    let dir = tempfile::tempdir().expect("temp assets dir");
    let mut cmd = Command::cargo_bin("sphere-field").expect("binary exists");
    cmd.arg("--assets").arg(dir.path()).arg("--headless");
    cmd.assert().success();
}

#[test]
fn unknown_argument_fails_with_usage() {
    let mut cmd = Command::cargo_bin("sphere-field").expect("binary exists");
    cmd.arg("--bogus");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"))
        .stderr(contains("Usage: sphere-field"));
}

#[test]
fn assets_flag_requires_a_value() {
    let mut cmd = Command::cargo_bin("sphere-field").expect("binary exists");
    cmd.arg("--assets");
    cmd.assert()
        .failure()
        .stderr(contains("--assets needs a directory"));
}
