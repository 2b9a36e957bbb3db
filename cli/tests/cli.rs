use assert_cmd::Command;
use predicates::prelude::*;

fn simfell() -> Command {
    Command::cargo_bin("simfell").unwrap()
}

const FIXTURE: &str = "tests/fixtures/rime.simfell";

#[test]
fn parse_prints_the_document_as_json() {
    simfell()
        .args(["parse", "--file", FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Frosty\""))
        .stdout(predicate::str::contains("\"ice_comet\""));
}

#[test]
fn parse_error_names_the_line() {
    simfell()
        .args(["parse", "--file", "tests/fixtures/broken.simfell"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn average_dps_from_document() {
    simfell()
        .args(["average-dps", "--file", FIXTURE, "--runs", "8", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mean\""))
        .stdout(predicate::str::contains("Frost Bolt"));
}

#[test]
fn debug_sim_prints_a_trace() {
    simfell()
        .args(["debug-sim", "--preset", "default", "--duration", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[START]"))
        .stdout(predicate::str::contains("[CAST][Frost Bolt]"))
        .stdout(predicate::str::contains("DPS:"));
}

#[test]
fn stat_weights_lists_every_stat() {
    simfell()
        .args([
            "stat-weights",
            "--custom-character",
            "100-100-100-100-100",
            "--duration",
            "30",
            "--runs",
            "4",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("intellect"))
        .stdout(predicate::str::contains("spirit"));
}

#[test]
fn preset_and_custom_character_conflict() {
    simfell()
        .args([
            "average-dps",
            "--preset",
            "default",
            "--custom-character",
            "1-2-3-4-5",
        ])
        .assert()
        .failure();
}

#[test]
fn malformed_custom_stats_are_rejected() {
    simfell()
        .args(["debug-sim", "--custom-character", "100-x-100-100-100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom_character"));
}
