use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cadence(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.env("CADENCE_DB_PATH", tmp.path().join("cadence.db"))
        .current_dir(tmp.path());
    cmd
}

fn created_task_id(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .find(|l| l.starts_with("Created task:"))
        .and_then(|l| l.split_whitespace().nth(2))
        .expect("add output should contain the task id")
        .to_string()
}

#[test]
fn add_then_list_shows_the_task() {
    let tmp = tempfile::tempdir().unwrap();

    cadence(&tmp)
        .args(["add", "Water plants", "--context", "home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task:"));

    cadence(&tmp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Water plants"));
}

#[test]
fn reconcile_materializes_and_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();

    cadence(&tmp)
        .args(["add", "Daily review", "--repeat", "FREQ=DAILY", "--due", "2024-01-01"])
        .assert()
        .success();

    cadence(&tmp)
        .args(["reconcile", "--from", "2024-01-01", "--to", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 created"));

    cadence(&tmp)
        .args(["reconcile", "--from", "2024-01-01", "--to", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 created"));
}

#[test]
fn builder_flags_create_a_weekly_series() {
    let tmp = tempfile::tempdir().unwrap();

    cadence(&tmp)
        .args([
            "add", "Standup", "--every", "weekly", "--on", "MO,WE,FR",
            "--due", "2024-01-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("FREQ=WEEKLY;BYDAY=MO,WE,FR"));

    cadence(&tmp)
        .args(["reconcile", "--from", "2024-01-01", "--to", "2024-01-07"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 created"));
}

#[test]
fn commit_and_uncommit_round_trip() {
    let tmp = tempfile::tempdir().unwrap();

    let output = cadence(&tmp)
        .args(["add", "Write report"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = created_task_id(&output);

    cadence(&tmp)
        .args(["commit", &id, "--on", "2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-05-01"));

    cadence(&tmp)
        .args(["uncommit", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("backlog"));
}

#[test]
fn pause_blocks_materialization_until_resume() {
    let tmp = tempfile::tempdir().unwrap();

    let output = cadence(&tmp)
        .args(["add", "Journal", "--repeat", "FREQ=DAILY", "--due", "2024-01-01"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = created_task_id(&output);

    cadence(&tmp).args(["pause", &id]).assert().success();

    cadence(&tmp)
        .args(["reconcile", "--from", "2024-01-01", "--to", "2024-01-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 created"))
        .stdout(predicate::str::contains("1 paused"));

    cadence(&tmp).args(["resume", &id]).assert().success();

    cadence(&tmp)
        .args(["reconcile", "--from", "2024-01-01", "--to", "2024-01-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 created"));
}

#[test]
fn committing_an_unknown_task_fails_with_not_found() {
    let tmp = tempfile::tempdir().unwrap();

    cadence(&tmp)
        .args(["commit", "018f3c7e-0000-7000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn invalid_rules_are_rejected_at_add_time() {
    let tmp = tempfile::tempdir().unwrap();

    cadence(&tmp)
        .args(["add", "Broken", "--repeat", "FREQ=YEARLY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recurrence rule"));

    cadence(&tmp)
        .args(["add", "Also broken", "--repeat", "FREQ=DAILY;BYDAY=MO"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recurrence rule"));
}
