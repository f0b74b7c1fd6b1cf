// End-to-end: ingest the fixture data folder, then run every report

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("data")
}

fn family_records(database: &Path) -> Command {
    let mut cmd = Command::cargo_bin("family-records").unwrap();
    cmd.arg("--database").arg(database);
    cmd
}

fn ingested() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("users.sqlite3");

    family_records(&database)
        .arg("--data-dir")
        .arg(fixtures_dir())
        .arg("create-database")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 accounts, 7 children"));

    (dir, database)
}

fn report(database: &Path, command: &str, login: &str, password: &str) -> String {
    let output = family_records(database)
        .args([command, "--login", login, "--password", password])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_invalid_login() {
    let (_dir, database) = ingested();
    let out = report(&database, "print-all-accounts", "736121560", "n(9vNQ$jqO");
    assert_eq!(out, "Invalid Login\n");
}

#[test]
fn test_admin_report_rejects_regular_user() {
    let (_dir, database) = ingested();
    let out = report(&database, "print-all-accounts", "504140673", "@9TcRo15As");
    assert_eq!(out, "Invalid Login\n");
}

#[test]
fn test_print_all_accounts() {
    let (_dir, database) = ingested();
    let out = report(&database, "print-all-accounts", "brenda74@example.org", "+vJCXfFLe0");
    assert_eq!(out, "5\n");
}

#[test]
fn test_print_oldest_account() {
    let (_dir, database) = ingested();
    let out = report(&database, "print-oldest-account", "736121561", "+vJCXfFLe0");
    assert_eq!(
        out,
        "name: Brandy\nemail_adress: brandy@example.net\ncreated_at: 2022-11-25 02:19:37\n"
    );
}

#[test]
fn test_group_by_age() {
    let (_dir, database) = ingested();
    let out = report(&database, "group-by-age", "brenda74@example.org", "+vJCXfFLe0");
    assert_eq!(
        out,
        "age: 6, count: 1\nage: 13, count: 1\nage: 9, count: 2\nage: 4, count: 3\n"
    );
}

#[test]
fn test_print_children() {
    let (_dir, database) = ingested();
    let out = report(&database, "print-children", "504140673", "@9TcRo15As");
    assert_eq!(out, "Jackie, 9\nMitchell, 6\n");
}

#[test]
fn test_find_similar_children_by_age() {
    let (_dir, database) = ingested();
    let out = report(
        &database,
        "find-similar-children-by-age",
        "kcabrera@example.net",
        "gk2VM$qk@S",
    );

    assert_eq!(
        out,
        "Patricia, 636162531: Andrew, 4; James, 13\n\
         Brandy, 686983157: Teresa, 4\n\
         Carl, 504140673: Jackie, 9; Mitchell, 6\n"
    );
}

#[test]
fn test_find_similar_children_by_age_single_child() {
    let (_dir, database) = ingested();
    let out = report(&database, "find-similar-children-by-age", "brandy@example.net", "b-pw");

    assert_eq!(
        out,
        "Patricia, 636162531: Andrew, 4; James, 13\n\
         Kelly, 700800900: Liam, 9; Olivia, 4\n"
    );
}

#[test]
fn test_report_without_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("missing.sqlite3");

    family_records(&database)
        .args(["print-all-accounts", "--login", "a", "--password", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("create-database"));
}

#[test]
fn test_errors_reach_stderr_with_logging_off() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("missing.sqlite3");

    family_records(&database)
        .env("FAMILY_RECORDS_LOG", "off")
        .args(["print-all-accounts", "--login", "a", "--password", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("create-database"));
}

#[test]
fn test_report_requires_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("users.sqlite3");

    family_records(&database)
        .arg("print-children")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--login"));
}
