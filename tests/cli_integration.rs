//! CLI-level integration tests.
//!
//! These run the built binary end to end over fixture files.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use tempfile::TempDir;

/// Get a command for running playgraph.
fn playgraph() -> Command {
    Command::cargo_bin("playgraph").unwrap()
}

#[test]
fn version_flag_works() {
    playgraph()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("playgraph"));
}

#[test]
fn help_lists_the_three_operations() {
    playgraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("consolidate"))
        .stdout(predicates::str::contains("match"))
        .stdout(predicates::str::contains("emit"));
}

#[test]
fn consolidate_help_names_only_the_locked_fields() {
    // Only name/full_name are pinned to the scrape layer; owner follows
    // the ordinary override rule and must not be described as locked.
    playgraph()
        .args(["consolidate", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("full_name"))
        .stdout(predicates::str::contains("owner").not());
}

#[test]
fn consolidate_reports_missing_layer_file() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("present.csv");
    fs::write(&present, "id\n").unwrap();

    playgraph()
        .args(["consolidate", "--scrape"])
        .arg(&present)
        .arg("--reimport")
        .arg(&present)
        .arg("--mirror")
        .arg(dir.path().join("absent.csv"))
        .arg("--associations")
        .arg(&present)
        .arg("--renames")
        .arg(&present)
        .arg("--out")
        .arg(dir.path().join("canonical.csv"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("missing layer file"));
}

#[test]
fn consolidate_writes_the_canonical_table() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(
        d.join("scrape.csv"),
        "id,owner,name,full_name\n1,alice,lib,alice/lib\n",
    )
    .unwrap();
    fs::write(d.join("reimport.csv"), "id,has_gradle_files\n1,true\n").unwrap();
    fs::write(d.join("mirror.csv"), "id,not_found\n").unwrap();
    fs::write(d.join("associations.csv"), "package,all_repos\n").unwrap();
    fs::write(d.join("renames.csv"), "id,renamed_to\n").unwrap();

    let out = d.join("canonical.csv");
    playgraph()
        .args(["consolidate", "--quiet", "--scrape"])
        .arg(d.join("scrape.csv"))
        .arg("--reimport")
        .arg(d.join("reimport.csv"))
        .arg("--mirror")
        .arg(d.join("mirror.csv"))
        .arg("--associations")
        .arg(d.join("associations.csv"))
        .arg("--renames")
        .arg(d.join("renames.csv"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let body = fs::read_to_string(&out).unwrap();
    assert!(body.starts_with("id,"));
    assert!(body.contains("alice/lib"));
}
