//! `calign sessions` prints canonical session counts.
//!
//! GREEN when:
//! - Crypto 2024 reports 366 sessions.
//! - Equity 2024 reports 252 sessions on XNYS.
//! - `--json` prints the ascending date list.
//! - An unknown asset class exits non-zero naming the accepted tags.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn calign() -> Command {
    Command::cargo_bin("calign").unwrap()
}

#[test]
fn crypto_2024_has_366_sessions() {
    calign()
        .args([
            "sessions",
            "--asset-class",
            "crypto",
            "--start",
            "2024-01-01",
            "--end",
            "2024-12-31",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("calendar_id=CRYPTO sessions=366"))
        .stdout(predicate::str::contains("first=2024-01-01 last=2024-12-31"));
}

#[test]
fn equity_2024_has_252_sessions() {
    calign()
        .args([
            "sessions",
            "--asset-class",
            "equity",
            "--start",
            "2024-01-01",
            "--end",
            "2024-12-31",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("calendar_id=XNYS sessions=252"));
}

#[test]
fn json_lists_dates() {
    calign()
        .args([
            "sessions",
            "--asset-class",
            "fx",
            "--start",
            "2024-01-05",
            "--end",
            "2024-01-08",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("[\"2024-01-05\",\"2024-01-08\"]\n"));
}

#[test]
fn unknown_asset_class_fails() {
    calign()
        .args([
            "sessions",
            "--asset-class",
            "bonds",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown asset class 'bonds'"));
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    std::fs::write(&base, "strictness: warn\nfrequency: daily\n").unwrap();

    calign()
        .args(["config-hash", base.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^config_hash=[0-9a-f]{64}\n").unwrap())
        .stdout(predicate::str::contains(
            r#"{"frequency":"daily","strictness":"warn"}"#,
        ));
}
