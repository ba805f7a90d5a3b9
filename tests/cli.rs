//! CLI test cases.
//!
//! Everything here runs offline. We use the `replay` driver for canned model
//! responses, and point the `openai` driver at a closed local port when we
//! want to prove that no request is made (or that a failed request is
//! reported properly).

use std::io::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;

/// An OpenAI API base where nothing is listening.
static CLOSED_API_BASE: &str = "http://127.0.0.1:9/v1";

/// A tiny but valid PNG.
static PNG_PATH: &str = "tests/fixtures/images/blank_check.png";

/// A canned, complete response.
static JOHN_DOE_RESPONSE: &str = "tests/fixtures/responses/john_doe.json";

/// Create a new `Command` with our binary. We use `assert_cmd`'s own
/// `Command` so that tests can feed a review session through stdin.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("check-snap").unwrap();
    cmd.env("OPENAI_API_KEY", "sk-1234")
        .env("OPENAI_API_BASE", CLOSED_API_BASE)
        .env_remove("RUST_LOG");
    cmd
}

/// Run `extract` on our PNG fixture with the replay driver.
fn replay_extract(response: &str) -> Command {
    let mut cmd = cmd();
    cmd.arg("extract")
        .arg(PNG_PATH)
        .args(["--driver", "replay", "--replay-response", response]);
    cmd
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_schema() {
    cmd()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"CheckRecord\""))
        .stdout(predicate::str::contains("\"ifscCode\""))
        .stdout(predicate::str::contains("\"additionalProperties\": false"));
}

#[test]
fn test_extract_table() {
    replay_extract(JOHN_DOE_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Payee"))
        .stdout(predicate::str::contains("John Doe"))
        .stdout(predicate::str::contains("Cheque Number"))
        .stderr(predicate::str::contains("Extraction Successful!"));
}

#[test]
fn test_extract_text() {
    let expected = "\
Payee: John Doe
Amount Numerical: 500.00
Amount Words: Five Hundred Only
Date: 01/02/2024
Bank Name: State Bank of India
IFSC Code: SBIN0001234
Account Number: 12345678901
Cheque Number: 000123
Issuer Name: Acme Traders
";
    replay_extract(JOHN_DOE_RESPONSE)
        .args(["--format", "text"])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_extract_json_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("record.json");
    replay_extract(JOHN_DOE_RESPONSE)
        .args(["--format", "json", "--out"])
        .arg(&out)
        .assert()
        .success();
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(record["payee"], "John Doe");
    assert_eq!(record["checkNumber"], "000123");
}

#[test]
fn test_extract_with_custom_prompt() {
    replay_extract(JOHN_DOE_RESPONSE)
        .args(["--prompt", "tests/fixtures/prompts/short_prompt.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("John Doe"));
}

#[test]
fn test_extract_reports_prompt_syntax_errors_with_location() {
    let dir = tempfile::tempdir().unwrap();
    let prompt = dir.path().join("bad_prompt.toml");
    std::fs::write(&prompt, "developer = \"ok\"\nmessages = [\n").unwrap();
    replay_extract(JOHN_DOE_RESPONSE)
        .arg("--prompt")
        .arg(&prompt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad_prompt.toml:"));
}

#[test]
fn test_extract_rejects_schema_mismatch() {
    replay_extract("tests/fixtures/responses/missing_field.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Extraction Failed"))
        .stderr(predicate::str::contains("checkNumber"));
}

#[test]
fn test_extract_rejects_gif_without_calling_model() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/images/not_a_check.gif")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid file type"))
        .stderr(predicate::str::contains("Extraction Failed").not());
}

#[test]
fn test_extract_rejects_oversized_jpeg_without_calling_model() {
    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    let mut data = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0".to_vec();
    data.resize(11 * 1024 * 1024, 0);
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    cmd()
        .arg("extract")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Maximum size is 10MB"))
        .stderr(predicate::str::contains("Extraction Failed").not());
}

#[test]
fn test_extract_reports_network_errors() {
    cmd()
        .arg("extract")
        .arg(PNG_PATH)
        .args(["--timeout", "30"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("John Doe").not())
        .stderr(predicate::str::contains("Extraction Failed"));
}

#[test]
fn test_extract_then_review_edit_and_save() {
    replay_extract(JOHN_DOE_RESPONSE)
        .args(["--review", "--format", "json"])
        .write_stdin("edit\nset payee Jane Doe\nsave\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes Saved"))
        .stdout(predicate::str::contains("\"payee\": \"Jane Doe\""))
        .stdout(predicate::str::contains("\"amountNumerical\": \"500.00\""));
}

#[test]
fn test_review_discards_unsaved_edits_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("record.txt");
    cmd()
        .arg("review")
        .arg(JOHN_DOE_RESPONSE)
        .args(["--format", "text", "--out"])
        .arg(&out)
        .write_stdin("edit\nset payee Jane Doe\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unsaved changes discarded"));
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Payee: John Doe\n"));
}
