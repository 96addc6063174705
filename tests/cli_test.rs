mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{application_row, write_applications};
use predicates::prelude::*;
use quotebind::infrastructure::in_memory::DECLINED_CARD_NUMBER;
use std::process::Command;

fn sandbox_command() -> Command {
    let mut cmd = Command::new(cargo_bin!("quotebind"));
    cmd.env_remove("CARRIER_BASE_URL")
        .env_remove("CARRIER_API_KEY")
        .env_remove("CARRIER_QUOTE_PACKAGE_ID")
        .env_remove("CARRIER_TIMEOUT_SECS");
    cmd
}

#[test]
fn test_cli_batch_against_sandbox() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("applications.csv");

    let mut bad_email = application_row("4111 1111 1111 1111");
    bad_email[2] = "not-an-email".into();
    write_applications(
        &input,
        &[
            application_row("4111 1111 1111 1111"),
            application_row(DECLINED_CARD_NUMBER),
            bad_email,
        ],
    )?;

    let mut cmd = sandbox_command();
    cmd.arg(&input);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "row,step,quote_id,premium_amount,policy_number,policy_id,effective_date,message",
        ))
        .stdout(predicate::str::contains(
            "1,bound,quote-0001,125.00,POL-0003,pol-0003,",
        ))
        .stdout(predicate::str::contains(
            "2,quoted,quote-0004,125.00,,,,card declined",
        ))
        .stdout(predicate::str::contains(
            "3,collecting_info,,,,,,Please enter a valid email address",
        ))
        .stderr(predicate::str::contains("Error processing application 2"))
        .stderr(predicate::str::contains("Error processing application 3"))
        .stderr(predicate::str::contains("Error processing application 1").not());

    Ok(())
}

#[test]
fn test_cli_skips_malformed_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("applications.csv");
    let header = common::HEADER.join(",");
    let good = application_row("4111111111111111").join(",");
    std::fs::write(&input, format!("{header}\nAda,Lovelace\n{good}\n"))?;

    let mut cmd = sandbox_command();
    cmd.arg(&input);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2,bound,quote-0001"))
        .stderr(predicate::str::contains("Error reading application 1"));

    Ok(())
}

#[test]
fn test_cli_missing_input_file() {
    let mut cmd = sandbox_command();
    cmd.arg("does-not-exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_cli_health_against_sandbox() {
    let mut cmd = sandbox_command();
    cmd.arg("--health");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("carrier is healthy"));
}

#[test]
fn test_cli_rejects_zero_timeout() {
    let mut cmd = sandbox_command();
    cmd.arg("--health").arg("--timeout-secs").arg("0");

    cmd.assert().failure();
}

#[test]
fn test_cli_rejects_invalid_timeout_from_env() {
    let mut cmd = sandbox_command();
    cmd.env("CARRIER_BASE_URL", "http://127.0.0.1:9")
        .env("CARRIER_TIMEOUT_SECS", "soon")
        .arg("--health");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CARRIER_TIMEOUT_SECS must be a positive"));
}
