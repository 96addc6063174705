use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_sandbox_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("quotebind"));
    cmd.env_remove("CARRIER_BASE_URL").arg("--health");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "WARNING: No carrier URL configured (--carrier-url or CARRIER_BASE_URL). Falling back to the in-memory sandbox carrier.",
        ));
}

#[test]
fn test_blank_carrier_url_falls_back() {
    let mut cmd = Command::new(cargo_bin!("quotebind"));
    cmd.env("CARRIER_BASE_URL", "   ").arg("--health");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back to the in-memory sandbox carrier"));
}

#[test]
fn test_unreachable_carrier_has_no_fallback() {
    let mut cmd = Command::new(cargo_bin!("quotebind"));
    cmd.arg("--health")
        .arg("--carrier-url")
        .arg("http://127.0.0.1:9")
        .arg("--timeout-secs")
        .arg("2");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("WARNING").not())
        .stderr(predicate::str::contains("Carrier health check failed"));
}
