//! Smoke tests for the `wayfinder-cli` demo binary.

use assert_cmd::Command;

const SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

#[test]
fn list_chains_prints_every_supported_chain() {
    let mut cmd = Command::cargo_bin("wayfinder-cli").unwrap();
    let output = cmd.arg("list-chains").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    for chain in ["ethereum", "bitcoin", "solana", "tron", "aptos", "sui", "ton", "polkadot", "cardano", "near"] {
        assert!(stdout.contains(chain), "missing {chain} in: {stdout}");
    }
}

#[test]
fn address_all_derives_one_line_per_chain() {
    let mut cmd = Command::cargo_bin("wayfinder-cli").unwrap();
    let output = cmd.args(["--seed", SEED, "address-all"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 18, "expected one line per chain:\n{stdout}");
    assert!(stdout.contains("ethereum"));
    assert!(stdout.contains("bitcoin"));
}

#[test]
fn address_is_deterministic_across_invocations() {
    let run = || {
        let mut cmd = Command::cargo_bin("wayfinder-cli").unwrap();
        let output = cmd.args(["--seed", SEED, "address", "--chain", "ethereum", "--index", "7"]).output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn missing_seed_fails_with_a_clear_error() {
    let mut cmd = Command::cargo_bin("wayfinder-cli").unwrap();
    cmd.args(["address", "--chain", "ethereum"]);
    cmd.assert().failure();
}
