//! CLI tests for the `pdr` binary.
//!
//! Spawns the binary and checks exit codes and key=value output. None of
//! these reach the network.

use std::fs;
use std::process::Command;

use pdr::exit_codes;

#[test]
fn score_reports_rubric_result() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("summary.txt");
    fs::write(
        &file,
        "CNNs apply convolution with learned filters, also called kernels, trained by backpropagation.",
    )
    .expect("write text");

    let output = Command::new(env!("CARGO_BIN_EXE_pdr"))
        .args(["score", "--task", "Technical_Explanation"])
        .arg(&file)
        .output()
        .expect("pdr score");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("word_count_ok=false"), "{stdout}");
    assert!(stdout.contains("must_include_ok=true"), "{stdout}");
    assert!(stdout.contains("score=75"), "{stdout}");
    assert!(stdout.contains("satisfaction=3.8"), "{stdout}");
}

#[test]
fn score_unknown_task_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("text.txt");
    fs::write(&file, "anything").expect("write text");

    let output = Command::new(env!("CARGO_BIN_EXE_pdr"))
        .args(["score", "--task", "No_Such_Task"])
        .arg(&file)
        .output()
        .expect("pdr score");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No_Such_Task"));
}

#[test]
fn list_prints_builtin_catalog() {
    let output = Command::new(env!("CARGO_BIN_EXE_pdr"))
        .args(["list", "--catalog", "software"])
        .output()
        .expect("pdr list");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("source=software"));
    assert!(stdout.contains("domain=software engineering"));
}

#[test]
fn run_without_api_key_fails_before_any_results() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("pdr.toml"),
        "[api]\nkey_env = \"PDR_TEST_UNSET_KEY\"\n",
    )
    .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_pdr"))
        .current_dir(temp.path())
        .env_remove("PDR_TEST_UNSET_KEY")
        .args(["run", "--strategy", "pdr"])
        .output()
        .expect("pdr run");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no API key"));
    assert!(!temp.path().join("results").exists());
}

#[test]
fn run_rejects_zero_iterations() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_pdr"))
        .current_dir(temp.path())
        .args(["run", "--strategy", "adhoc", "--max-iterations", "0"])
        .output()
        .expect("pdr run");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_iterations"));
}
