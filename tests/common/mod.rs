//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

pub const SKU: &str = "SKU-100";
pub const MACHINE: &str = "Dakin-1";
pub const OPERATOR: &str = "Sam";

/// Helper to get a coilqc command
///
/// User-level config and the operator variable are cleared so the host
/// environment cannot leak into results.
pub fn coilqc() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("coilqc"));
    cmd.env_remove("COILQC_OPERATOR")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", std::env::temp_dir().join("coilqc-test-no-config"))
        .env("NO_COLOR", "1");
    cmd
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    coilqc().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Run coilqc in the project and assert success
pub fn run_ok(tmp: &TempDir, args: &[&str]) {
    coilqc().current_dir(tmp.path()).args(args).assert().success();
}

/// Project with one product (spec 2.3850/2.3800/2.3750 on a 2.3800 block)
/// and one idle machine
pub fn setup_shop() -> TempDir {
    let tmp = setup_test_project();
    run_ok(
        &tmp,
        &[
            "product",
            "new",
            SKU,
            "--reference-block",
            "2.38",
            "--processed-height",
            "2.385,2.38,2.375",
        ],
    );
    run_ok(&tmp, &["machine", "add", MACHINE]);
    tmp
}

/// Start `batch` and take it through loading sheet and preflight checklist
pub fn start_ready_batch(tmp: &TempDir, batch: &str) {
    run_ok(tmp, &["batch", "start", batch, "--sku", SKU, "--machine", MACHINE]);
    run_ok(
        tmp,
        &[
            "batch",
            "loading-sheet",
            MACHINE,
            "--operator",
            OPERATOR,
            "--coil",
            "2.381:0.012",
            "--coil",
            "2.379:0.012",
        ],
    );
    run_ok(tmp, &["batch", "checklist", MACHINE, "--all"]);
}

/// Record a test sheet with the given readings
pub fn record_test(tmp: &TempDir, test_type: &str, top: &str, bottom: &str) -> assert_cmd::assert::Assert {
    let mut args = vec![
        "batch",
        "test",
        MACHINE,
        "--type",
        test_type,
        "--operator",
        OPERATOR,
        "--top",
        top,
        "--bottom",
        bottom,
    ];
    if test_type == "initial" {
        args.extend(["--tooth-profile", "--index-tooth"]);
    }
    coilqc().current_dir(tmp.path()).args(&args).assert()
}

/// Run a batch through every step to completion
pub fn complete_batch(tmp: &TempDir, batch: &str) {
    start_ready_batch(tmp, batch);
    record_test(tmp, "initial", "0,0.001,-0.001", "0,0,0").success();
    record_test(tmp, "final", "0.001,0,0", "-0.001,0,0.001").success();
    run_ok(tmp, &["batch", "final-checklist", MACHINE, "--all"]);
}
