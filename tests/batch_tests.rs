//! Batch workflow tests through the CLI

mod common;

use common::{
    coilqc, complete_batch, record_test, run_ok, setup_shop, setup_test_project,
    start_ready_batch, MACHINE, OPERATOR, SKU,
};
use predicates::prelude::*;

// ============================================================================
// Full Workflow Test
// ============================================================================

#[test]
fn test_full_batch_workflow() {
    let tmp = setup_shop();

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "start", "B-1001", "--sku", SKU, "--machine", MACHINE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started batch B-1001"))
        .stdout(predicate::str::contains("Loading sheet"));

    coilqc()
        .current_dir(tmp.path())
        .args([
            "batch",
            "loading-sheet",
            MACHINE,
            "--operator",
            OPERATOR,
            "--coil",
            "2.381:0.012",
            "--coil",
            "2.379:0.012",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 coil(s)"))
        .stdout(predicate::str::contains("Max height difference: 0.0020"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "checklist", MACHINE, "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preflight checklist complete"));

    record_test(&tmp, "initial", "0,0.001,-0.001", "0,0,0")
        .success()
        .stdout(predicate::str::contains("PASS"));

    record_test(&tmp, "regular", "0,0,0", "0,0,0").success();

    record_test(&tmp, "final", "0.001,0,0", "0,0,0").success();

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "final-checklist", MACHINE, "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    coilqc()
        .current_dir(tmp.path())
        .args(["machine", "show", MACHINE, "-o", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("idle"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list", "--state", "completed", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_batch_documents_written_to_project() {
    let tmp = setup_shop();
    complete_batch(&tmp, "B-1");

    assert!(tmp.path().join("batches/B-1.yaml").exists());
    assert!(tmp.path().join("machines").join(format!("{}.yaml", MACHINE)).exists());

    let content = std::fs::read_to_string(tmp.path().join("batches/B-1.yaml")).unwrap();
    assert!(content.contains("is_active: false"));
    assert!(content.contains("completed_at"));
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_step_out_of_order_rejected() {
    let tmp = setup_shop();
    run_ok(&tmp, &["batch", "start", "B-1", "--sku", SKU, "--machine", MACHINE]);

    // Preflight before loading sheet
    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "checklist", MACHINE, "--all"])
        .assert()
        .failure();

    // Final test before initial test
    run_ok(
        &tmp,
        &["batch", "loading-sheet", MACHINE, "-O", OPERATOR, "--coil", "2.38:0.01"],
    );
    run_ok(&tmp, &["batch", "checklist", MACHINE, "--all"]);
    record_test(&tmp, "final", "0,0,0", "0,0,0").failure();
}

#[test]
fn test_repeated_step_rejected() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "checklist", MACHINE, "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already complete"));
}

#[test]
fn test_regular_test_requires_initial_test() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    record_test(&tmp, "regular", "0,0,0", "0,0,0")
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn test_next_reports_pending_step() {
    let tmp = setup_shop();

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "next", MACHINE])
        .assert()
        .success()
        .stdout(predicate::str::contains("idle"));

    start_ready_batch(&tmp, "B-1");

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "next", MACHINE])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch test --type initial"));
}

// ============================================================================
// Machines
// ============================================================================

#[test]
fn test_busy_machine_rejects_second_batch() {
    let tmp = setup_shop();
    run_ok(&tmp, &["batch", "start", "B-1", "--sku", SKU, "--machine", MACHINE]);

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "start", "B-2", "--sku", SKU, "--machine", MACHINE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is running batch B-1"));
}

#[test]
fn test_duplicate_batch_number_rejected() {
    let tmp = setup_shop();
    run_ok(&tmp, &["machine", "add", "Dakin-2"]);
    run_ok(&tmp, &["batch", "start", "B-1", "--sku", SKU, "--machine", MACHINE]);

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "start", "B-1", "--sku", SKU, "--machine", "Dakin-2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_unknown_machine() {
    let tmp = setup_shop();
    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "start", "B-1", "--sku", SKU, "--machine", "Nope"])
        .assert()
        .failure();
}

#[test]
fn test_clear_returns_machine_to_idle() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "clear", MACHINE, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared batch B-1"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list", "--state", "cleared", "--count"])
        .assert()
        .success()
        .stdout("1\n");

    // Machine is free again
    run_ok(&tmp, &["batch", "start", "B-2", "--sku", SKU, "--machine", MACHINE]);
}

#[test]
fn test_clear_idle_machine() {
    let tmp = setup_shop();
    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "clear", MACHINE, "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already idle"));
}

// ============================================================================
// Test sheets
// ============================================================================

#[test]
fn test_out_of_spec_reading_fails_but_advances() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    // 2.38 + 0.006 is above USL
    record_test(&tmp, "initial", "0.006,0,0", "0,0,0")
        .success()
        .stdout(predicate::str::contains("FAIL"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "next", MACHINE])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch test --type final"));
}

#[test]
fn test_initial_test_needs_microscope_checks() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    coilqc()
        .current_dir(tmp.path())
        .args([
            "batch", "test", MACHINE, "--type", "initial", "-O", OPERATOR, "--top", "0,0,0",
            "--bottom", "0,0,0", "--tooth-profile",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_missing_reading_fails_test() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    record_test(&tmp, "initial", "0,,0", "0,0,0")
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_wrong_reading_count_rejected() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    record_test(&tmp, "initial", "0,0", "0,0,0")
        .failure()
        .stderr(predicate::str::contains("Expected 3 readings"));
}

#[test]
fn test_non_numeric_reading_rejected() {
    let tmp = setup_shop();
    start_ready_batch(&tmp, "B-1");

    record_test(&tmp, "initial", "0,abc,0", "0,0,0")
        .failure()
        .stderr(predicate::str::contains("not a number"));
}

#[test]
fn test_checklist_requires_flags_when_not_interactive() {
    let tmp = setup_shop();
    run_ok(&tmp, &["batch", "start", "B-1", "--sku", SKU, "--machine", MACHINE]);
    run_ok(
        &tmp,
        &["batch", "loading-sheet", MACHINE, "-O", OPERATOR, "--coil", "2.38:0.01"],
    );

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "checklist", MACHINE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--all"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "checklist", MACHINE, "--check", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown preflight checklist item"));
}

#[test]
fn test_bad_coil_reading_rejected() {
    let tmp = setup_shop();
    run_ok(&tmp, &["batch", "start", "B-1", "--sku", SKU, "--machine", MACHINE]);

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "loading-sheet", MACHINE, "-O", OPERATOR, "--coil", "2.38"])
        .assert()
        .failure();
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_batch_show_and_list_formats() {
    let tmp = setup_shop();
    complete_batch(&tmp, "B-1");

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "show", "B-1", "-o", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State:   completed"))
        .stdout(predicate::str::contains("initial"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "show", "B-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch_number: B-1"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list", "-o", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("batch_number,sku,machine,state"));

    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"batch_number\": \"B-1\""));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = tempfile::TempDir::new().unwrap();
    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coilqc init"));
}

#[test]
fn test_empty_project_lists() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["batch", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No batches found."));
}
