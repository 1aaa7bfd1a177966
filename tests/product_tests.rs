//! Project, product and machine command tests

mod common;

use common::{coilqc, run_ok, setup_shop, setup_test_project, MACHINE, SKU};
use predicates::prelude::*;

#[test]
fn test_init_creates_project() {
    let tmp = tempfile::TempDir::new().unwrap();
    coilqc()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized coilqc project"));

    assert!(tmp.path().join(".coilqc/config.yaml").exists());
    assert!(tmp.path().join("products").is_dir());
}

#[test]
fn test_init_twice_needs_force() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure();

    coilqc()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_commands_work_from_subdirectory() {
    let tmp = setup_shop();
    let sub = tmp.path().join("notes/today");
    std::fs::create_dir_all(&sub).unwrap();

    coilqc()
        .current_dir(&sub)
        .args(["product", "list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

// ============================================================================
// Products
// ============================================================================

#[test]
fn test_product_new_and_show() {
    let tmp = setup_shop();

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "show", SKU, "-o", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference block: 2.3800"))
        .stdout(predicate::str::contains("2.3850"));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "show", SKU, "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reference_block\": 2.38"));
}

#[test]
fn test_product_duplicate_needs_force() {
    let tmp = setup_shop();

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", SKU])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", SKU, "--force", "--block-name", "Block 7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated product"));

    // Unspecified fields are kept on update
    coilqc()
        .current_dir(tmp.path())
        .args(["product", "show", SKU, "-o", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.3800 (Block 7)"));
}

#[test]
fn test_product_narrow_tolerance_warns() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args([
            "product",
            "new",
            "TIGHT",
            "--reference-block",
            "1.0",
            "--processed-height",
            "1.0005,1.0,0.9995",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("leaves no good zone"));
}

#[test]
fn test_product_without_reference_block_warns() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", "BARE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reference block set"));
}

#[test]
fn test_product_invalid_limits_rejected() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", "BAD", "--processed-height", "2.385,2.38"])
        .assert()
        .failure();
}

#[test]
fn test_product_non_finite_limits_rejected() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", "NAN", "--processed-height", "nan,2.38,2.375"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a finite number"));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "new", "INF", "--reference-block", "inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a finite number"));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_product_list_formats() {
    let tmp = setup_shop();

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(SKU))
        .stdout(predicate::str::contains("1 product(s) found."));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "list", "-o", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sku,reference_block,usl,target,lsl"));

    coilqc()
        .current_dir(tmp.path())
        .args(["product", "list", "-o", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HEIGHT USL"));
}

#[test]
fn test_product_show_unknown() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["product", "show", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOPE"));
}

// ============================================================================
// Machines
// ============================================================================

#[test]
fn test_machine_add_and_list() {
    let tmp = setup_shop();
    run_ok(&tmp, &["machine", "add", "Dakin-2"]);

    coilqc()
        .current_dir(tmp.path())
        .args(["machine", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(MACHINE))
        .stdout(predicate::str::contains("Dakin-2"))
        .stdout(predicate::str::contains("2 machine(s) found."));

    coilqc()
        .current_dir(tmp.path())
        .args(["machine", "list", "--active", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_machine_add_duplicate_rejected() {
    let tmp = setup_shop();
    coilqc()
        .current_dir(tmp.path())
        .args(["machine", "add", MACHINE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_machine_name_with_path_separator_rejected() {
    let tmp = setup_test_project();
    coilqc()
        .current_dir(tmp.path())
        .args(["machine", "add", "../escape"])
        .assert()
        .failure();
}

#[test]
fn test_completions() {
    coilqc()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coilqc"));
}
