//! Integration tests for the medkit binary.
//!
//! These tests verify end-to-end behavior including:
//! - Prescription import and reminder generation
//! - Taking doses and restocking
//! - Day rollover
//! - Extraction requests and pharmacy lookup

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PRESCRIPTION: &str = r#"{"medicines": [
    {"name": "Metformin", "dosage": "500mg", "timing": "1-0-1"},
    {"name": "Atorvastatin", "dosage": "10mg", "timing": "at night"}
]}"#;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli_on(data_dir: &Path, today: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medkit"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--today")
        .arg(today);
    cmd
}

fn cli(data_dir: &Path) -> Command {
    cli_on(data_dir, "2024-05-01")
}

fn import_prescription(data_dir: &Path) {
    let response = data_dir.join("prescription.json");
    fs::write(&response, PRESCRIPTION).unwrap();
    cli(data_dir).arg("import").arg(&response).assert().success();
}

fn read_inventory(data_dir: &Path) -> serde_json::Value {
    let contents = fs::read_to_string(data_dir.join("inventory.json")).expect("no inventory");
    serde_json::from_str(&contents).expect("inventory is not JSON")
}

fn reminder_ids(data_dir: &Path) -> Vec<String> {
    read_inventory(data_dir)["reminders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

fn quantity_of(data_dir: &Path, name: &str) -> u64 {
    read_inventory(data_dir)["medicines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == name)
        .and_then(|m| m["quantity"].as_u64())
        .unwrap()
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("medkit"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Medicine inventory and dose reminders"));
}

#[test]
fn test_default_command_on_empty_inventory() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No reminders for today."));

    // Reading never writes
    assert!(!temp_dir.path().join("inventory.json").exists());
}

#[test]
fn test_import_creates_medicines_and_reminders() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    let inventory = read_inventory(temp_dir.path());
    assert_eq!(inventory["medicines"].as_array().unwrap().len(), 2);
    assert_eq!(inventory["reminders"].as_array().unwrap().len(), 3);
    assert_eq!(inventory["last_visit"], "2024-05-01");

    cli(temp_dir.path())
        .arg("today")
        .assert()
        .success()
        .stdout(predicate::str::contains("Metformin"))
        .stdout(predicate::str::contains("Atorvastatin"))
        .stdout(predicate::str::contains("8:00 PM"));
}

#[test]
fn test_import_twice_does_not_duplicate() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    let response = temp_dir.path().join("prescription.json");
    cli(temp_dir.path())
        .arg("import")
        .arg(&response)
        .assert()
        .success()
        .stdout(predicate::str::contains("already in your inventory"));

    let inventory = read_inventory(temp_dir.path());
    assert_eq!(inventory["medicines"].as_array().unwrap().len(), 2);
}

#[test]
fn test_malformed_import_changes_nothing() {
    let temp_dir = setup_test_dir();
    let response = temp_dir.path().join("bad.json");
    fs::write(&response, r#"{"medicines": [{"name": "Metformin"}]}"#).unwrap();

    cli(temp_dir.path())
        .arg("import")
        .arg(&response)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not analyze the prescription"));

    assert!(!temp_dir.path().join("inventory.json").exists());
}

#[test]
fn test_restock_known_medicine() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    cli(temp_dir.path())
        .args(["restock", "metformin", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30 units of Metformin added"));

    assert_eq!(quantity_of(temp_dir.path(), "Metformin"), 30);
}

#[test]
fn test_restock_unknown_medicine_fails() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());
    let before = fs::read_to_string(temp_dir.path().join("inventory.json")).unwrap();

    cli(temp_dir.path())
        .args(["restock", "Ibuprofen", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find Ibuprofen"));

    let after = fs::read_to_string(temp_dir.path().join("inventory.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_take_dose_once() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());
    cli(temp_dir.path())
        .args(["restock", "Metformin", "10"])
        .assert()
        .success();

    let metformin_morning = reminder_ids(temp_dir.path())
        .into_iter()
        .find(|id| id.ends_with("-morning"))
        .unwrap();

    cli(temp_dir.path())
        .arg("take")
        .arg(&metformin_morning)
        .assert()
        .success()
        .stdout(predicate::str::contains("Metformin (Morning) taken, 9 left"));

    cli(temp_dir.path())
        .arg("take")
        .arg(&metformin_morning)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"));

    assert_eq!(quantity_of(temp_dir.path(), "Metformin"), 9);
}

#[test]
fn test_take_dose_with_empty_stock_stays_at_zero() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    for id in reminder_ids(temp_dir.path()) {
        cli(temp_dir.path()).arg("take").arg(&id).assert().success();
    }

    assert_eq!(quantity_of(temp_dir.path(), "Metformin"), 0);
    assert_eq!(quantity_of(temp_dir.path(), "Atorvastatin"), 0);
}

#[test]
fn test_new_day_resets_taken_flags() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    for id in reminder_ids(temp_dir.path()) {
        cli(temp_dir.path()).arg("take").arg(&id).assert().success();
    }
    cli(temp_dir.path())
        .arg("today")
        .assert()
        .success()
        .stdout(predicate::str::contains("[✓]"));

    cli_on(temp_dir.path(), "2024-05-02")
        .arg("today")
        .assert()
        .success()
        .stdout(predicate::str::contains("Metformin"))
        .stdout(predicate::str::contains("[✓]").not());
}

#[test]
fn test_inventory_shows_stock_status() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());
    cli(temp_dir.path())
        .args(["restock", "Atorvastatin", "20"])
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("inventory")
        .assert()
        .success()
        .stdout(predicate::str::contains("In Stock"))
        .stdout(predicate::str::contains("Out of Stock"))
        .stdout(predicate::str::contains("Refill soon: Metformin\n"));
}

#[test]
fn test_scan_known_medicine_adds_default_amount() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    let response = temp_dir.path().join("pill.json");
    fs::write(
        &response,
        r#"{"medicineName": "Metformin", "usage": "Type 2 diabetes.", "isNewMedicine": true}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("scan")
        .arg(&response)
        .assert()
        .success()
        .stdout(predicate::str::contains("30 units of Metformin added"));

    assert_eq!(quantity_of(temp_dir.path(), "Metformin"), 30);
}

#[test]
fn test_scan_new_medicine_fails() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());

    let response = temp_dir.path().join("pill.json");
    fs::write(
        &response,
        r#"{"medicineName": "Cetirizine", "usage": "Allergies.", "isNewMedicine": false}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("scan")
        .arg(&response)
        .args(["--amount", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import a prescription for it first"));
}

#[test]
fn test_request_prescription_body() {
    let temp_dir = setup_test_dir();
    let image = temp_dir.path().join("prescription.png");
    fs::write(&image, b"hello").unwrap();

    let output = cli(temp_dir.path())
        .arg("request")
        .arg("prescription")
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["prescriptionImage"], "data:image/png;base64,aGVsbG8=");
}

#[test]
fn test_request_pill_lists_inventory() {
    let temp_dir = setup_test_dir();
    import_prescription(temp_dir.path());
    let image = temp_dir.path().join("box.jpg");
    fs::write(&image, [1u8, 2, 3]).unwrap();

    let output = cli(temp_dir.path())
        .arg("request")
        .arg("pill")
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["photoDataUri"], "data:image/jpeg;base64,AQID");
    assert_eq!(body["existingMedicines"][0], "Metformin");
    assert_eq!(body["existingMedicines"][1], "Atorvastatin");
}

#[test]
fn test_pharmacies_nearest_first_within_radius() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("pharmacies.csv"),
        "id,name,latitude,longitude\n\
         p1,Far Away Chemist,0.0,1.0\n\
         p2,Next Door Pharmacy,0.0,0.0\n",
    )
    .unwrap();

    cli(temp_dir.path())
        .args(["pharmacies", "--lat", "0", "--lng", "0", "--radius", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next Door Pharmacy"))
        .stdout(predicate::str::contains("Far Away Chemist").not());

    let output = cli(temp_dir.path())
        .args(["pharmacies", "--lat", "0", "--lng", "0", "--radius", "200"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let near = stdout.find("Next Door Pharmacy").unwrap();
    let far = stdout.find("Far Away Chemist").unwrap();
    assert!(near < far);
    assert!(stdout.contains("https://www.google.com/maps/dir/"));
}

#[test]
fn test_pharmacies_rejects_bad_coordinates() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["pharmacies", "--lat", "123", "--lng", "0"])
        .assert()
        .failure();
}
