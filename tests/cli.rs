use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DB: &str = "\
- name: 10k resistor
  matches:
  - symbol: ^R$
    footprint: ^0805$
  vendor:
    farnell: 123-456

- name: M3 screw
  ignore: true
  matches:
  - symbol: ^MountingHole$
";

const HEADER: &str = "Id,Designator,Package,Quantity,Designation,Supplier and ref\n";

/// Writes a database and a BOM with the given rows into a fresh directory.
fn workspace(rows: &str) -> TempDir {
    let dir = TempDir::new().expect("Creating temp dir failed");
    fs::write(dir.path().join("parts.yaml"), DB).expect("Writing database failed");
    fs::write(dir.path().join("bom.csv"), format!("{}{}", HEADER, rows)).expect("Writing BOM failed");
    dir
}

fn partsy(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("partsy").expect("Binary exists");
    cmd.current_dir(dir.path())
        .env("PARTSY_DB", "parts.yaml")
        .env_remove("PARTSY_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn lookup_batch_writes_multiplied_order_sheet() {
    let dir = workspace("1,\"R1 R2\",0805,5,R,\n2,H1,M3,4,MountingHole,\n");

    partsy(&dir)
        .args(["lookup", "-i", "bom.csv", "-m", "2"])
        .assert()
        .success()
        .stdout("Part Number,Quantity\n123-456,10\n")
        .stderr(predicate::str::contains("2 matched (1 ignored)"));
}

#[test]
fn lookup_reads_stdin_and_writes_file() {
    let dir = workspace("");

    partsy(&dir)
        .args(["lookup", "-o", "order.csv"])
        .write_stdin(format!("{}1,R1,0805,3,R,\n", HEADER))
        .assert()
        .success()
        .stdout("");

    let out = fs::read_to_string(dir.path().join("order.csv")).unwrap();
    assert_eq!(out, "Part Number,Quantity\n123-456,3\n");
}

#[test]
fn lookup_batch_unmatched_fails_after_listing_all() {
    let dir = workspace("1,C1,0805,1,C,\n2,R1,0805,1,R,\n3,U1,SOIC-8,1,LM358,\n");

    partsy(&dir)
        .args(["lookup", "-i", "bom.csv"])
        .assert()
        .failure()
        .stdout("")
        .stderr(
            predicate::str::contains("Not matched: Item(designator=\"C1\"")
                .and(predicate::str::contains("Not matched: Item(designator=\"U1\""))
                .and(predicate::str::contains("2 item(s) could not be matched")),
        );
}

#[test]
fn lookup_undetectable_input_fails() {
    let dir = workspace("");
    fs::write(dir.path().join("bom.csv"), "Ref,Value,Footprint\nR1,10k,0805\n").unwrap();

    partsy(&dir)
        .args(["lookup", "-i", "bom.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot determine input format"));
}

#[test]
fn lookup_unknown_default_vendor_fails() {
    let dir = workspace("1,R1,0805,1,R,\n");

    partsy(&dir)
        .args(["lookup", "-i", "bom.csv", "-d", "digikey"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown default vendor `digikey`"));
}

#[test]
fn lookup_bad_database_fails_before_reading_items() {
    let dir = workspace("1,R1,0805,1,R,\n");
    fs::write(dir.path().join("parts.yaml"), "- name: x\n  colour: red\n").unwrap();

    partsy(&dir)
        .args(["lookup", "-i", "bom.csv"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("database record 0: field `colour`"));
}

#[test]
fn vendor_unknown_name_fails() {
    let dir = workspace("");

    partsy(&dir)
        .args(["vendor", "digikey", "123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown vendor `digikey`"));
}
