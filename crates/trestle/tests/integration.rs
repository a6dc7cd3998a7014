//! End-to-end CLI integration tests for the `trestle` binary.
//!
//! Each test writes its own fixture documents into a temporary directory
//! and exercises the binary as a subprocess via `assert_cmd`.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `Command` targeting the cargo-built `trestle` binary.
fn trestle() -> Command {
    Command::cargo_bin("trestle").unwrap()
}

const MODEL_JSON: &str = r#"{
    "modules": [{
        "name": "Portal",
        "entities": [
            {
                "logicalName": "Customer",
                "physicalName": "OSUSR_ABC_CUSTOMER",
                "isStatic": true,
                "attributes": [
                    {"logicalName": "Id", "physicalName": "ID", "dataType": "long",
                     "isIdentifier": true, "isMandatory": true,
                     "onDisk": {"isNullable": false, "sqlType": "bigint", "isIdentity": true}},
                    {"logicalName": "Name", "physicalName": "NAME", "dataType": "text",
                     "length": 100, "isMandatory": true,
                     "onDisk": {"isNullable": true, "sqlType": "nvarchar", "maxLength": 100}}
                ],
                "indexes": [
                    {"name": "OSIDX_OSUSR_ABC_CUSTOMER_NAME", "isUnique": true,
                     "columns": [{"column": "NAME", "ordinal": 1}]}
                ]
            },
            {
                "logicalName": "Order",
                "physicalName": "OSUSR_ABC_ORDER",
                "attributes": [
                    {"logicalName": "Id", "physicalName": "ID", "dataType": "long",
                     "isIdentifier": true, "isMandatory": true,
                     "onDisk": {"isNullable": false, "sqlType": "bigint", "isIdentity": true}},
                    {"logicalName": "CustomerId", "physicalName": "CUSTOMERID",
                     "dataType": "long", "isMandatory": true,
                     "reference": {"targetEntity": "Customer"},
                     "onDisk": {"isNullable": false, "sqlType": "bigint"}}
                ],
                "relationships": [{
                    "viaAttribute": "CustomerId",
                    "targetEntity": "Customer",
                    "deleteRule": "Protect",
                    "hasDatabaseConstraint": true,
                    "actualConstraints": [{
                        "name": "OSFRK_OSUSR_ABC_ORDER_OSUSR_ABC_CUSTOMER_CUSTOMERID",
                        "referencedSchema": "dbo",
                        "referencedTable": "OSUSR_ABC_CUSTOMER",
                        "columns": [{"owningColumn": "CUSTOMERID",
                                     "referencedColumn": "ID", "ordinal": 1}]
                    }]
                }]
            }
        ]
    }]
}"#;

const PROFILE_JSON: &str = r#"{
    "columns": [
        {"schema": "dbo", "table": "OSUSR_ABC_CUSTOMER", "column": "NAME",
         "rowCount": 500, "nullCount": 0}
    ],
    "uniqueCandidates": [
        {"schema": "dbo", "table": "OSUSR_ABC_CUSTOMER", "columns": ["NAME"],
         "hasDuplicates": false}
    ],
    "foreignKeys": [
        {"schema": "dbo", "table": "OSUSR_ABC_ORDER", "column": "CUSTOMERID",
         "orphanCount": 0}
    ]
}"#;

const DATASET_JSON: &str = r#"{
    "tables": [
        {
            "definition": {
                "module": "Portal", "logicalName": "Child", "schema": "dbo",
                "physicalName": "CHILD", "effectiveName": "CHILD",
                "columns": [
                    {"logicalName": "Id", "storageColumnName": "ID", "emissionName": "ID",
                     "dataType": "bigint", "isPrimaryKey": true, "isNullable": false},
                    {"logicalName": "ParentId", "storageColumnName": "PARENTID",
                     "emissionName": "PARENTID", "dataType": "bigint", "isNullable": false}
                ]
            },
            "rows": [[2, 1]]
        },
        {
            "definition": {
                "module": "Portal", "logicalName": "Parent", "schema": "dbo",
                "physicalName": "PARENT", "effectiveName": "PARENT",
                "columns": [
                    {"logicalName": "Id", "storageColumnName": "ID", "emissionName": "ID",
                     "dataType": "bigint", "isPrimaryKey": true, "isNullable": false}
                ]
            },
            "rows": [[1]]
        }
    ]
}"#;

const SEED_MODEL_JSON: &str = r#"{
    "modules": [{
        "name": "Portal",
        "entities": [
            {
                "logicalName": "Child", "physicalName": "CHILD", "isStatic": true,
                "attributes": [
                    {"logicalName": "Id", "physicalName": "ID", "dataType": "long",
                     "isIdentifier": true, "isMandatory": true},
                    {"logicalName": "ParentId", "physicalName": "PARENTID",
                     "dataType": "long", "isMandatory": true,
                     "reference": {"targetEntity": "Parent"}}
                ],
                "relationships": [{
                    "viaAttribute": "ParentId",
                    "targetEntity": "Parent",
                    "hasDatabaseConstraint": true,
                    "actualConstraints": [{
                        "referencedSchema": "dbo",
                        "referencedTable": "PARENT",
                        "columns": [{"owningColumn": "PARENTID",
                                     "referencedColumn": "ID", "ordinal": 1}]
                    }]
                }]
            },
            {
                "logicalName": "Parent", "physicalName": "PARENT", "isStatic": true,
                "attributes": [
                    {"logicalName": "Id", "physicalName": "ID", "dataType": "long",
                     "isIdentifier": true, "isMandatory": true}
                ]
            }
        ]
    }]
}"#;

struct Fixture {
    tmp: TempDir,
    model: PathBuf,
    profile: PathBuf,
    out: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let model = tmp.path().join("model.json");
    let profile = tmp.path().join("profile.json");
    let out = tmp.path().join("out");
    fs::write(&model, MODEL_JSON).unwrap();
    fs::write(&profile, PROFILE_JSON).unwrap();
    Fixture {
        tmp,
        model,
        profile,
        out,
    }
}

fn emit(fixture: &Fixture, extra_args: &[&str]) -> assert_cmd::assert::Assert {
    let mut args = vec![
        "emit".to_owned(),
        "--model".to_owned(),
        fixture.model.display().to_string(),
        "--profile".to_owned(),
        fixture.profile.display().to_string(),
        "--out".to_owned(),
        fixture.out.display().to_string(),
    ];
    args.extend(extra_args.iter().map(|s| s.to_string()));
    trestle().args(&args).assert()
}

/// Recursively collects `(relative path, contents)` for every file under `root`.
fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, acc: &mut Vec<(String, Vec<u8>)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, acc);
            } else {
                let rel = path.strip_prefix(base).unwrap().display().to_string();
                acc.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    let mut acc = Vec::new();
    walk(root, root, &mut acc);
    acc.sort();
    acc
}

// ---------------------------------------------------------------------------
// Flow 1: emit end-to-end
// ---------------------------------------------------------------------------

#[test]
fn emit_writes_tables_and_manifest() {
    let f = fixture();
    emit(&f, &[])
        .success()
        .stdout(predicate::str::contains("2 tables emitted"));

    let customer = f
        .out
        .join("Modules/Portal/Tables/dbo.OSUSR_ABC_CUSTOMER.sql");
    let order = f.out.join("Modules/Portal/Tables/dbo.OSUSR_ABC_ORDER.sql");
    assert!(customer.exists());
    assert!(order.exists());

    let customer_sql = fs::read_to_string(&customer).unwrap();
    assert!(customer_sql.contains("CREATE TABLE [dbo].[OSUSR_ABC_CUSTOMER] ("));
    assert!(customer_sql.contains("[NAME] NVARCHAR(100) NOT NULL"));
    assert!(customer_sql.contains("CREATE UNIQUE INDEX [OSIDX_OSUSR_ABC_CUSTOMER_NAME]"));

    let order_sql = fs::read_to_string(&order).unwrap();
    assert!(order_sql.contains("FOREIGN KEY ([CUSTOMERID]) REFERENCES [dbo].[OSUSR_ABC_CUSTOMER] ([ID])"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(f.out.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["tables"].as_array().unwrap().len(), 2);
    assert_eq!(manifest["metadata"]["fingerprintAlgorithm"], "SHA-256");
    assert_eq!(
        manifest["policySummary"]["foreignKeysCreated"].as_u64(),
        Some(1)
    );
}

#[test]
fn second_run_is_idempotent_and_byte_identical() {
    let f = fixture();
    emit(&f, &[]).success();
    let first = read_tree(&f.out);

    emit(&f, &[])
        .success()
        .stdout(predicate::str::contains("0 files written"));
    let second = read_tree(&f.out);

    assert_eq!(first.len(), second.len());
    for ((path_a, bytes_a), (path_b, bytes_b)) in first.iter().zip(second.iter()) {
        assert_eq!(path_a, path_b);
        assert_eq!(bytes_a, bytes_b, "bytes changed for {path_a}");
    }
}

// ---------------------------------------------------------------------------
// Flow 2: naming overrides rewrite every artifact
// ---------------------------------------------------------------------------

#[test]
fn naming_override_leaves_no_trace_of_old_name() {
    let f = fixture();
    let config = f.tmp.path().join("config.json");
    fs::write(
        &config,
        r#"{"emission": {"namingOverrides": [
            {"schema": "dbo", "table": "OSUSR_ABC_CUSTOMER", "target": "CUSTOMER_PORTAL"}
        ]}}"#,
    )
    .unwrap();

    emit(&f, &["--config", &config.display().to_string()]).success();

    let renamed = f.out.join("Modules/Portal/Tables/dbo.CUSTOMER_PORTAL.sql");
    assert!(renamed.exists());
    assert!(!f
        .out
        .join("Modules/Portal/Tables/dbo.OSUSR_ABC_CUSTOMER.sql")
        .exists());

    for (path, bytes) in read_tree(&f.out) {
        // The manifest snapshots the override rules themselves; the check is
        // about SQL artifacts.
        if !path.ends_with(".sql") {
            continue;
        }
        let text = String::from_utf8_lossy(&bytes);
        // The header's RenamedFrom provenance line is the only place the old
        // name may appear.
        for line in text.lines() {
            if line.trim_start().starts_with("RenamedFrom:") {
                continue;
            }
            assert!(
                !line.contains("OSUSR_ABC_CUSTOMER"),
                "old physical name leaked into {path}: {line}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Flow 3: seed script generation
// ---------------------------------------------------------------------------

#[test]
fn seed_orders_parent_before_child() {
    let tmp = TempDir::new().unwrap();
    let model = tmp.path().join("model.json");
    let data = tmp.path().join("seed.json");
    let out = tmp.path().join("out");
    fs::write(&model, SEED_MODEL_JSON).unwrap();
    fs::write(&data, DATASET_JSON).unwrap();

    trestle()
        .args([
            "seed",
            "--model",
            &model.display().to_string(),
            "--seed-data",
            &data.display().to_string(),
            "--out",
            &out.display().to_string(),
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"requiresPhasing\":false"));

    let script = fs::read_to_string(out.join("Seeds/StaticEntities.sql")).unwrap();
    let parent = script.find("MERGE INTO [dbo].[PARENT]").unwrap();
    let child = script.find("MERGE INTO [dbo].[CHILD]").unwrap();
    assert!(parent < child);
    assert!(!script.contains("PhaseOneSource"));
    assert!(script.ends_with('\n'));
}

// ---------------------------------------------------------------------------
// Flow 4: preflight reporting
// ---------------------------------------------------------------------------

#[test]
fn preflight_reports_clean_dataset() {
    let tmp = TempDir::new().unwrap();
    let model = tmp.path().join("model.json");
    let data = tmp.path().join("seed.json");
    fs::write(&model, SEED_MODEL_JSON).unwrap();
    fs::write(&data, DATASET_JSON).unwrap();

    trestle()
        .args([
            "preflight",
            "--model",
            &model.display().to_string(),
            "--seed-data",
            &data.display().to_string(),
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"findings\": []"));
}

// ---------------------------------------------------------------------------
// Flow 5: structured error reporting
// ---------------------------------------------------------------------------

#[test]
fn duplicate_physical_names_fail_with_code() {
    let tmp = TempDir::new().unwrap();
    let model = tmp.path().join("model.json");
    fs::write(
        &model,
        r#"{"modules": [{"name": "M", "entities": [
            {"logicalName": "A", "physicalName": "SAME",
             "attributes": [{"logicalName": "Id", "physicalName": "ID",
                             "dataType": "long", "isIdentifier": true}]},
            {"logicalName": "B", "physicalName": "SAME",
             "attributes": [{"logicalName": "Id", "physicalName": "ID",
                             "dataType": "long", "isIdentifier": true}]}
        ]}]}"#,
    )
    .unwrap();
    let out = tmp.path().join("out");

    trestle()
        .args([
            "emit",
            "--model",
            &model.display().to_string(),
            "--out",
            &out.display().to_string(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("model.invariant:"));

    assert!(!out.join("manifest.json").exists(), "manifest must not be written on failure");
}

#[test]
fn dry_run_writes_nothing() {
    let f = fixture();
    emit(&f, &["--dry-run"])
        .success()
        .stdout(predicate::str::contains("dry run:"));
    assert!(!f.out.exists());
}
