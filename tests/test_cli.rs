// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

#[cfg(test)]
extern crate assert_cmd;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use std::fs;
use std::path::Path;
use std::process::Command;

const WELL_KNOWN_VARS: [&str; 8] = [
    "SUPABASE_URL",
    "SUPABASE_SERVICE_ROLE_KEY",
    "AMADEUS_API_KEY",
    "AMADEUS_API_SECRET",
    "PAYMENT_KEY_ID",
    "PAYMENT_KEY_SECRET",
    "FIREBASE_API_KEY",
    "FIREBASE_PROJECT_ID",
];

/// The binary, with `--config` pointing at a file holding `contents` and no
/// credentials leaking in from the calling environment.
fn tripcheck(dir: &TempDir, contents: &str) -> Command {
    let config_path = dir.path().join("tripcheck.toml");
    fs::write(&config_path, contents).unwrap();

    let mut cmd = Command::cargo_bin("tripcheck").expect("Calling binary failed");
    for var in WELL_KNOWN_VARS.iter() {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config_path);
    cmd
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_cli() {
    let mut cmd = Command::cargo_bin("tripcheck").expect("Calling binary failed");
    cmd.assert().failure();
}

#[test]
fn test_copy_assets() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("dist");
    let destination = dir.path().join("public");
    write_file(&source.join("index.html"), "<html></html>");
    write_file(&source.join("app.js"), "console.log(1)");
    write_file(&source.join("img/logo.svg"), "<svg/>");
    write_file(&source.join("img/.DS_Store"), "junk");

    tripcheck(&dir, "[assets]\nexclude = [\"index.html\"]\n")
        .arg("copy-assets")
        .arg(&source)
        .arg(&destination)
        .args(&["-x", ".DS_Store", "--verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 2 files"))
        .stdout(predicate::str::contains("Verified"));

    assert_eq!(
        fs::read_to_string(destination.join("app.js")).unwrap(),
        "console.log(1)"
    );
    assert!(destination.join("img/logo.svg").is_file());
    assert!(!destination.join("index.html").exists());
    assert!(!destination.join("img/.DS_Store").exists());
}

#[test]
fn test_copy_assets_missing_source() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("public");

    tripcheck(&dir, "")
        .arg("copy-assets")
        .arg(dir.path().join("dist"))
        .arg(&destination)
        .assert()
        .success()
        .stdout(predicate::str::contains("does not exist"));

    assert!(!destination.exists());
}

#[test]
fn test_check_env_lists_missing_credentials() {
    let dir = TempDir::new().unwrap();

    tripcheck(&dir, "[supabase]\nurl = \"https://abcdefgh.supabase.co\"\n")
        .args(&["check-env", "database", "payments"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("https://abcdefgh.supabase.co"))
        .stdout(predicate::str::contains("MISSING"))
        .stderr(predicate::str::contains(
            "Missing credentials: supabase.service_role_key, payments.key_id, payments.key_secret",
        ));
}

#[test]
fn test_config_masks_secrets() {
    let dir = TempDir::new().unwrap();

    tripcheck(
        &dir,
        "[payments]\nkey_id = \"rzp_test_abc\"\nkey_secret = \"supersecret\"\n",
    )
    .arg("config")
    .assert()
    .success()
    .stdout(predicate::str::contains("supe****"))
    .stdout(predicate::str::contains("supersecret").not());
}
