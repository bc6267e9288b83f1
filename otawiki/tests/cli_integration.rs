//! Integration tests for otawiki CLI

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn run_otawiki(args: &[&str]) -> (String, String, bool) {
    let mut cmd_args = vec!["run", "-p", "otawiki", "--"];
    cmd_args.extend(args);

    let output = Command::new("cargo")
        .args(&cmd_args)
        .current_dir(env!("CARGO_MANIFEST_DIR").to_string() + "/..")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

/// Write a small two-entry catalog to a unique temp file.
fn write_catalog(name: &str) -> PathBuf {
    let catalog = r#"{
        "Assets": [
            {
                "SupportedDevices": ["iPhone6,1"],
                "Build": "13C75",
                "OSVersion": "9.2",
                "_DownloadSize": 1234567,
                "__BaseURL": "https://mesu.example.com/assets/091-0001.20151208.full/",
                "__RelativePath": "0123456789abcdef0123456789abcdef01234567.zip"
            },
            {
                "SupportedDevices": ["iPhone6,1"],
                "Build": "13C75",
                "OSVersion": "9.2",
                "PrerequisiteBuild": "13A344",
                "PrerequisiteOSVersion": "9.0",
                "_DownloadSize": 234567,
                "__BaseURL": "https://mesu.example.com/assets/091-0002.20151208.delta/",
                "__RelativePath": "89abcdef0123456789abcdef0123456789abcdef.zip"
            }
        ]
    }"#;

    let path = std::env::temp_dir().join(format!("otawiki-test-{name}-{}.json", std::process::id()));
    fs::write(&path, catalog).expect("Failed to write catalog fixture");
    path
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_otawiki(&["--help"]);

    assert!(success);
    assert!(stdout.contains("otawiki"));
    assert!(stdout.contains("--device"));
    assert!(stdout.contains("--wiki"));
    assert!(stdout.contains("--full-table"));
    assert!(stdout.contains("--remove-stubs"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_otawiki(&["--version"]);

    assert!(success);
    assert!(stdout.contains("otawiki"));
}

#[test]
fn test_plain_report() {
    let path = write_catalog("plain");
    let (stdout, _, success) = run_otawiki(&[path.to_str().unwrap(), "-d", "iPhone6,1"]);
    let _ = fs::remove_file(&path);

    assert!(success);
    assert!(stdout.contains("iOS 9.2 (Build 13C75)"));
    assert!(stdout.contains("Requires: Not specified"));
    assert!(stdout.contains("Requires: 9.0 (Build 13A344)"));
}

#[test]
fn test_wiki_markup() {
    let path = write_catalog("wiki");
    let (stdout, _, success) = run_otawiki(&[path.to_str().unwrap(), "-d", "iPhone6,1", "--wiki"]);
    let _ = fs::remove_file(&path);

    assert!(success);
    assert!(stdout.contains("|-\n"));
    assert!(stdout.contains("| rowspan=\"2\" | 9.2"));
    assert!(!stdout.contains("{| class=\"wikitable\""));
}

#[test]
fn test_full_table() {
    let path = write_catalog("full");
    let (stdout, _, success) = run_otawiki(&[
        path.to_str().unwrap(),
        "-d",
        "iPhone6,1",
        "--wiki",
        "--full-table",
    ]);
    let _ = fs::remove_file(&path);

    assert!(success);
    assert!(stdout.starts_with("{| class=\"wikitable\""));
    assert!(stdout.ends_with("|}"));
}

#[test]
fn test_invalid_device_fails() {
    let path = write_catalog("baddevice");
    let (_, stderr, success) = run_otawiki(&[path.to_str().unwrap(), "-d", "Toaster1,1"]);
    let _ = fs::remove_file(&path);

    assert!(!success);
    assert!(stderr.contains("invalid device identifier"));
}

#[test]
fn test_model_required_without_model_fails() {
    let path = write_catalog("nomodel");
    let (_, stderr, success) = run_otawiki(&[path.to_str().unwrap(), "-d", "iPhone8,1"]);
    let _ = fs::remove_file(&path);

    assert!(!success);
    assert!(stderr.contains("requires a model identifier"));
}

#[test]
fn test_missing_catalog_fails() {
    let (_, stderr, success) = run_otawiki(&["/nonexistent/catalog.json", "-d", "iPhone6,1"]);

    assert!(!success);
    assert!(stderr.contains("catalog source unavailable"));
}

#[test]
fn test_garbage_catalog_fails() {
    let path = std::env::temp_dir().join(format!("otawiki-test-garbage-{}.json", std::process::id()));
    fs::write(&path, "not a catalog").expect("Failed to write fixture");

    let (_, stderr, success) = run_otawiki(&[path.to_str().unwrap(), "-d", "iPhone6,1"]);
    let _ = fs::remove_file(&path);

    assert!(!success);
    assert!(stderr.contains("not a software update catalog"));
}
