use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn minivsfs(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_minivsfs"))
        .args(args)
        .output()
        .expect("failed to run minivsfs")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn format(image: &Path) -> Output {
    minivsfs(&["format", "--image", path_arg(image), "--size-kib", "180", "--inodes", "128"])
}

#[test]
fn test_format_creates_image() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");

    let out = format(&image);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::metadata(&image).unwrap().len(), 45 * 4096);
    assert!(String::from_utf8_lossy(&out.stdout).contains("MiniVSFS created"));
}

#[test]
fn test_format_rejects_bad_size() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");

    let out = minivsfs(&["format", "--image", path_arg(&image), "--size-kib", "181", "--inodes", "128"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("Error:"));
    assert!(!image.exists());
}

#[test]
fn test_missing_arguments_is_usage_error() {
    let out = minivsfs(&["format", "--size-kib", "180"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());

    let out = minivsfs(&["inject", "--input", "x"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_non_numeric_size_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");

    let out = minivsfs(&["format", "--image", path_arg(&image), "--size-kib", "abc", "--inodes", "128"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--size-kib"));
    assert!(!image.exists());
}

#[test]
fn test_help_and_version_succeed() {
    let out = minivsfs(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("format"));

    let out = minivsfs(&["--version"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("minivsfs"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");

    let out = minivsfs(&[
        "format", "--image", path_arg(&image), "--size-kib", "4096", "--inodes", "512", "--dry-run",
    ]);
    assert!(out.status.success());
    assert!(!image.exists());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1024 blocks"));
    assert!(stdout.contains("inode_table"));
}

#[test]
fn test_inject_then_verify() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");
    let output = dir.path().join("out.img");
    let file = dir.path().join("a.txt");
    fs::write(&file, vec![b'a'; 5000]).unwrap();
    assert!(format(&image).status.success());

    let out = minivsfs(&[
        "inject", "--input", path_arg(&image), "--output", path_arg(&output), "--file", path_arg(&file),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Successfully added 'a.txt'"));

    let out = minivsfs(&["verify", "--image", path_arg(&output), "--json"]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["is_valid"], true);
    assert_eq!(report["stats"]["files"], 1);
    assert_eq!(report["stats"]["inodes_used"], 2);
}

#[test]
fn test_duplicate_inject_fails() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");
    let file = dir.path().join("dup.txt");
    fs::write(&file, b"twice").unwrap();
    assert!(format(&image).status.success());

    let args = ["inject", "--input", path_arg(&image), "--output", path_arg(&image), "--file", path_arg(&file)];
    assert!(minivsfs(&args).status.success());

    let out = minivsfs(&args);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("already exists"));
}

#[test]
fn test_inject_json_report() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");
    let file = dir.path().join("b.bin");
    fs::write(&file, b"").unwrap();
    assert!(format(&image).status.success());

    let out = minivsfs(&[
        "inject", "--input", path_arg(&image), "--output", path_arg(&image), "--file", path_arg(&file), "--json",
    ]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["name"], "b.bin");
    assert_eq!(report["inode"], 2);
    assert_eq!(report["blocks"].as_array().unwrap().len(), 0);
    assert_eq!(report["root_size"], 192);
}

#[test]
fn test_verify_reports_corruption() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("fs.img");
    assert!(format(&image).status.success());

    let mut bytes = fs::read(&image).unwrap();
    bytes[100] ^= 0xFF;
    fs::write(&image, bytes).unwrap();

    let out = minivsfs(&["verify", "--image", path_arg(&image)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("CORRUPTED"));
}
