//! Tests for the FileSystem boundary trait

use std::fs;

use tempfile::TempDir;

use subform::infrastructure::traits::{FileSystem, RealFileSystem};

#[test]
fn given_nested_target_when_write_then_parents_created() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("a").join("b").join("listing.json");
    let fs = RealFileSystem;

    // Act
    fs.write(&target, "{}").unwrap();

    // Assert
    assert!(fs.is_file(&target));
    assert_eq!(fs.read_to_string(&target).unwrap(), "{}");
}

#[test]
fn given_directory_when_probed_then_exists_but_not_file() {
    let temp = TempDir::new().unwrap();
    let fs = RealFileSystem;

    assert!(fs.exists(temp.path()));
    assert!(!fs.is_file(temp.path()));
}

#[test]
fn given_missing_file_when_read_then_io_error() {
    let temp = TempDir::new().unwrap();
    let fs = RealFileSystem;

    let result = fs.read_to_string(&temp.path().join("absent.json"));

    assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn given_bare_file_name_when_ensure_parent_then_noop() {
    let fs = RealFileSystem;

    fs.ensure_parent(std::path::Path::new("listing.json")).unwrap();
}

#[test]
fn given_existing_file_when_overwritten_then_content_replaced() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("listing.json");
    fs::write(&target, "old").unwrap();
    let real = RealFileSystem;

    real.write(&target, "new").unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
}
