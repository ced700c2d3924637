//! Integration tests for snapshot diffing against real scans

use crate::integration::test_utils::write_fixture;
use reposync::tree::{diff, TreeScanner};
use std::fs;
use tempfile::TempDir;

/// diff(A, A) is empty in every category.
#[test]
fn test_diff_identity() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("a.txt", "hello"), ("b/c.txt", "world")]);

    let snapshot = TreeScanner::new(root).scan().unwrap();
    let delta = diff(&snapshot, &snapshot);

    assert!(!delta.root_changed);
    assert!(delta.is_empty());
    assert!(delta.files.added.is_empty());
    assert!(delta.files.removed.is_empty());
    assert!(delta.files.modified.is_empty());
    assert!(delta.directories.added.is_empty());
    assert!(delta.directories.removed.is_empty());
    assert!(delta.directories.modified.is_empty());
}

/// Adding a file reports it as added and its parent as modified, including
/// the child-name set difference.
#[test]
fn test_added_file_reports_parent_children() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("a.txt", "hello")]);

    let before = TreeScanner::new(root).scan().unwrap();
    write_fixture(root, &[("new.txt", "fresh")]);
    let after = TreeScanner::new(root).scan().unwrap();

    let delta = diff(&before, &after);

    assert_eq!(delta.files.added.len(), 1);
    assert_eq!(delta.files.added[0].path, "new.txt");
    assert_eq!(delta.directories.modified.len(), 1);

    let root_change = &delta.directories.modified[0];
    assert_eq!(root_change.path, ".");
    assert_eq!(root_change.children_added, vec!["new.txt"]);
    assert!(root_change.children_removed.is_empty());
    assert_eq!(delta.summary.total_changes, 2);
}

/// Removing a directory reports the directory and its files as removed.
#[test]
fn test_removed_subtree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("keep.txt", "keep"), ("gone/one.txt", "1"), ("gone/two.txt", "2")]);

    let before = TreeScanner::new(root).scan().unwrap();
    fs::remove_dir_all(root.join("gone")).unwrap();
    let after = TreeScanner::new(root).scan().unwrap();

    let delta = diff(&before, &after);

    let removed_files: Vec<&str> = delta.files.removed.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(removed_files, vec!["gone/one.txt", "gone/two.txt"]);
    assert_eq!(delta.directories.removed.len(), 1);
    assert_eq!(delta.directories.removed[0].path, "gone");
    assert_eq!(delta.summary.files_removed, 2);
    assert_eq!(delta.summary.directories_removed, 1);
}

/// A rename shows up as one removal plus one addition with the same hash.
#[test]
fn test_rename_is_remove_plus_add() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("old_name.txt", "stable content")]);

    let before = TreeScanner::new(root).scan().unwrap();
    fs::rename(root.join("old_name.txt"), root.join("new_name.txt")).unwrap();
    let after = TreeScanner::new(root).scan().unwrap();

    let delta = diff(&before, &after);

    assert_eq!(delta.files.removed.len(), 1);
    assert_eq!(delta.files.added.len(), 1);
    // Content addressing: same bytes, same hash on both sides
    assert_eq!(delta.files.removed[0].hash, delta.files.added[0].hash);
    assert!(delta.files.modified.is_empty());
}
