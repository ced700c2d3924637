//! Integration tests for tree hashing determinism

use crate::integration::test_utils::write_fixture;
use reposync::tree::hasher::hash_bytes;
use reposync::tree::{diff, TreeScanner};
use reposync::types::to_hex;
use std::fs;
use tempfile::TempDir;

/// The same on-disk content produces the same root hash and record sets.
#[test]
fn test_same_tree_same_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(
        root,
        &[
            ("file1.txt", "content1"),
            ("file2.txt", "content2"),
            ("dir1/file3.txt", "content3"),
        ],
    );

    let first = TreeScanner::new(root).scan().unwrap();
    let second = TreeScanner::new(root).scan().unwrap();

    assert_eq!(first.root_hash, second.root_hash);
    assert_eq!(first.files, second.files);
    assert_eq!(first.directories, second.directories);
}

/// Two copies of the same content at different roots hash identically.
#[test]
fn test_equal_content_equal_root_across_locations() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let files = [("a.txt", "hello"), ("b/c.txt", "world")];
    write_fixture(dir_a.path(), &files);
    write_fixture(dir_b.path(), &files);

    let snap_a = TreeScanner::new(dir_a.path()).scan().unwrap();
    let snap_b = TreeScanner::new(dir_b.path()).scan().unwrap();

    assert_eq!(snap_a.root_hash, snap_b.root_hash);
}

/// The concrete scenario: `a.txt="hello"`, `b/c.txt="world"`.
#[test]
fn test_two_file_repository_shape() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("a.txt", "hello"), ("b/c.txt", "world")]);

    let snapshot = TreeScanner::new(root).scan().unwrap();

    assert_eq!(snapshot.total_files, 2);
    assert_eq!(snapshot.total_directories, 2);

    let dirs: Vec<&str> = snapshot
        .directories
        .iter()
        .map(|d| d.path.as_str())
        .collect();
    assert_eq!(dirs, vec![".", "b"]);

    // Single-chunk files hash as their content hash
    let files = snapshot.files_by_path();
    assert_eq!(files["a.txt"].hash, to_hex(&hash_bytes(b"hello")));
    assert_eq!(files["b/c.txt"].hash, to_hex(&hash_bytes(b"world")));
}

/// Changing one file yields exactly one modified file plus every ancestor
/// directory up to the root.
#[test]
fn test_single_change_propagates_to_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("a.txt", "hello"), ("b/c.txt", "world")]);

    let before = TreeScanner::new(root).scan().unwrap();
    fs::write(root.join("a.txt"), "hello!").unwrap();
    let after = TreeScanner::new(root).scan().unwrap();

    let delta = diff(&before, &after);

    assert!(delta.root_changed);
    assert!(delta.files.added.is_empty());
    assert!(delta.files.removed.is_empty());
    assert_eq!(delta.files.modified.len(), 1);

    let modified = &delta.files.modified[0];
    assert_eq!(modified.path, "a.txt");
    assert_eq!(modified.old_hash, to_hex(&hash_bytes(b"hello")));
    assert_eq!(modified.new_hash, to_hex(&hash_bytes(b"hello!")));

    let modified_dirs: Vec<&str> = delta
        .directories
        .modified
        .iter()
        .map(|d| d.path.as_str())
        .collect();
    assert_eq!(modified_dirs, vec!["."]);
    assert!(delta.directories.added.is_empty());
    assert!(delta.directories.removed.is_empty());
}

/// A deep change marks every ancestor directory as modified.
#[test]
fn test_deep_change_marks_all_ancestors() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(
        root,
        &[("top.txt", "top"), ("x/y/z.txt", "deep")],
    );

    let before = TreeScanner::new(root).scan().unwrap();
    fs::write(root.join("x/y/z.txt"), "deeper").unwrap();
    let after = TreeScanner::new(root).scan().unwrap();

    let delta = diff(&before, &after);

    let mut modified_dirs: Vec<&str> = delta
        .directories
        .modified
        .iter()
        .map(|d| d.path.as_str())
        .collect();
    modified_dirs.sort();
    assert_eq!(modified_dirs, vec![".", "x", "x/y"]);
    assert_eq!(delta.files.modified.len(), 1);
    assert_eq!(delta.files.modified[0].path, "x/y/z.txt");
}

/// Unreadable entries are skipped without aborting the scan.
#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_fixture(root, &[("ok.txt", "fine"), ("locked.txt", "secret")]);
    fs::set_permissions(root.join("locked.txt"), fs::Permissions::from_mode(0o000)).unwrap();

    let snapshot = TreeScanner::new(root).scan().unwrap();

    // Reading as root bypasses permissions; otherwise the file is dropped
    let paths: Vec<&str> = snapshot.files.iter().map(|f| f.path.as_str()).collect();
    assert!(paths.contains(&"ok.txt"));

    fs::set_permissions(root.join("locked.txt"), fs::Permissions::from_mode(0o644)).unwrap();
}
