//! Archive round-trip tests

use crate::integration::test_utils::write_fixture;
use reposync::archive::{pack_dir, unpack_into};
use reposync::tree::TreeScanner;
use tempfile::TempDir;

/// Packing then extracting a tree reproduces the same root hash.
#[test]
fn test_round_trip_preserves_root_hash() {
    let src_dir = TempDir::new().unwrap();
    let src = src_dir.path();
    write_fixture(
        src,
        &[
            ("a.txt", "hello"),
            ("b/c.txt", "world"),
            ("b/nested/deep.txt", "deep"),
        ],
    );

    let original = TreeScanner::new(src).scan().unwrap();

    let bytes = pack_dir(src).unwrap();
    let dest_dir = TempDir::new().unwrap();
    let dest = dest_dir.path().join("extracted");
    unpack_into(&bytes, &dest).unwrap();

    let restored = TreeScanner::new(&dest).scan().unwrap();

    assert_eq!(original.root_hash, restored.root_hash);
    assert_eq!(original.files, restored.files);
    assert_eq!(original.directories, restored.directories);
}

/// Ignored entries do not affect the restored hash even though they travel
/// inside the archive.
#[test]
fn test_ignored_entries_round_trip_harmlessly() {
    let src_dir = TempDir::new().unwrap();
    let src = src_dir.path();
    write_fixture(
        src,
        &[
            ("a.txt", "hello"),
            (".git/HEAD", "ref: refs/heads/main"),
            (".gitignore", "target/"),
        ],
    );

    let original = TreeScanner::new(src).scan().unwrap();

    let bytes = pack_dir(src).unwrap();
    let dest_dir = TempDir::new().unwrap();
    let dest = dest_dir.path().join("extracted");
    unpack_into(&bytes, &dest).unwrap();

    // The archive carries the full working tree
    assert!(dest.join(".git/HEAD").exists());

    // The scan still sees only the non-ignored content
    let restored = TreeScanner::new(&dest).scan().unwrap();
    assert_eq!(original.root_hash, restored.root_hash);
    assert_eq!(restored.total_files, 1);
}

/// Empty directories survive the round trip.
#[test]
fn test_empty_directory_round_trip() {
    let src_dir = TempDir::new().unwrap();
    let src = src_dir.path();
    write_fixture(src, &[("a.txt", "hello")]);
    std::fs::create_dir(src.join("empty")).unwrap();

    let original = TreeScanner::new(src).scan().unwrap();

    let bytes = pack_dir(src).unwrap();
    let dest_dir = TempDir::new().unwrap();
    let dest = dest_dir.path().join("extracted");
    unpack_into(&bytes, &dest).unwrap();

    let restored = TreeScanner::new(&dest).scan().unwrap();
    assert_eq!(original.root_hash, restored.root_hash);
    assert_eq!(restored.total_directories, 2);
}
