//! Working-tree archives
//!
//! A repository working tree is packed into a single zip held in blob
//! storage, so a fresh host can re-materialize a known-good copy without
//! re-cloning. Packing walks entries in sorted order; extraction replaces
//! the destination wholesale.

use crate::error::SyncError;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Pack a directory into zip bytes.
pub fn pack_dir(dir: &Path) -> Result<Vec<u8>, SyncError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry =
            entry.map_err(|e| SyncError::StorageFailure(format!("Failed to walk tree: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| SyncError::StorageFailure(format!("Path outside archive root: {}", e)))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{}/", name), options)
                .map_err(|e| SyncError::StorageFailure(format!("Failed to add directory: {}", e)))?;
        } else if entry.file_type().is_file() {
            writer
                .start_file(name, options)
                .map_err(|e| SyncError::StorageFailure(format!("Failed to start entry: {}", e)))?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut writer)?;
        }
        // Symlinks and special files are not archived.
    }

    let cursor = writer
        .finish()
        .map_err(|e| SyncError::StorageFailure(format!("Failed to finalize archive: {}", e)))?;
    let bytes = cursor.into_inner();
    debug!(size = bytes.len(), "Packed working tree");
    Ok(bytes)
}

/// Extract archive bytes into `dest`, replacing any prior copy.
pub fn unpack_into(bytes: &[u8], dest: &Path) -> Result<(), SyncError> {
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SyncError::StorageFailure(format!("Failed to open archive: {}", e)))?;
    archive
        .extract(dest)
        .map_err(|e| SyncError::StorageFailure(format!("Failed to extract archive: {}", e)))?;
    debug!(dest = %dest.display(), entries = archive.len(), "Extracted archive");
    Ok(())
}
