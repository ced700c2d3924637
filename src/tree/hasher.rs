//! Content-addressable hashing using BLAKE3
//!
//! Files are hashed in fixed-size chunks folded into a binary Merkle tree,
//! which bounds memory for arbitrarily large files while keeping the digest
//! deterministic and streamable.

use crate::error::SyncError;
use crate::types::Hash;
use blake3::Hasher;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default chunk size for file hashing (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Compute a generic content hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Compute the Merkle root hash of a file, streaming it in fixed-size chunks.
///
/// An empty file hashes as `hash_bytes(b"")`. A file that fits in one chunk
/// hashes as that chunk's digest. Larger files fold their chunk digests into
/// a binary Merkle tree: adjacent raw digests are concatenated and re-hashed,
/// a level with an odd count duplicates its last digest, until one digest
/// remains.
pub fn file_merkle_root(path: &Path, chunk_size: usize) -> Result<Hash, SyncError> {
    let mut file = File::open(path)?;
    let mut chunk_hashes: Vec<Hash> = Vec::new();
    let mut buf = vec![0u8; chunk_size];

    loop {
        let read = read_chunk(&mut file, &mut buf)?;
        if read == 0 {
            break;
        }
        chunk_hashes.push(hash_bytes(&buf[..read]));
    }

    if chunk_hashes.is_empty() {
        return Ok(hash_bytes(b""));
    }

    Ok(fold_merkle(chunk_hashes))
}

/// Fill `buf` as far as the stream allows; returns the number of bytes read.
///
/// `Read::read` may return short counts mid-file, so loop until the buffer
/// is full or the stream is exhausted to keep chunk boundaries fixed.
fn read_chunk(file: &mut File, buf: &mut [u8]) -> Result<usize, SyncError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Fold a non-empty level of chunk digests into a single Merkle root.
///
/// Combination hashes the concatenation of the raw 32-byte digests, never
/// their hex form.
fn fold_merkle(mut level: Vec<Hash>) -> Hash {
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        for pair in level.chunks(2) {
            let left = &pair[0];
            // Odd count: the last digest pairs with itself
            let right = pair.get(1).unwrap_or(&pair[0]);
            let mut hasher = Hasher::new();
            hasher.update(left);
            hasher.update(right);
            next.push(*hasher.finalize().as_bytes());
        }
        level = next;
    }
    level[0]
}
