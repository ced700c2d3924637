//! Shared types for the snapshot engine.

/// 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Stable identifier for a canonicalized source URL (lowercase hex digest).
pub type RepoId = String;

/// Encode a digest as a lowercase hex string, the form stored in records
/// and embedded in directory entry lines.
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Decode a lowercase hex digest back into raw bytes.
///
/// Merkle combination operates on raw digest bytes, never on hex text,
/// so stored hashes must round-trip through this.
pub fn from_hex(digest: &str) -> Option<Hash> {
    let bytes = hex::decode(digest).ok()?;
    bytes.try_into().ok()
}
