//! Persistence boundaries
//!
//! Blob storage holds working-tree archives; the record store holds one
//! [`record::RepositoryRecord`] per repository id. Both are traits so the
//! snapshot engine can run against in-memory fakes in tests.

pub mod blob;
pub mod record;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use record::{MemoryRecordStore, RecordStore, RepositoryRecord, SledRecordStore};
