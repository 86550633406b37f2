use async_trait::async_trait;

use crate::{BlobResult, ByteRange, ByteStream, FileId, FileMetadata, FilePut};

/// Content store operations - implemented by every storage backend.
///
/// Metadata lookups never move payload bytes, so callers can decide how to
/// frame a response before opening a (possibly large) read.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Metadata of the object with this id; `NotFound` when there is none.
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata>;

    /// Consume `body` fully and store it under a fresh id.
    ///
    /// Either the whole object becomes visible and its id is returned, or
    /// the call fails with `Write` and nothing is visible to later reads.
    async fn save_file(&self, put: FilePut, body: ByteStream) -> BlobResult<FileId>;

    /// Lazy, finite stream over `range` (inclusive) of the object.
    ///
    /// Fails with `NotFound` for an unknown id and `Range` when
    /// `start > end` or `end` lies past the last byte.
    async fn read_file_range(&self, id: &FileId, range: ByteRange) -> BlobResult<ByteStream>;

    /// Most recent object stored under `filename`, if any.
    async fn find_by_filename(&self, filename: &str) -> BlobResult<Option<FileMetadata>>;

    /// Whether any object is stored under `filename`.
    async fn file_exists(&self, filename: &str) -> BlobResult<bool> {
        Ok(self.find_by_filename(filename).await?.is_some())
    }
}

/// Validate `range` against an object's size.
pub(crate) fn check_range(range: ByteRange, size: u64) -> BlobResult<()> {
    if range.is_satisfiable(size) {
        Ok(())
    } else {
        Err(crate::BlobError::range(range.start, range.end, size))
    }
}
