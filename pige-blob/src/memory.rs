use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::bridge::push_stream;
use crate::store::check_range;
use crate::types::content_type_of;
use crate::{
    BlobError, BlobResult, ByteRange, ByteStream, FileId, FileMetadata, FilePut, FileStorage,
    StoreConfig,
};

struct StoredFile {
    meta: FileMetadata,
    data: Bytes,
}

/// In-process content store.
///
/// Reads are served in `chunk_size_bytes` pieces through the same push/pull
/// bridge as the GridFS store, so consumers see the same stream shape.
pub struct MemoryStorage {
    files: RwLock<Vec<StoredFile>>,
    config: StoreConfig,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl MemoryStorage {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            config,
        }
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    async fn lookup(&self, id: &FileId) -> BlobResult<(FileMetadata, Bytes)> {
        let files = self.files.read().await;
        files
            .iter()
            .find(|f| &f.meta.id == id)
            .map(|f| (f.meta.clone(), f.data.clone()))
            .ok_or_else(|| BlobError::not_found(id.as_str()))
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata> {
        self.lookup(id).await.map(|(meta, _)| meta)
    }

    async fn save_file(&self, put: FilePut, mut body: ByteStream) -> BlobResult<FileId> {
        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| BlobError::write(format!("byte source failed: {e}")))?;
            if (data.len() + chunk.len()) as u64 > self.config.max_file_bytes {
                return Err(BlobError::write(format!(
                    "file exceeds maximum size of {} bytes",
                    self.config.max_file_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let metadata = put.stored_metadata();
        let id = FileId::from_string(uuid::Uuid::new_v4().simple().to_string());
        let meta = FileMetadata {
            id: id.clone(),
            filename: put.filename,
            size: data.len() as u64,
            upload_date: Utc::now(),
            content_type: content_type_of(&metadata),
            metadata,
        };

        self.files.write().await.push(StoredFile {
            meta,
            data: data.freeze(),
        });
        Ok(id)
    }

    async fn read_file_range(&self, id: &FileId, range: ByteRange) -> BlobResult<ByteStream> {
        let (meta, data) = self.lookup(id).await?;
        check_range(range, meta.size)?;

        let span = data.slice(range.start as usize..=range.end as usize);
        let chunk = self.config.chunk_size_bytes.max(1) as usize;

        let stream = push_stream(move |tx| async move {
            let mut offset = 0;
            while offset < span.len() {
                let next = (offset + chunk).min(span.len());
                tx.send(span.slice(offset..next)).await?;
                offset = next;
            }
            Ok(())
        });
        Ok(Box::pin(stream))
    }

    async fn find_by_filename(&self, filename: &str) -> BlobResult<Option<FileMetadata>> {
        let files = self.files.read().await;
        Ok(files
            .iter()
            .rev()
            .find(|f| f.meta.filename == filename)
            .map(|f| f.meta.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Bytes, std::io::Error>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        Box::pin(futures::stream::iter(items))
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn save_then_read_ranges() {
        let store = MemoryStorage::new(StoreConfig::new().with_chunk_size(3));
        let id = store
            .save_file(
                FilePut::new("show.mp3").with_content_type("audio/mpeg"),
                body(&[b"hello ", b"world"]),
            )
            .await
            .unwrap();

        let meta = store.get_file_metadata(&id).await.unwrap();
        assert_eq!(meta.size, 11);
        assert_eq!(meta.content_type, "audio/mpeg");

        let all = store.read_file_range(&id, ByteRange::new(0, 10)).await.unwrap();
        assert_eq!(collect(all).await, b"hello world");

        let mid = store.read_file_range(&id, ByteRange::new(4, 7)).await.unwrap();
        assert_eq!(collect(mid).await, b"o wo");
    }

    #[tokio::test]
    async fn rejects_out_of_bounds_and_unknown() {
        let store = MemoryStorage::default();
        let id = store
            .save_file(FilePut::new("a.bin"), body(&[b"abc"]))
            .await
            .unwrap();

        assert!(matches!(
            store.read_file_range(&id, ByteRange::new(0, 3)).await,
            Err(BlobError::Range { .. })
        ));
        assert!(matches!(
            store.read_file_range(&id, ByteRange::new(2, 1)).await,
            Err(BlobError::Range { .. })
        ));
        assert!(store
            .get_file_metadata(&FileId::from_string("nope"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn failed_source_leaves_nothing_visible() {
        let store = MemoryStorage::default();
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ];

        let err = store
            .save_file(FilePut::new("broken.mp3"), Box::pin(futures::stream::iter(items)))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Write { .. }));
        assert!(store.is_empty().await);
        assert!(!store.file_exists("broken.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn filename_lookup_returns_newest() {
        let store = MemoryStorage::default();
        store.save_file(FilePut::new("dup.mp3"), body(&[b"old"])).await.unwrap();
        let newest = store.save_file(FilePut::new("dup.mp3"), body(&[b"newer"])).await.unwrap();

        let found = store.find_by_filename("dup.mp3").await.unwrap().unwrap();
        assert_eq!(found.id, newest);
        assert!(store.file_exists("dup.mp3").await.unwrap());
        assert!(!store.file_exists("other.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn enforces_max_file_size() {
        let store = MemoryStorage::new(StoreConfig::new().with_max_file_bytes(4));
        let err = store
            .save_file(FilePut::new("big.bin"), body(&[b"abc", b"de"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Write { .. }));
    }
}
