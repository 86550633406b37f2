//! GridFS-backed content store.
//!
//! Objects live in the standard GridFS layout so files written by other
//! drivers are readable here and vice versa:
//!
//! ```text
//! <bucket>.files   { _id, length, chunkSize, uploadDate, filename, metadata }
//! <bucket>.chunks  { _id, files_id, n, data }
//! ```
//!
//! Writes go through the driver's upload stream, which chunks the source
//! and inserts the files document last. A failed source aborts the upload
//! so no orphan chunks remain. The driver has no ranged download, so range
//! reads query only the chunks that overlap the requested span.

use std::io;
use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::io::AsyncWriteExt;
use futures_util::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, oid::ObjectId, Binary, Bson, Document};
use mongodb::gridfs::{GridFsBucket, GridFsUploadStream};
use mongodb::options::{ClientOptions, GridFsBucketOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::Deserialize;

use crate::bridge::push_stream;
use crate::connection::LazyConnection;
use crate::store::check_range;
use crate::types::content_type_of;
use crate::{
    BlobError, BlobResult, ByteRange, ByteStream, FileId, FileMetadata, FilePut, FileStorage,
    StoreConfig,
};

#[derive(Debug, Clone, Deserialize)]
struct FilesDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    length: Bson,
    #[serde(rename = "chunkSize")]
    chunk_size: Bson,
    #[serde(rename = "uploadDate")]
    upload_date: mongodb::bson::DateTime,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    metadata: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChunkDoc {
    n: i32,
    data: Binary,
}

/// GridFS counts arrive as Int32, Int64 or Double depending on the writer.
fn bson_count(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 => Some(*v as u64),
        _ => None,
    }
}

impl FilesDoc {
    fn size(&self) -> u64 {
        bson_count(&self.length).unwrap_or(0)
    }

    fn chunk_size(&self) -> u64 {
        bson_count(&self.chunk_size).unwrap_or(0).max(1)
    }

    fn into_metadata(self) -> FileMetadata {
        let size = self.size();
        let metadata = self
            .metadata
            .map(|m| match Bson::Document(m).into_relaxed_extjson() {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            })
            .unwrap_or_default();

        FileMetadata {
            id: FileId::from_string(self.id.to_hex()),
            filename: self.filename,
            size,
            upload_date: DateTime::<Utc>::from_timestamp_millis(self.upload_date.timestamp_millis())
                .unwrap_or_else(Utc::now),
            content_type: content_type_of(&metadata),
            metadata,
        }
    }
}

/// First and last chunk numbers overlapping `range`.
fn chunk_span(range: ByteRange, chunk_size: u64) -> (u64, u64) {
    (range.start / chunk_size, range.end / chunk_size)
}

/// Byte count chunk `n` must hold for an object of `size` bytes.
fn expected_chunk_len(n: u64, chunk_size: u64, size: u64) -> u64 {
    size.saturating_sub(n * chunk_size).min(chunk_size)
}

/// The part of chunk `n` that falls inside `range`, as offsets into the chunk.
fn slice_in_chunk(n: u64, chunk_size: u64, range: ByteRange) -> Range<usize> {
    let chunk_start = n * chunk_size;
    let from = range.start.saturating_sub(chunk_start).min(chunk_size);
    let to = (range.end + 1).saturating_sub(chunk_start).min(chunk_size);
    from as usize..to as usize
}

fn parse_object_id(id: &FileId) -> BlobResult<ObjectId> {
    ObjectId::parse_str(id.as_str()).map_err(|_| BlobError::not_found(id.as_str()))
}

fn file_id_of(id: &Bson) -> FileId {
    match id {
        Bson::ObjectId(oid) => FileId::from_string(oid.to_hex()),
        Bson::String(s) => FileId::from_string(s.clone()),
        other => FileId::from_string(other.to_string()),
    }
}

fn corrupt(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, message)
}

/// GridFS store over an established database handle.
#[derive(Clone)]
pub struct GridFsStorage {
    bucket: GridFsBucket,
    files: Collection<FilesDoc>,
    chunks: Collection<ChunkDoc>,
    config: StoreConfig,
}

impl GridFsStorage {
    /// Connect, verify the server answers, and make sure the indexes exist.
    ///
    /// Server selection gives up after `config.connect_timeout` unless the
    /// URI sets `serverSelectionTimeoutMS` itself.
    pub async fn connect(uri: &str, database: &str, config: StoreConfig) -> BlobResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(BlobError::unavailable)?;
        options
            .server_selection_timeout
            .get_or_insert(config.connect_timeout);

        let client = Client::with_options(options).map_err(BlobError::unavailable)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(BlobError::unavailable)?;

        let store = Self::from_database(&db, config);
        store.ensure_indexes().await?;

        tracing::info!(
            database,
            bucket = %store.config.bucket_name,
            "connected to GridFS content store"
        );
        Ok(store)
    }

    /// Use an existing database handle without touching the server.
    pub fn from_database(db: &Database, config: StoreConfig) -> Self {
        let bucket = db.gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(config.bucket_name.clone())
                .chunk_size_bytes(config.chunk_size_bytes)
                .build(),
        );
        Self {
            bucket,
            files: db.collection(&config.files_collection()),
            chunks: db.collection(&config.chunks_collection()),
            config,
        }
    }

    pub async fn ensure_indexes(&self) -> BlobResult<()> {
        let chunk_index = IndexModel::builder()
            .keys(doc! { "files_id": 1, "n": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.chunks
            .create_index(chunk_index)
            .await
            .map_err(BlobError::backend)?;

        let files_index = IndexModel::builder()
            .keys(doc! { "filename": 1, "uploadDate": 1 })
            .build();
        self.files
            .create_index(files_index)
            .await
            .map_err(BlobError::backend)?;
        Ok(())
    }

    async fn files_doc(&self, oid: ObjectId) -> BlobResult<Option<FilesDoc>> {
        self.files
            .find_one(doc! { "_id": oid })
            .await
            .map_err(BlobError::backend)
    }

    /// Copy `body` into the upload stream, enforcing the size limit.
    async fn write_body(&self, upload: &mut GridFsUploadStream, mut body: ByteStream) -> BlobResult<u64> {
        let mut total: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| BlobError::write(format!("byte source failed: {e}")))?;
            total += chunk.len() as u64;
            if total > self.config.max_file_bytes {
                return Err(BlobError::write(format!(
                    "file exceeds maximum size of {} bytes",
                    self.config.max_file_bytes
                )));
            }
            upload
                .write_all(&chunk)
                .await
                .map_err(|e| BlobError::write(format!("chunk rejected: {e}")))?;
        }
        Ok(total)
    }
}

#[async_trait]
impl FileStorage for GridFsStorage {
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata> {
        let oid = parse_object_id(id)?;
        self.files_doc(oid)
            .await?
            .map(FilesDoc::into_metadata)
            .ok_or_else(|| BlobError::not_found(id.as_str()))
    }

    async fn save_file(&self, put: FilePut, body: ByteStream) -> BlobResult<FileId> {
        let metadata = mongodb::bson::to_document(&put.stored_metadata())
            .map_err(|e| BlobError::write(format!("metadata is not storable: {e}")))?;

        let mut upload = self
            .bucket
            .open_upload_stream(&put.filename)
            .metadata(metadata)
            .await
            .map_err(|e| BlobError::write(format!("upload could not start: {e}")))?;
        let id = file_id_of(upload.id());

        let length = match self.write_body(&mut upload, body).await {
            Ok(length) => length,
            Err(e) => {
                if let Err(abort) = upload.abort().await {
                    tracing::warn!(file_id = %id, error = %abort, "failed to abort upload");
                }
                return Err(e);
            }
        };
        upload
            .close()
            .await
            .map_err(|e| BlobError::write(format!("files document rejected: {e}")))?;

        tracing::debug!(file_id = %id, length, "stored file");
        Ok(id)
    }

    async fn read_file_range(&self, id: &FileId, range: ByteRange) -> BlobResult<ByteStream> {
        let oid = parse_object_id(id)?;
        let files_doc = self
            .files_doc(oid)
            .await?
            .ok_or_else(|| BlobError::not_found(id.as_str()))?;
        let size = files_doc.size();
        check_range(range, size)?;

        let chunk_size = files_doc.chunk_size();
        let (first, last) = chunk_span(range, chunk_size);

        let mut cursor = self
            .chunks
            .find(doc! {
                "files_id": oid,
                "n": { "$gte": first as i64, "$lte": last as i64 },
            })
            .sort(doc! { "n": 1 })
            .await
            .map_err(BlobError::backend)?;

        let stream = push_stream(move |tx| async move {
            let mut expected = first;
            while let Some(chunk) = cursor
                .try_next()
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            {
                let n = chunk.n.max(0) as u64;
                if n != expected {
                    return Err(corrupt(format!("{oid}: chunk {expected} missing")));
                }
                let data = Bytes::from(chunk.data.bytes);
                if (data.len() as u64) < expected_chunk_len(n, chunk_size, size) {
                    return Err(corrupt(format!("{oid}: chunk {n} is truncated")));
                }

                tx.send(data.slice(slice_in_chunk(n, chunk_size, range))).await?;
                expected += 1;
            }

            if expected <= last {
                return Err(corrupt(format!("{oid}: chunk {expected} missing")));
            }
            Ok(())
        });
        Ok(Box::pin(stream))
    }

    async fn find_by_filename(&self, filename: &str) -> BlobResult<Option<FileMetadata>> {
        let mut cursor = self
            .files
            .find(doc! { "filename": filename })
            .sort(doc! { "uploadDate": -1 })
            .limit(1)
            .await
            .map_err(BlobError::backend)?;

        let found = cursor.try_next().await.map_err(BlobError::backend)?;
        Ok(found.map(FilesDoc::into_metadata))
    }
}

/// GridFS store that connects on first use.
///
/// A failed connection surfaces as `Unavailable` for that call only; the
/// next call tries again.
pub struct LazyGridFs {
    uri: String,
    database: String,
    config: StoreConfig,
    conn: LazyConnection<GridFsStorage>,
}

impl LazyGridFs {
    pub fn new<U: Into<String>, D: Into<String>>(uri: U, database: D, config: StoreConfig) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            config,
            conn: LazyConnection::new(),
        }
    }

    pub async fn store(&self) -> BlobResult<&GridFsStorage> {
        if !self.conn.is_connected() {
            tracing::debug!(database = %self.database, "connecting to content store");
        }
        self.conn
            .get_or_connect(|| GridFsStorage::connect(&self.uri, &self.database, self.config.clone()))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "content store connection failed"))
    }
}

#[async_trait]
impl FileStorage for LazyGridFs {
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata> {
        self.store().await?.get_file_metadata(id).await
    }

    async fn save_file(&self, put: FilePut, body: ByteStream) -> BlobResult<FileId> {
        self.store().await?.save_file(put, body).await
    }

    async fn read_file_range(&self, id: &FileId, range: ByteRange) -> BlobResult<ByteStream> {
        self.store().await?.read_file_range(id, range).await
    }

    async fn find_by_filename(&self, filename: &str) -> BlobResult<Option<FileMetadata>> {
        self.store().await?.find_by_filename(filename).await
    }
}
