//! # pige-blob: content store for recordings
//!
//! `pige-blob` stores audio recordings (and any other binary object) and
//! serves them back by inclusive byte range, so an HTTP layer can answer
//! `Range` requests without buffering whole files.
//!
//! ## Key Features
//!
//! - **Streaming-first**: reads are lazy, demand-driven byte streams
//! - **Range reads**: only the chunks overlapping a range are fetched
//! - **Atomic writes**: an object is visible in full or not at all
//! - **Lazy connection**: the GridFS store connects on first use and retries
//!   after a failed attempt
//!
//! ## Quick Start
//!
//! ```rust
//! use pige_blob::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryStorage::new(StoreConfig::default());
//!
//! let body = futures::stream::once(async { Ok(Bytes::from_static(b"hello world")) });
//! let id = store
//!     .save_file(FilePut::new("hello.txt").with_content_type("text/plain"), Box::pin(body))
//!     .await?;
//!
//! let meta = store.get_file_metadata(&id).await?;
//! let tail = store.read_file_range(&id, ByteRange::new(6, meta.size - 1)).await?;
//! # drop(tail);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────┐
//! │  HTTP handlers  │  ← framing, status codes, headers
//! ├─────────────────┤
//! │   FileStorage   │  ← metadata, ranged reads, atomic writes
//! ├─────────────────┤
//! │ GridFS / memory │  ← chunked persistence
//! └─────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod connection;
pub mod error;
pub mod gridfs;
pub mod memory;
pub mod store;
pub mod types;

pub use bridge::{push_stream, ChunkSender, PushStream};
pub use config::StoreConfig;
pub use connection::LazyConnection;
pub use error::{BlobError, BlobResult};
pub use gridfs::{GridFsStorage, LazyGridFs};
pub use memory::MemoryStorage;
pub use store::FileStorage;
pub use types::{ByteRange, ByteStream, FileId, FileMetadata, FilePut, DEFAULT_CONTENT_TYPE};

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        BlobError, BlobResult, ByteRange, ByteStream, FileId, FileMetadata, FilePut, FileStorage,
        GridFsStorage, LazyGridFs, MemoryStorage, StoreConfig,
    };
}
