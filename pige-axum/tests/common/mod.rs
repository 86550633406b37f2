#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use pige_axum::{routes, BackendClient, PigeState};
use pige_blob::{
    BlobError, BlobResult, ByteRange, ByteStream, FileId, FileMetadata, FilePut, FileStorage,
    MemoryStorage, StoreConfig,
};
use serde_json::Value;
use tower::ServiceExt;

/// Start `router` on an ephemeral port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn backend_at(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Duration::from_secs(5)).unwrap()
}

/// A backend that accepts connections but answers every request after 3s.
pub async fn slow_backend() -> String {
    let router = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        "too late"
    });
    spawn_backend(router).await
}

/// Client that gives up after 200ms.
pub fn impatient_backend(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Duration::from_millis(200)).unwrap()
}

/// A client pointed at a port nobody listens on.
pub fn unreachable_backend() -> BackendClient {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    backend_at(&format!("http://{addr}"))
}

pub fn router_with(storage: Arc<dyn FileStorage>, backend: BackendClient) -> Router {
    routes(PigeState::new(storage, backend))
}

/// Memory store with small chunks so range reads cross chunk boundaries.
pub fn memory_store() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new(StoreConfig::new().with_chunk_size(7)))
}

pub async fn put(store: &dyn FileStorage, filename: &str, content_type: &str, data: &[u8]) -> FileId {
    let bytes = Bytes::copy_from_slice(data);
    let body = futures::stream::once(async move { Ok::<_, std::io::Error>(bytes) });
    store
        .save_file(FilePut::new(filename).with_content_type(content_type), Box::pin(body))
        .await
        .unwrap()
}

pub async fn send(router: Router, req: Request<Body>) -> Response {
    router.oneshot(req).await.unwrap()
}

pub async fn body_bytes(res: Response) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

pub async fn json_body(res: Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Counts every store call made through it.
pub struct CountingStorage {
    pub inner: Arc<dyn FileStorage>,
    pub calls: AtomicUsize,
    pub reads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl CountingStorage {
    pub fn new(inner: Arc<dyn FileStorage>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileStorage for CountingStorage {
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_file_metadata(id).await
    }

    async fn save_file(&self, put: FilePut, body: ByteStream) -> BlobResult<FileId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_file(put, body).await
    }

    async fn read_file_range(&self, id: &FileId, range: ByteRange) -> BlobResult<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_file_range(id, range).await
    }

    async fn find_by_filename(&self, filename: &str) -> BlobResult<Option<FileMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_filename(filename).await
    }
}

/// A store whose server is down.
pub struct DownStorage;

fn refused() -> BlobError {
    BlobError::unavailable(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "store refused the connection",
    ))
}

#[async_trait::async_trait]
impl FileStorage for DownStorage {
    async fn get_file_metadata(&self, _id: &FileId) -> BlobResult<FileMetadata> {
        Err(refused())
    }

    async fn save_file(&self, _put: FilePut, _body: ByteStream) -> BlobResult<FileId> {
        Err(BlobError::write("store refused the connection"))
    }

    async fn read_file_range(&self, _id: &FileId, _range: ByteRange) -> BlobResult<ByteStream> {
        Err(refused())
    }

    async fn find_by_filename(&self, _filename: &str) -> BlobResult<Option<FileMetadata>> {
        Err(refused())
    }
}

/// Knows one 10-byte file whose read fails after the first four bytes.
pub struct BrokenReadStorage;

#[async_trait::async_trait]
impl FileStorage for BrokenReadStorage {
    async fn get_file_metadata(&self, id: &FileId) -> BlobResult<FileMetadata> {
        Ok(FileMetadata {
            id: id.clone(),
            filename: "broken.mp3".into(),
            size: 10,
            upload_date: Utc::now(),
            content_type: "audio/mpeg".into(),
            metadata: Default::default(),
        })
    }

    async fn save_file(&self, _put: FilePut, _body: ByteStream) -> BlobResult<FileId> {
        Err(BlobError::write("read-only"))
    }

    async fn read_file_range(&self, _id: &FileId, _range: ByteRange) -> BlobResult<ByteStream> {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"ID3\x04")),
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "chunk 1 missing",
            )),
        ];
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn find_by_filename(&self, _filename: &str) -> BlobResult<Option<FileMetadata>> {
        Ok(None)
    }
}
