use std::sync::Arc;

use pige_blob::FileStorage;

use crate::backend::BackendClient;

/// Largest accepted upload unless configured otherwise (200 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Clone)]
pub struct PigeState {
    pub storage: Arc<dyn FileStorage>,
    pub backend: Arc<BackendClient>,
    pub max_upload_bytes: usize,
}

impl PigeState {
    pub fn new(storage: Arc<dyn FileStorage>, backend: BackendClient) -> Self {
        Self {
            storage,
            backend: Arc::new(backend),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
