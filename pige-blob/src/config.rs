use std::time::Duration;

/// Configuration for the content store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// GridFS bucket name (collections `<bucket>.files` / `<bucket>.chunks`)
    pub bucket_name: String,

    /// Size of each stored chunk in bytes
    pub chunk_size_bytes: u32,

    /// Absolute max size allowed for a single object (safety guard)
    pub max_file_bytes: u64,

    /// How long a connection attempt waits for a reachable server
    pub connect_timeout: Duration,
}

/// GridFS stores `chunkSize` as a 32-bit signed integer.
pub const MAX_CHUNK_SIZE: u32 = i32::MAX as u32;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket_name: "audio_files".to_string(),
            chunk_size_bytes: 255 * 1024, // GridFS default
            max_file_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket_name<S: Into<String>>(mut self, name: S) -> Self {
        self.bucket_name = name.into();
        self
    }

    /// Set chunk size, clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, bytes: u32) -> Self {
        self.chunk_size_bytes = bytes.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub(crate) fn files_collection(&self) -> String {
        format!("{}.files", self.bucket_name)
    }

    pub(crate) fn chunks_collection(&self) -> String {
        format!("{}.chunks", self.bucket_name)
    }
}
