use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::str::FromStr;

/// Stream of bytes for file content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content type used when none was recorded at write time
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Opaque identifier of a stored file.
///
/// Callers only ever format and parse it; each store decides what the
/// string encodes (an ObjectId hex string for GridFS).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Create from existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = crate::BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::BlobError::invalid("file id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Metadata of one stored object. Never carries payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: FileId,
    pub filename: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    pub content_type: String,
    /// Free-form attributes recorded at write time
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl FileMetadata {
    /// The inclusive range covering the whole object, `None` when it is empty.
    pub fn full_range(&self) -> Option<ByteRange> {
        if self.size == 0 {
            None
        } else {
            Some(ByteRange::new(0, self.size - 1))
        }
    }
}

/// Request to store a file
#[derive(Debug, Clone)]
pub struct FilePut {
    pub filename: String,
    pub content_type: Option<String>,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl FilePut {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_attribute<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// The metadata document as persisted: attributes plus `contentType`.
    pub fn stored_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut stored = self.attributes.clone();
        if let Some(ct) = &self.content_type {
            stored.insert("contentType".to_string(), serde_json::Value::String(ct.clone()));
        }
        stored
    }
}

/// Inclusive byte span `[start, end]` of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered; zero for an inverted range.
    pub fn length(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// `0 <= start <= end < size`
    pub fn is_satisfiable(&self, total_size: u64) -> bool {
        self.start <= self.end && self.end < total_size
    }

    /// Value of a `Content-Range` header for this span.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Metadata `contentType`, or the octet-stream default.
pub(crate) fn content_type_of(metadata: &serde_json::Map<String, serde_json::Value>) -> String {
    metadata
        .get("contentType")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
