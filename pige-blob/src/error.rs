use thiserror::Error;

/// Result type for content store operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during content store operations
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("File not found: {id}")]
    NotFound { id: String },

    #[error("Invalid byte range {start}-{end} for object of {size} bytes")]
    Range { start: u64, end: u64, size: u64 },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Write failed: {reason}")]
    Write { reason: String },

    #[error("Content store unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// The store could not be reached at all
    pub fn unavailable<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a range error
    pub fn range(start: u64, end: u64, size: u64) -> Self {
        Self::Range { start, end, size }
    }

    /// Create a write error
    pub fn write<S: Into<String>>(reason: S) -> Self {
        Self::Write {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Turn the error into an `io::Error` so it can travel inside a [`crate::ByteStream`].
    pub fn into_io(self) -> std::io::Error {
        match self {
            Self::Io { source } => source,
            Self::NotFound { .. } => std::io::Error::new(std::io::ErrorKind::NotFound, self),
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
