//! # Errors
//!
//! Pige carries one structured error type through every layer:
//! - consistent status codes + names
//! - can be carried through `anyhow::Error`
//! - transport-agnostic (the axum crate decides how to serialize)
//!
//! A `PigeError` always has a human-readable `message`. Diagnostic text
//! (a raw backend body, a driver error) goes into `detail` and is rendered
//! in the separate `error` field of the JSON payload, never instead of the
//! status code.

use std::fmt;

use anyhow::Error as AnyError;

/// Error classes with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,         // 400
    NotFound,           // 404
    PayloadTooLarge,    // 413
    GeneralError,       // 500
    BadGateway,         // 502
    Unavailable,        // 503
    /// Any other status relayed verbatim from the external backend.
    Upstream(u16),
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::Unavailable => 503,
            ErrorKind::Upstream(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::Upstream(_) => "UpstreamError",
        }
    }

    /// Map a status code back to a kind, keeping unknown codes as `Upstream`.
    pub fn from_status(code: u16) -> Self {
        match code {
            400 => ErrorKind::BadRequest,
            404 => ErrorKind::NotFound,
            413 => ErrorKind::PayloadTooLarge,
            500 => ErrorKind::GeneralError,
            502 => ErrorKind::BadGateway,
            503 => ErrorKind::Unavailable,
            other => ErrorKind::Upstream(other),
        }
    }
}

/// A structured error that can live inside `anyhow::Error`.
///
/// Fields:
/// - kind (status code + name)
/// - message (shown to the user)
/// - detail (diagnostic, optional)
/// - data (extra JSON merged into the payload, optional)
#[derive(Debug)]
pub struct PigeError {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub data: Option<serde_json::Value>,
    pub source: Option<AnyError>,
}

impl PigeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            data: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// A version suitable for returning to clients: the inner `source`
    /// is dropped.
    pub fn sanitize_for_client(&self) -> PigeError {
        PigeError {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    /// JSON payload: `{success: false, error, message, code}` plus `data`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "success": false,
            "error": self.detail.as_deref().unwrap_or(self.name()),
            "message": self.message,
            "code": self.code(),
        });

        if let Some(serde_json::Value::Object(extra)) = &self.data {
            if let Some(obj) = base.as_object_mut() {
                for (k, v) in extra {
                    obj.insert(k.clone(), v.clone());
                }
            }
        }
        base
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
    /// Relay a backend status code as-is.
    pub fn upstream(status: u16, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_status(status), msg)
    }
}

impl fmt::Display for PigeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for PigeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
