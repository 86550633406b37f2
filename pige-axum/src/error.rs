use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pige_blob::BlobError;
use pige_core::errors::{ErrorKind, PigeError};

#[derive(Debug)]
pub struct PigeAxumError(pub anyhow::Error);

impl<E> From<E> for PigeAxumError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

/// Client-facing form of a content store failure.
pub fn blob_error_to_pige(err: &BlobError) -> PigeError {
    match err {
        BlobError::NotFound { .. } => PigeError::not_found("file not found"),
        BlobError::Invalid { message } => PigeError::bad_request(message.clone()),
        other => PigeError::general_error("internal server error").with_detail(other.to_string()),
    }
}

pub(crate) fn map_json_rejection(rejection: JsonRejection) -> PigeAxumError {
    PigeError::bad_request("Failed to parse the request body as JSON")
        .with_detail(rejection.body_text())
        .into_anyhow()
        .into()
}

pub(crate) fn map_multipart_rejection(rejection: MultipartRejection) -> PigeAxumError {
    PigeError::bad_request("Expected a multipart/form-data body")
        .with_detail(rejection.body_text())
        .into_anyhow()
        .into()
}

pub(crate) fn map_multipart_error(err: MultipartError) -> PigeAxumError {
    PigeError::new(
        ErrorKind::from_status(err.status().as_u16()),
        "Failed to read the multipart body",
    )
    .with_detail(err.body_text())
    .into_anyhow()
    .into()
}

impl IntoResponse for PigeAxumError {
    fn into_response(self) -> Response {
        let pige = if let Some(pige) = self.0.chain().find_map(|e| e.downcast_ref::<PigeError>()) {
            pige.sanitize_for_client()
        } else if let Some(blob) = self.0.chain().find_map(|e| e.downcast_ref::<BlobError>()) {
            blob_error_to_pige(blob)
        } else {
            PigeError::general_error(self.0.to_string())
        };

        if pige.code() >= 500 {
            tracing::error!(status = pige.code(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = pige.code(), error = %self.0, "request rejected");
        }

        let status =
            StatusCode::from_u16(pige.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(pige.to_json())).into_response()
    }
}
