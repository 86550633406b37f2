//! Upload intake.
//!
//! A submitted recording is written to the content store and then handed
//! to the processing backend, independently of whether the store write
//! worked. The response prefers the backend's answer, degrades to a stored
//! copy with a warning, and fails only when both paths failed.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use pige_blob::{BlobError, FileId, FilePut, FileStorage};
use pige_core::errors::{ErrorKind, PigeError};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Map, Value};

use crate::backend::{BackendClient, BackendError};
use crate::error::map_multipart_rejection;
use crate::form::{read_audio_upload, AudioUpload, AUDIO_FIELD};
use crate::{PigeAxumError, PigeState};

pub const BACKEND_UPLOAD_PATH: &str = "/api/recordings/upload/";

/// Relative URL serving a stored file.
pub fn stream_url(id: &FileId) -> String {
    format!("/api/recordings/stream?fileId={id}")
}

/// Last path component of a client-supplied filename.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// `<unix-millis>_<name>`, with a short random infix if the store already
/// holds that name.
///
/// Fails only when the store is unreachable, so callers can skip the write.
pub async fn unique_filename(storage: &dyn FileStorage, original: &str) -> Result<String, BlobError> {
    let millis = Utc::now().timestamp_millis();
    let original = base_name(original);
    let candidate = format!("{millis}_{original}");

    match storage.file_exists(&candidate).await {
        Ok(false) => Ok(candidate),
        Ok(true) => {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            Ok(format!("{millis}_{}_{original}", &suffix[..6]))
        }
        Err(e) if e.is_unavailable() => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "filename check failed, keeping timestamped name");
            Ok(candidate)
        }
    }
}

async fn store_upload(
    storage: &dyn FileStorage,
    filename: String,
    upload: &AudioUpload,
) -> Result<FileId, BlobError> {
    let put = FilePut::new(filename)
        .with_content_type(upload.content_type.clone())
        .with_attribute("originalName", &upload.original_name)
        .with_attribute("title", &upload.title)
        .with_attribute("format", &upload.format)
        .with_attribute("duration", &upload.duration)
        .with_attribute("uploadedAt", Utc::now().to_rfc3339());

    let data = upload.data.clone();
    let body = futures::stream::once(async move { Ok::<_, std::io::Error>(data) });
    storage.save_file(put, Box::pin(body)).await
}

async fn hand_off(backend: &BackendClient, upload: &AudioUpload) -> Result<Value, BackendError> {
    let len = upload.data.len() as u64;
    let part = Part::stream_with_length(reqwest::Body::from(upload.data.clone()), len)
        .file_name(upload.original_name.clone())
        .mime_str(&upload.content_type)
        .map_err(BackendError::Request)?;

    let mut form = Form::new().part(AUDIO_FIELD, part);
    for (name, value) in upload.text_fields() {
        form = form.text(name, value.to_string());
    }
    backend.post_multipart(BACKEND_UPLOAD_PATH, form).await
}

/// Build the intake response from both outcomes.
pub fn compose_response(
    stored: Result<FileId, BlobError>,
    handed_off: Result<Value, BackendError>,
) -> Response {
    match (stored, handed_off) {
        (stored, Ok(backend)) => {
            let mut body = match backend {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("data".into(), other);
                    map
                }
            };
            body.entry("success").or_insert(Value::Bool(true));
            body.entry("message")
                .or_insert_with(|| json!("recording uploaded"));

            match stored {
                Ok(id) => {
                    body.insert("mongo_url".into(), json!(stream_url(&id)));
                    body.insert("mongo_file_id".into(), json!(id));
                }
                Err(_) => {
                    body.insert(
                        "warning".into(),
                        json!("file was not saved to the content store; the backend kept its own copy"),
                    );
                }
            }
            (StatusCode::OK, Json(Value::Object(body))).into_response()
        }
        (Ok(id), Err(backend_err)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "recording stored; processing will start once the backend is reachable",
                "warning": format!("processing backend unavailable: {}", backend_err.detail()),
                "mongo_file_id": id,
                "mongo_url": stream_url(&id),
            })),
        )
            .into_response(),
        (Err(store_err), Err(backend_err)) => {
            let kind = ErrorKind::from_status(backend_err.status_code());
            let err = PigeError::new(kind, "upload failed: neither the content store nor the backend accepted the file")
                .with_detail(backend_err.detail())
                .with_data(json!({ "store_error": store_err.to_string() }));
            PigeAxumError::from(err.into_anyhow()).into_response()
        }
    }
}

pub async fn upload_recording(
    State(state): State<PigeState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PigeAxumError> {
    let multipart = multipart.map_err(map_multipart_rejection)?;
    let upload = read_audio_upload(multipart, state.max_upload_bytes).await?;

    let stored = match unique_filename(state.storage.as_ref(), &upload.original_name).await {
        Ok(filename) => {
            let stored = store_upload(state.storage.as_ref(), filename.clone(), &upload).await;
            match &stored {
                Ok(id) => tracing::info!(file_id = %id, %filename, bytes = upload.data.len(), "upload stored"),
                Err(e) => tracing::error!(%filename, error = %e, "content store rejected upload"),
            }
            stored
        }
        Err(e) => {
            tracing::error!(error = %e, "content store unreachable, skipping write");
            Err(e)
        }
    };

    let handed_off = hand_off(&state.backend, &upload).await;
    if let Err(e) = &handed_off {
        tracing::warn!(error = %e, "backend handoff failed");
    }

    Ok(compose_response(stored, handed_off))
}
