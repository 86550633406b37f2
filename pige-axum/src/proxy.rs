//! Pass-through endpoints to the processing backend.
//!
//! Every handler validates its input, forwards one request, and reshapes the
//! answer. Failures come back as `{success: false, message, error}`: `503`
//! when the backend could not be reached, the backend's own status code
//! otherwise, with the raw backend body in `error`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pige_core::errors::PigeError;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::backend::BackendError;
use crate::error::map_json_rejection;
use crate::{PigeAxumError, PigeState};

type ProxyResult = Result<Json<Value>, PigeAxumError>;

fn into_err(err: PigeError) -> PigeAxumError {
    err.into_anyhow().into()
}

/// A recording id as sent by the browser: a string or a number.
fn recording_id(value: &Option<Value>) -> Result<String, PigeAxumError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(into_err(PigeError::bad_request("the 'recording_id' parameter is required"))),
    }
}

/// Error for a failed backend call made on behalf of `action`.
fn backend_failure(err: BackendError, action: &str) -> PigeAxumError {
    let pige = match &err {
        BackendError::Unreachable(_) => {
            PigeError::unavailable(format!("could not reach the {action} service"))
                .with_detail("backend unreachable")
        }
        BackendError::Status { status, body } => {
            PigeError::upstream(*status, format!("{action} failed ({status})"))
                .with_detail(body.clone())
        }
        BackendError::Decode(_) | BackendError::Request(_) => {
            PigeError::general_error(format!("internal error during {action}"))
                .with_detail(err.to_string())
        }
    };
    into_err(pige.with_source(err.into()))
}

/// `{success: true, ...backend}`, with keys in `overrides` taking precedence.
fn merge_success(backend: Value, overrides: Value) -> Value {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    if let Value::Object(fields) = backend {
        body.extend(fields);
    }
    if let Value::Object(fields) = overrides {
        body.extend(fields);
    }
    Value::Object(body)
}

fn message_or(data: &Value, default: &str) -> Value {
    match data.get("message") {
        Some(Value::String(m)) if !m.is_empty() => Value::String(m.clone()),
        _ => Value::String(default.to_string()),
    }
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_max_sentences() -> u32 {
    5
}

fn default_max_keywords() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub recording_id: Option<Value>,
    #[serde(default = "default_language")]
    pub language: String,
}

pub async fn transcribe(
    State(state): State<PigeState>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> ProxyResult {
    let Json(req) = body.map_err(map_json_rejection)?;
    let id = recording_id(&req.recording_id)?;
    tracing::info!(recording_id = %id, language = %req.language, "transcription requested");

    let data = state
        .backend
        .post_json(
            "/api/ai/transcribe/",
            &json!({ "recording_id": id, "language": req.language }),
        )
        .await
        .map_err(|e| backend_failure(e, "transcription"))?;

    Ok(Json(json!({
        "success": true,
        "transcript": data.get("transcript").cloned().unwrap_or(Value::Null),
        "language": data.get("language").cloned().unwrap_or(Value::Null),
        "message": message_or(&data, "transcription generated"),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub recording_id: Option<Value>,
    #[serde(default = "default_max_sentences")]
    pub max_sentences: u32,
}

pub async fn summarize(
    State(state): State<PigeState>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Response, PigeAxumError> {
    let Json(req) = body.map_err(map_json_rejection)?;
    let id = recording_id(&req.recording_id)?;

    let result = state
        .backend
        .post_json(
            "/api/ai/summarize/",
            &json!({ "recording_id": id, "max_sentences": req.max_sentences }),
        )
        .await;

    let data = match result {
        Ok(data) => data,
        Err(BackendError::Status { status: 503, body }) => {
            return Err(into_err(
                PigeError::unavailable("the summary service is temporarily unavailable")
                    .with_detail(body),
            ));
        }
        // Reported without an `error` field.
        Err(BackendError::Status { status: 404, .. }) => {
            return Ok((
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "message": "recording not found or no transcript available",
                })),
            )
                .into_response());
        }
        Err(other) => return Err(backend_failure(other, "summary")),
    };

    Ok(Json(json!({
        "success": true,
        "summary": data.get("summary").cloned().unwrap_or(Value::Null),
        "message": message_or(&data, "summary generated"),
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub recording_id: Option<Value>,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: u32,
}

pub async fn extract_keywords(
    State(state): State<PigeState>,
    body: Result<Json<KeywordsRequest>, JsonRejection>,
) -> ProxyResult {
    let Json(req) = body.map_err(map_json_rejection)?;
    let id = recording_id(&req.recording_id)?;
    tracing::info!(recording_id = %id, max_keywords = req.max_keywords, "keyword extraction requested");

    let data = state
        .backend
        .post_json(
            "/api/ai/extract-keywords/",
            &json!({ "recording_id": id, "max_keywords": req.max_keywords }),
        )
        .await
        .map_err(|e| backend_failure(e, "keyword extraction"))?;

    let keywords = match data.get("keywords") {
        Some(Value::Null) | None => json!([]),
        Some(k) => k.clone(),
    };
    Ok(Json(json!({
        "success": true,
        "keywords": keywords,
        "message": message_or(&data, "keywords extracted"),
    })))
}

pub async fn models_info(State(state): State<PigeState>) -> ProxyResult {
    let data = state
        .backend
        .get_json("/api/ai/models-info/")
        .await
        .map_err(|e| match e {
            BackendError::Unreachable(_) => {
                let stub = json!({ "available": false, "message": "backend unreachable" });
                into_err(
                    PigeError::unavailable("could not reach the server; model information is unavailable")
                        .with_detail("backend unreachable")
                        .with_data(json!({ "whisper": stub, "mistral": stub })),
                )
            }
            other => backend_failure(other, "model information lookup"),
        })?;

    Ok(Json(merge_success(data, Value::Null)))
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub source: Option<String>,
    pub title: Option<String>,
    pub format: Option<String>,
    pub duration: Option<Value>,
}

fn required(value: Option<String>, message: &str) -> Result<String, PigeAxumError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| into_err(PigeError::bad_request(message)))
}

/// Start a recording job from a stream URL.
pub async fn start_recording(
    State(state): State<PigeState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> ProxyResult {
    let Json(req) = body.map_err(map_json_rejection)?;
    let source = required(req.source, "a stream URL is required")?;
    let title = required(req.title, "a title is required")?;

    let format = req.format.filter(|f| !f.is_empty()).unwrap_or_else(|| "mp3".into());
    let duration = match req.duration {
        None | Some(Value::Null) => json!(30),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => json!(30),
        Some(Value::String(s)) if s.is_empty() => json!(30),
        Some(other) => other,
    };
    tracing::info!(%title, %source, "starting recording job");

    let data = state
        .backend
        .post_json(
            "/api/recordings/jobs/start/",
            &json!({ "source": source, "title": title, "format": format, "duration": duration }),
        )
        .await
        .map_err(|e| backend_failure(e, "recording start"))?;

    Ok(Json(merge_success(
        data,
        json!({ "message": format!("recording of \"{title}\" started") }),
    )))
}

#[derive(Debug, Deserialize)]
pub struct CheckStreamRequest {
    pub url: Option<String>,
}

/// Failure body of the stream check: `{url, available: false, error}`.
fn stream_unavailable(status: StatusCode, url: &str, error: String) -> Response {
    (
        status,
        Json(json!({ "url": url, "available": false, "error": error })),
    )
        .into_response()
}

pub async fn check_stream(
    State(state): State<PigeState>,
    body: Result<Json<CheckStreamRequest>, JsonRejection>,
) -> Result<Response, PigeAxumError> {
    let Json(req) = body.map_err(map_json_rejection)?;
    let url = required(req.url, "the 'url' parameter is required")?;

    match state
        .backend
        .post_json("/api/recordings/check-stream/", &json!({ "url": url }))
        .await
    {
        Ok(data) => Ok(Json(data).into_response()),
        Err(BackendError::Status { status, body }) => Ok(stream_unavailable(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            &url,
            body,
        )),
        Err(e @ BackendError::Unreachable(_)) => Ok(stream_unavailable(
            StatusCode::SERVICE_UNAVAILABLE,
            &url,
            e.to_string(),
        )),
        Err(e) => Ok(stream_unavailable(
            StatusCode::INTERNAL_SERVER_ERROR,
            &url,
            e.to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordingRequest {
    pub recording_id: Option<Value>,
}

/// Full processing (transcription and summary) of an archived recording.
pub async fn process_recording(
    State(state): State<PigeState>,
    body: Result<Json<RecordingRequest>, JsonRejection>,
) -> ProxyResult {
    let Json(req) = body.map_err(map_json_rejection)?;
    let id = recording_id(&req.recording_id)?;
    tracing::info!(recording_id = %id, "processing archived recording");

    let data = state
        .backend
        .post_empty(&format!(
            "/api/archive/recordings/{}/process/",
            urlencoding::encode(&id)
        ))
        .await
        .map_err(|e| backend_failure(e, "processing"))?;

    Ok(Json(merge_success(
        data,
        json!({ "message": "recording processed (transcription + summary)" }),
    )))
}

pub async fn delete_recording(
    State(state): State<PigeState>,
    body: Result<Json<RecordingRequest>, JsonRejection>,
) -> ProxyResult {
    let Json(req) = body.map_err(map_json_rejection)?;
    let id = recording_id(&req.recording_id)?;

    state
        .backend
        .delete(&format!("/api/archive/recordings/{}/", urlencoding::encode(&id)))
        .await
        .map_err(|e| backend_failure(e, "deletion"))?;

    tracing::info!(recording_id = %id, "recording deleted");
    Ok(Json(json!({ "success": true, "message": "recording deleted" })))
}
