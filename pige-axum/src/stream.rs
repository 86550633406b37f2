//! Byte-range streaming of stored recordings.
//!
//! `GET /api/recordings/stream?fileId=<id>` (or `?filename=<name>`) resolves
//! the object's metadata first, decides between a full `200` and a partial
//! `206` from the `Range` header, then opens exactly one read against the
//! store and pipes it into the response body. A failure after the headers
//! went out aborts the body, so the client sees a broken transfer instead of
//! a short one.
//!
//! Malformed or unsatisfiable ranges are served as full content rather than
//! rejected with `416`.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use pige_blob::{ByteRange, FileId, FileMetadata, FileStorage};
use pige_core::errors::PigeError;
use serde::Deserialize;

use crate::disposition::content_disposition;
use crate::range::parse_range_header;
use crate::{PigeAxumError, PigeState};

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
    pub filename: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the request's file reference; `fileId` wins over `filename`.
pub async fn resolve_metadata(
    storage: &dyn FileStorage,
    query: &StreamQuery,
) -> Result<FileMetadata, PigeAxumError> {
    if let Some(id) = non_empty(&query.file_id) {
        return Ok(storage.get_file_metadata(&FileId::from_string(id)).await?);
    }
    if let Some(filename) = non_empty(&query.filename) {
        return storage
            .find_by_filename(filename)
            .await?
            .ok_or_else(|| PigeError::not_found("file not found").into_anyhow().into());
    }
    Err(PigeError::bad_request("fileId or filename is required")
        .into_anyhow()
        .into())
}

/// Status, headers and byte span for one response.
#[derive(Debug)]
pub struct Framing {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Span to read from the store; `None` for an empty object.
    pub span: Option<ByteRange>,
}

impl Framing {
    pub fn new(meta: &FileMetadata, range_header: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&meta.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(pige_blob::DEFAULT_CONTENT_TYPE)),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition(&meta.content_type, &meta.filename))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        );

        match range_header.and_then(|h| parse_range_header(h, meta.size)) {
            Some(range) => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.length()));
                if let Ok(value) = HeaderValue::from_str(&range.content_range(meta.size)) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                Self {
                    status: StatusCode::PARTIAL_CONTENT,
                    headers,
                    span: Some(range),
                }
            }
            None => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));
                Self {
                    status: StatusCode::OK,
                    headers,
                    span: meta.full_range(),
                }
            }
        }
    }

    fn respond(self, body: Body) -> Response {
        let mut res = Response::new(body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|v| v.to_str().ok())
}

pub async fn stream_file(
    State(state): State<PigeState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, PigeAxumError> {
    let meta = resolve_metadata(state.storage.as_ref(), &query).await?;
    let framing = Framing::new(&meta, range_header(&headers));

    let body = match framing.span {
        Some(span) => {
            let bytes = state.storage.read_file_range(&meta.id, span).await?;
            Body::from_stream(bytes)
        }
        None => Body::empty(),
    };

    tracing::debug!(
        file_id = %meta.id,
        status = framing.status.as_u16(),
        range = ?framing.span,
        size = meta.size,
        "streaming file"
    );
    Ok(framing.respond(body))
}

/// Same resolution and headers as `GET`, without opening a read.
pub async fn stream_head(
    State(state): State<PigeState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, PigeAxumError> {
    let meta = resolve_metadata(state.storage.as_ref(), &query).await?;
    Ok(Framing::new(&meta, range_header(&headers)).respond(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta(size: u64, content_type: &str) -> FileMetadata {
        FileMetadata {
            id: FileId::from_string("abc"),
            filename: "morning show.mp3".into(),
            size,
            upload_date: Utc::now(),
            content_type: content_type.into(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn partial_framing() {
        let f = Framing::new(&meta(100, "audio/mpeg"), Some("bytes=10-19"));
        assert_eq!(f.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(f.span, Some(ByteRange::new(10, 19)));
        assert_eq!(f.headers[header::CONTENT_LENGTH], "10");
        assert_eq!(f.headers[header::CONTENT_RANGE], "bytes 10-19/100");
        assert_eq!(f.headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(
            f.headers[header::CONTENT_DISPOSITION],
            "inline; filename=\"morning%20show.mp3\""
        );
    }

    #[test]
    fn bad_range_frames_full_content() {
        let f = Framing::new(&meta(100, "application/zip"), Some("bytes=50-200"));
        assert_eq!(f.status, StatusCode::OK);
        assert_eq!(f.span, Some(ByteRange::new(0, 99)));
        assert_eq!(f.headers[header::CONTENT_LENGTH], "100");
        assert!(f.headers.get(header::CONTENT_RANGE).is_none());
        assert!(f.headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));
    }

    #[test]
    fn empty_object_reads_nothing() {
        let f = Framing::new(&meta(0, "audio/mpeg"), Some("bytes=0-"));
        assert_eq!(f.status, StatusCode::OK);
        assert_eq!(f.span, None);
        assert_eq!(f.headers[header::CONTENT_LENGTH], "0");
    }
}
