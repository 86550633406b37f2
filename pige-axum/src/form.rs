use axum::extract::Multipart;
use bytes::{Bytes, BytesMut};
use pige_core::errors::PigeError;

use crate::error::map_multipart_error;
use crate::PigeAxumError;

/// Field carrying the audio payload.
pub const AUDIO_FIELD: &str = "audio_file";

/// One submitted recording, fully read from the form.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
    pub title: Option<String>,
    pub format: Option<String>,
    pub duration: Option<String>,
}

impl AudioUpload {
    /// Descriptive text fields as `(name, value)`, skipping absent ones.
    pub fn text_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", self.title.as_deref()),
            ("format", self.format.as_deref()),
            ("duration", self.duration.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Read the upload form, buffering the audio payload up to `max_bytes`.
///
/// Browsers submit an empty, unnamed part when no file was chosen; that
/// counts as no audio file.
pub async fn read_audio_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<AudioUpload, PigeAxumError> {
    let mut audio: Option<(String, String, Bytes)> = None;
    let mut title = None;
    let mut format = None;
    let mut duration = None;

    while let Some(mut field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            AUDIO_FIELD => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(pige_blob::DEFAULT_CONTENT_TYPE)
                    .to_string();

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(map_multipart_error)? {
                    if data.len() + chunk.len() > max_bytes {
                        return Err(PigeError::payload_too_large(format!(
                            "audio file exceeds the {max_bytes} byte limit"
                        ))
                        .into_anyhow()
                        .into());
                    }
                    data.extend_from_slice(&chunk);
                }

                if !(original_name.is_empty() && data.is_empty()) {
                    audio = Some((original_name, content_type, data.freeze()));
                }
            }
            "title" => title = Some(field.text().await.map_err(map_multipart_error)?),
            "format" => format = Some(field.text().await.map_err(map_multipart_error)?),
            "duration" => duration = Some(field.text().await.map_err(map_multipart_error)?),
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }

    let Some((original_name, content_type, data)) = audio else {
        return Err(PigeError::bad_request("no audio file provided")
            .into_anyhow()
            .into());
    };

    Ok(AudioUpload {
        original_name: if original_name.is_empty() {
            "recording".to_string()
        } else {
            original_name
        },
        content_type,
        data,
        title,
        format,
        duration,
    })
}
