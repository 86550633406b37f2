//! Client for the external processing backend.
//!
//! The backend is an opaque HTTP service; this client only knows how to send
//! JSON or multipart requests to it and how to classify what came back.
//! Nothing is retried here.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout: the backend never answered.
    #[error("backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend responded with status {status}")]
    Status { status: u16, body: String },

    /// A 2xx answer whose body is not JSON.
    #[error("backend returned a body that is not JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("could not build backend request: {0}")]
    Request(#[source] reqwest::Error),
}

impl BackendError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Status code to relay to the client for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unreachable(_) => 503,
            Self::Status { status, .. } => *status,
            Self::Decode(_) | Self::Request(_) => 500,
        }
    }

    /// Diagnostic text: the raw backend body for status failures.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

fn classify(err: reqwest::Error) -> BackendError {
    if err.is_builder() {
        BackendError::Request(err)
    } else {
        BackendError::Unreachable(err)
    }
}

/// Shared HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Request)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json(&self, path: &str) -> BackendResult<Value> {
        let res = self.send(self.http.get(self.url(path))).await?;
        read_json(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> BackendResult<Value> {
        let res = self.send(self.http.post(self.url(path)).json(body)).await?;
        read_json(res).await
    }

    /// POST with no body; some backend actions are addressed by path alone.
    pub async fn post_empty(&self, path: &str) -> BackendResult<Value> {
        let res = self
            .send(
                self.http
                    .post(self.url(path))
                    .header(reqwest::header::CONTENT_TYPE, "application/json"),
            )
            .await?;
        read_json(res).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> BackendResult<Value> {
        let res = self.send(self.http.post(self.url(path)).multipart(form)).await?;
        read_json(res).await
    }

    /// DELETE; the response body is ignored on success.
    pub async fn delete(&self, path: &str) -> BackendResult<()> {
        self.send(self.http.delete(self.url(path))).await?;
        Ok(())
    }

    async fn send(&self, req: RequestBuilder) -> BackendResult<Response> {
        let res = req.send().await.map_err(classify)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "backend returned an error");
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

async fn read_json(res: Response) -> BackendResult<Value> {
    let text = res.text().await.map_err(classify)?;
    serde_json::from_str(&text).map_err(BackendError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failures_relay_code_and_body() {
        let err = BackendError::Status {
            status: 418,
            body: "short and stout".into(),
        };
        assert_eq!(err.status_code(), 418);
        assert_eq!(err.detail(), "short and stout");
        assert!(!err.is_unreachable());
    }

    #[test]
    fn decode_failures_are_internal() {
        let err = BackendError::Decode(serde_json::from_str::<Value>("<html>").unwrap_err());
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = BackendClient::new("http://backend.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/api/ai/transcribe/"), "http://backend.local/api/ai/transcribe/");
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BackendClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = client.get_json("/api/ai/models-info/").await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(err.status_code(), 503);
    }
}
