use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::{proxy, stream, upload, PigeState};

/// Room for the multipart framing and text fields around the audio payload.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub struct PigeApp {
    pub state: PigeState,
    pub router: Router<()>,
}

impl Clone for PigeApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl PigeApp {
    pub fn new(state: PigeState) -> Self {
        Self {
            router: routes(state.clone()),
            state,
        }
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn listen_with_shutdown<A, S>(self, addr: A, signal: S) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
        S: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

/// All pige routes with request-id and trace layers applied.
pub fn routes(state: PigeState) -> Router<()> {
    let upload_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/api/recordings/stream",
            get(stream::stream_file).head(stream::stream_head),
        )
        .route(
            "/api/recordings/upload",
            post(upload::upload_recording).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/recordings/start", post(proxy::start_recording))
        .route("/api/recordings/check-stream", post(proxy::check_stream))
        .route("/api/ai/transcribe", post(proxy::transcribe))
        .route("/api/ai/summarize", post(proxy::summarize))
        .route("/api/ai/extract-keywords", post(proxy::extract_keywords))
        .route("/api/ai/models-info", get(proxy::models_info))
        .route("/api/archive/process", post(proxy::process_recording))
        .route("/api/archive/delete", delete(proxy::delete_recording))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

pub fn axum(state: PigeState) -> PigeApp {
    PigeApp::new(state)
}
