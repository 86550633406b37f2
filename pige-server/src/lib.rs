pub mod settings;

use std::sync::Arc;

use pige_axum::{BackendClient, PigeApp, PigeState};
use pige_blob::{FileStorage, LazyGridFs, MemoryStorage, StoreConfig};

pub use settings::{Settings, StoreBackend};

/// Wire the content store, backend client and router from `settings`.
///
/// The GridFS store connects on first use, so building never touches the
/// database.
pub fn build(settings: &Settings) -> anyhow::Result<PigeApp> {
    let store_config = StoreConfig::new()
        .with_bucket_name(settings.bucket.clone())
        .with_chunk_size(settings.chunk_size)
        .with_connect_timeout(settings.store_connect_timeout);

    let storage: Arc<dyn FileStorage> = match settings.store_backend {
        StoreBackend::GridFs => Arc::new(LazyGridFs::new(
            settings.mongodb_uri.clone(),
            settings.mongodb_database.clone(),
            store_config,
        )),
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; uploads are lost on restart");
            Arc::new(MemoryStorage::new(store_config))
        }
    };

    let backend = BackendClient::new(settings.backend_url.clone(), settings.backend_timeout)?;
    let state = PigeState::new(storage, backend).with_max_upload_bytes(settings.upload_max_bytes);

    let mut ax = pige_axum::axum(state);

    if let Some(dir) = &settings.static_dir {
        ax.router = ax
            .router
            .fallback_service(tower_http::services::ServeDir::new(dir));
    }

    ax.router = ax.router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    Ok(ax)
}
