//! pige-axum: HTTP surface of the pige control panel.
//!
//! Serves stored recordings with byte-range support, takes uploads into the
//! content store, and proxies the processing backend's AI and archive
//! endpoints with a uniform error shape.

pub mod app;
pub mod backend;
pub mod disposition;
pub mod form;
pub mod proxy;
pub mod range;
pub mod state;
pub mod stream;
pub mod upload;
mod error;
pub use error::{blob_error_to_pige, PigeAxumError};
pub use state::PigeState;

pub use app::{axum, routes, PigeApp};
pub use backend::{BackendClient, BackendError};
