//! pige-core: framework-agnostic errors and configuration shared by the
//! pige crates.

pub mod config;
pub mod errors;

pub use config::{PigeConfig, PigeConfigSnapshot};
pub use errors::{ErrorKind, PigeError};
