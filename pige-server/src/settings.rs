use std::time::Duration;

use anyhow::{anyhow, Result};
use pige_core::{PigeConfig, PigeConfigSnapshot};

pub const ENV_PREFIX: &str = "PIGE__";

/// Plain variables accepted alongside the prefixed ones.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("MONGODB_URI", "mongodb.uri"),
    ("PIGE_API_BASE_URL", "backend.url"),
    ("STATIC_DIR", "static.dir"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    GridFs,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gridfs" | "mongodb" => Ok(Self::GridFs),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store.backend {other:?} (expected gridfs or memory)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub bucket: String,
    pub chunk_size: u32,
    pub store_connect_timeout: Duration,
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub upload_max_bytes: usize,
    pub static_dir: Option<String>,
}

impl Settings {
    /// Read `PIGE__*` variables plus the plain aliases from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let mut config = PigeConfig::from_vars(ENV_PREFIX, vars.iter().cloned());

        for (name, value) in &vars {
            if let Some((_, key)) = ENV_ALIASES.iter().find(|(alias, _)| alias == name) {
                config.set_default(*key, value.as_str());
            }
        }

        Self::from_config(&config)
    }

    pub fn from_config(config: &PigeConfig) -> Result<Self> {
        let snap = config.snapshot();

        Ok(Self {
            host: snap.get_string("http.host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&snap, "http.port", 3000)?,
            store_backend: snap
                .get("store.backend")
                .map(str::parse)
                .transpose()?
                .unwrap_or(StoreBackend::GridFs),
            mongodb_uri: snap
                .get_string("mongodb.uri")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            mongodb_database: snap
                .get_string("mongodb.database")
                .unwrap_or_else(|| "pige".to_string()),
            bucket: snap
                .get_string("store.bucket")
                .unwrap_or_else(|| "audio_files".to_string()),
            chunk_size: chunk_size(&snap)?,
            store_connect_timeout: Duration::from_secs(parse_or(&snap, "store.connect_timeout_secs", 5)?),
            backend_url: snap
                .get_string("backend.url")
                .unwrap_or_else(|| "https://pige.siraj-ai.com".to_string()),
            backend_timeout: Duration::from_secs(parse_or(&snap, "backend.timeout_secs", 30)?),
            upload_max_bytes: parse_or(&snap, "upload.max_bytes", 200 * 1024 * 1024)?,
            static_dir: snap.get_string("static.dir").filter(|dir| !dir.trim().is_empty()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// GridFS records `chunkSize` as a signed 32-bit integer.
fn chunk_size(snap: &PigeConfigSnapshot) -> Result<u32> {
    let bytes: u32 = parse_or(snap, "store.chunk_size", 255 * 1024)?;
    if bytes == 0 || i32::try_from(bytes).is_err() {
        return Err(anyhow!("store.chunk_size must be between 1 and {}", i32::MAX));
    }
    Ok(bytes)
}

/// A present but unparsable value is an error rather than a silent default.
fn parse_or<T>(snap: &PigeConfigSnapshot, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match snap.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value {raw:?} for {key}: {e}")),
    }
}
