//! # Configuration
//!
//! A minimal string key/value store. Keys are dotted (`http.port`,
//! `backend.timeout_secs`) and every value is a string; typed reads happen
//! on a [`PigeConfigSnapshot`].
//!
//! ```rust
//! use pige_core::PigeConfig;
//! let mut config = PigeConfig::new();
//!
//! config.set("http.port", "3000");
//! assert_eq!(config.snapshot().get_u64("http.port"), Some(3000));
//! ```
//!
//! ## Environment overrides
//! [`PigeConfig::from_env`] maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export PIGE__BACKEND__TIMEOUT_SECS=10   # backend.timeout_secs = "10"
//! ```

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct PigeConfig {
    values: HashMap<String, String>,
}

impl PigeConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Load every `<prefix>A__B` variable of the process environment as `a.b`.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Same as [`PigeConfig::from_env`] over an explicit variable list.
    pub fn from_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                config.set(normalized, value);
            }
        }
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> PigeConfigSnapshot {
        PigeConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PigeConfigSnapshot {
    map: HashMap<String, String>,
}

impl PigeConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// Reads a whole number of seconds.
    pub fn get_duration_secs(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_secs)
    }
}
