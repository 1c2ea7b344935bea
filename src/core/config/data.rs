use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_CATALOG_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST,
};
use crate::utils::url::normalize_host;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Model server address used when neither `--host` nor `OLLAMA_HOST` is set.
    pub host: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub catalog_timeout_secs: Option<u64>,
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(
            self.catalog_timeout_secs
                .unwrap_or(DEFAULT_CATALOG_TIMEOUT_SECS),
        )
    }
}

/// Pick the server address: flag, then environment, then config, then default.
///
/// Blank values at any level are treated as absent.
pub fn resolve_host(flag: Option<&str>, env_value: Option<&str>, config: &Config) -> String {
    let chosen = [flag, env_value, config.host.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_HOST);
    normalize_host(chosen)
}
