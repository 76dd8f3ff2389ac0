//! Daemon configuration: YAML file, then command-line / environment overrides.
//!
//! ```yaml
//! chain:
//!   http_url: https://rpc.example.org
//!   ws_url: wss://rpc.example.org/ws
//!   request_timeout_ms: 30000
//! http:
//!   listen_addr: 0.0.0.0:8080
//! log:
//!   level: info
//!   json: false
//! storage:
//!   backend: sqlite
//!   path: ./chainwatch.db
//! watcher:
//!   queue_capacity: 10
//!   resubscribe_delay_ms: 3000
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chainwatch_core::WatcherConfig;

use crate::tracing_setup::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint used to fetch blocks.
    #[serde(default = "default_http_url")]
    pub http_url: String,
    /// WebSocket endpoint used for the `newHeads` subscription.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_http_url() -> String { "http://127.0.0.1:8545".into() }
fn default_ws_url() -> String { "ws://127.0.0.1:8546".into() }
fn default_request_timeout_ms() -> u64 { 30_000 }

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            ws_url: default_ws_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String { "0.0.0.0:8080".into() }

impl Default for HttpConfig {
    fn default() -> Self {
        Self { listen_addr: default_listen_addr() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite file, ignored by the memory backend.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String { "chainwatch.db".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// Values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub http_url: Option<String>,
    pub ws_url: Option<String>,
    pub listen_addr: Option<String>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl AppConfig {
    /// Read `path`. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("parsing {}", path.display()))
            .map(Some)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.http_url {
            self.chain.http_url = url;
        }
        if let Some(url) = overrides.ws_url {
            self.chain.ws_url = url;
        }
        if let Some(addr) = overrides.listen_addr {
            self.http.listen_addr = addr;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        if let Some(json) = overrides.json_logs {
            self.log.json = json;
        }
    }
}
