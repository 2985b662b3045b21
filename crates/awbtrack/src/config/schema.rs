use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::PacingInterval;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            engine: EngineConfig::default(),
            lookup: LookupConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. `None` uses the default location, `":memory:"` keeps
    /// everything in process.
    #[serde(default)]
    pub path: Option<String>,
}

/// Where the job store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

impl DatabaseConfig {
    pub const MEMORY: &'static str = ":memory:";

    pub fn location(&self) -> DatabaseLocation {
        match self.path.as_deref() {
            Some(Self::MEMORY) => DatabaseLocation::Memory,
            Some(path) => DatabaseLocation::File(PathBuf::from(path)),
            None => match crate::db::default_database_path() {
                Some(path) => DatabaseLocation::File(path),
                None => DatabaseLocation::Memory,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_pacing_ms")]
    pub default_pacing_ms: u64,
    /// Case-insensitive substring that identifies the waybill column.
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
    /// Per-viewer event queue length.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_pacing_ms() -> u64 {
    PacingInterval::DEFAULT_MS
}

fn default_identifier_column() -> String {
    "awb".to_string()
}

fn default_event_buffer() -> usize {
    256
}

impl EngineConfig {
    pub fn default_pacing(&self) -> PacingInterval {
        PacingInterval::from_millis(self.default_pacing_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pacing_ms: default_pacing_ms(),
            identifier_column: default_identifier_column(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8090/track".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, e.g. `"info,awbtrack=trace"`. `RUST_LOG` wins
    /// when set.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}
