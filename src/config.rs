//! Layered configuration.
//!
//! Values resolve in order: built-in defaults, then `stashwatch.toml` in the
//! working directory, then environment variables. Environment variables are
//! prefixed with `STASHWATCH_` and use double underscores between nesting
//! levels:
//!
//! - `STASHWATCH_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `STASHWATCH_WATCH__DEBOUNCE_MS=200` sets `watch.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "stashwatch.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// File-sink output (`export` mode).
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP/WebSocket server (`serve` mode).
    #[serde(default)]
    pub server: ServerConfig,

    /// Watch and recovery tuning.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log levels.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Where the aggregate JSON document is written.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory served at `/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Per-subscriber buffer of unconsumed frames; slower clients lag and
    /// drop the oldest.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// How long a file must stay quiet before its change is processed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Re-arm policy after a watched file is deleted.
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// Bounded backoff for delete-then-recreate writers: wait
/// `initial_delay_ms`, doubling per attempt, up to `max_attempts` waits for
/// the file to reappear.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecoveryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level filter (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `engine = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_output_path() -> PathBuf {
    PathBuf::from("TotalState.json")
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_channel_capacity() -> usize {
    64
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    250
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load the layered configuration from the working directory.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load with an explicit config file path.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("STASHWATCH_").split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
