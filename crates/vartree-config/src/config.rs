use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Minimum severity written to the log file, `info` unless configured.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Expression tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Base of the chunk-size progression for large indexed collections.
    #[serde(default = "default_base_chunk_size")]
    pub base_chunk_size: u64,
    /// Description of a watch expression that has not been evaluated.
    #[serde(default = "default_not_available")]
    pub watch_not_available: String,
    /// Label of a hover result that has not been evaluated.
    #[serde(default = "default_not_available")]
    pub hover_not_available: String,
    /// Label of a hover evaluated without a debug session.
    #[serde(default = "default_hover_no_session")]
    pub hover_no_session: String,
}

fn default_base_chunk_size() -> u64 {
    100
}

fn default_not_available() -> String {
    "not available".to_string()
}

fn default_hover_no_session() -> String {
    "Please start a debug session to evaluate".to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            base_chunk_size: default_base_chunk_size(),
            watch_not_available: default_not_available(),
            hover_not_available: default_not_available(),
            hover_no_session: default_hover_no_session(),
        }
    }
}

/// How to start and talk to the debug adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter executable speaking DAP on stdio.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to the adapter executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Value sent as `adapterID` in the `initialize` request.
    #[serde(default = "default_adapter_id")]
    pub adapter_id: String,
    /// Seconds to wait for each adapter response.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_adapter_id() -> String {
    "vartree".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            adapter_id: default_adapter_id(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// `[log]` table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Log file; the state-directory default when unset.
    pub file: Option<PathBuf>,
}

/// Top-level vartree configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub log: LogConfig,
}
