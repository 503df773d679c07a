//! Layered TOML configuration for vartree and the helpers that place
//! and rotate its log file.

pub mod config;
pub mod error;
pub mod load;
pub mod logging;
pub mod merge;
pub mod validate;

pub use config::{AdapterConfig, Config, LogConfig, LogLevel, TreeConfig};
pub use error::ConfigError;
pub use load::{default_config_dir, load_config, load_from_str};
