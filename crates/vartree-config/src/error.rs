use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The commented default file could not be written.
    #[error("cannot create {}: {source}", path.display())]
    CreateDefault {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed TOML, or TOML that does not match the schema.
    #[error("invalid TOML: {0}")]
    Parse(String),

    /// A well-formed value outside its allowed range.
    #[error("{field}: {message}")]
    Validation {
        /// Dotted key, e.g. `tree.base_chunk_size`.
        field: String,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
