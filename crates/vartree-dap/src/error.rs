//! Failures of the adapter connection and of individual requests.

use thiserror::Error;

/// Why a DAP operation did not produce a result.
#[derive(Debug, Error)]
pub enum DapError {
    /// The adapter executable could not be started.
    #[error("cannot start debug adapter {0}")]
    AdapterSpawnFailed(String),

    /// The byte stream broke, or a message could not be framed.
    #[error("adapter connection: {0}")]
    Transport(String),

    /// No response within the request timeout.
    #[error("'{command}' got no response in time")]
    Timeout { command: String },

    /// `success: false`. Displays only the adapter's text so it can be
    /// shown inline in a tree.
    #[error("{message}")]
    Rejected { command: String, message: String },

    /// A message that does not match the protocol.
    #[error("unexpected adapter message: {0}")]
    InvalidResponse(String),

    /// The request does not fit the current session state.
    #[error("cannot {operation}: session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("session not initialized")]
    NotInitialized,

    #[error("session terminated")]
    Terminated,
}

impl DapError {
    /// Build a [`DapError::Transport`] from any serde_json failure.
    pub(crate) fn serialization(e: serde_json::Error) -> Self {
        DapError::Transport(format!("serialization failed: {e}"))
    }
}
