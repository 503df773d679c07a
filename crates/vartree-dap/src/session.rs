//! Session lifecycle.
//!
//! ```text
//! Uninitialized --initialize--> Initialized --launch--> Running <--> Stopped
//!                                        any state --terminate--> Terminated
//! ```
//!
//! The client consults this state before every request so that nothing
//! is sent to an adapter that cannot answer it.

use std::fmt;

use crate::capabilities::DapCapabilities;
use crate::error::DapError;
use crate::protocol::Capabilities;

/// Where a debug session is in its lifecycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// `initialize` answered; waiting for launch.
    Initialized,
    /// The debuggee is executing.
    Running,
    /// The debuggee is paused and can be inspected.
    Stopped,
    /// Disconnected, or the adapter reported `terminated`/`exited`.
    Terminated,
}

impl SessionState {
    /// Lowercase name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State, capabilities and last stopped thread of one session.
#[derive(Debug, Default)]
pub struct DapSession {
    state: SessionState,
    capabilities: DapCapabilities,
    stopped_thread: Option<i64>,
}

impl DapSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Capabilities recorded from the `initialize` response.
    pub fn capabilities(&self) -> &DapCapabilities {
        &self.capabilities
    }

    /// Thread named by the latest `stopped` event that carried one.
    pub fn stopped_thread(&self) -> Option<i64> {
        self.stopped_thread
    }

    /// Record the `initialize` response. Only valid once.
    pub fn initialize(&mut self, caps: &Capabilities) -> Result<(), DapError> {
        match self.state {
            SessionState::Terminated => Err(DapError::Terminated),
            SessionState::Uninitialized => {
                self.capabilities = DapCapabilities::from_initialize_response(caps);
                self.state = SessionState::Initialized;
                Ok(())
            }
            _ => Err(self.invalid("initialize")),
        }
    }

    /// Record a successful `launch`.
    ///
    /// Adapters may report the entry stop before answering `launch`; the
    /// session then stays Stopped.
    pub fn launch(&mut self) -> Result<(), DapError> {
        self.require_active()?;
        match self.state {
            SessionState::Initialized => {
                self.state = SessionState::Running;
                Ok(())
            }
            SessionState::Stopped => Ok(()),
            _ => Err(self.invalid("launch")),
        }
    }

    /// Record a `stopped` event.
    pub fn handle_stopped(&mut self, thread_id: Option<i64>) -> Result<(), DapError> {
        self.require_active()?;
        self.state = SessionState::Stopped;
        if let Some(id) = thread_id {
            self.stopped_thread = Some(id);
        }
        Ok(())
    }

    /// Record a `continued` event or a resume request.
    pub fn continue_execution(&mut self) -> Result<(), DapError> {
        self.require_active()?;
        if self.state != SessionState::Stopped {
            return Err(self.invalid("continue"));
        }
        self.state = SessionState::Running;
        Ok(())
    }

    /// End the session. Repeating it is harmless: adapters send both
    /// `terminated` and `exited`, in either order.
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
        self.stopped_thread = None;
    }

    /// Gate for requests that inspect a paused debuggee.
    pub fn require_stopped(&self, operation: &str) -> Result<(), DapError> {
        self.require_active()?;
        if self.state == SessionState::Stopped {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    /// Gate for requests valid any time after `initialize`.
    pub fn require_active(&self) -> Result<(), DapError> {
        match self.state {
            SessionState::Uninitialized => Err(DapError::NotInitialized),
            SessionState::Terminated => Err(DapError::Terminated),
            _ => Ok(()),
        }
    }

    fn invalid(&self, operation: &str) -> DapError {
        DapError::InvalidState {
            operation: operation.into(),
            state: self.state.to_string(),
        }
    }
}
