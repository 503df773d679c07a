//! Typed requests over a [`DapConnection`](crate::connection::DapConnection), gated by session state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::capabilities::DapCapabilities;
use crate::connection::DapConnection;
use crate::error::DapError;
use crate::protocol::{
    Capabilities, DisconnectArguments, EvaluateArguments, EvaluateResponseBody, Event,
    InitializeRequestArguments, LaunchRequestArguments, Scope, ScopesArguments,
    ScopesResponseBody, SetVariableArguments, SetVariableResponseBody, StackFrame,
    StackTraceArguments, StackTraceResponseBody, StoppedEventBody, Thread, ThreadsResponseBody,
    Variable, VariablesArguments, VariablesResponseBody,
};
use crate::session::{DapSession, SessionState};

/// A high-level DAP client: typed requests over a [`DapConnection`],
/// gated by the [`DapSession`] lifecycle.
///
/// All operations take `&self` so one client can be shared by every
/// tree built on the session.
#[derive(Debug)]
pub struct DapClient {
    id: String,
    connection: DapConnection,
    session: Mutex<DapSession>,
    frame_id: Mutex<Option<i64>>,
}

impl DapClient {
    /// Wrap an established connection.
    pub fn new(id: impl Into<String>, connection: DapConnection) -> Self {
        Self {
            id: id.into(),
            connection,
            session: Mutex::new(DapSession::new()),
            frame_id: Mutex::new(None),
        }
    }

    /// Connect over an arbitrary adapter stream (socket, pipe, in-memory).
    pub fn connect<R, W>(
        id: impl Into<String>,
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Event>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (connection, events) = DapConnection::spawn(reader, writer, request_timeout);
        (Self::new(id, connection), events)
    }

    /// Spawn an adapter process speaking DAP over stdio.
    pub fn spawn_adapter(
        id: impl Into<String>,
        command: &str,
        args: &[String],
        request_timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>, Child), DapError> {
        let mut child = TokioCommand::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DapError::AdapterSpawnFailed(format!("{command}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DapError::AdapterSpawnFailed(format!("{command}: stdin not piped")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DapError::AdapterSpawnFailed(format!("{command}: stdout not piped")))?;

        tracing::info!(command, "spawned debug adapter");
        let (client, events) = Self::connect(id, stdout, stdin, request_timeout);
        Ok((client, events, child))
    }

    /// Identifier of this debug session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    /// Whether the session has ended, or the adapter stream closed.
    pub fn is_terminated(&self) -> bool {
        self.session().is_terminated() || self.connection.is_closed()
    }

    /// Capabilities reported by the adapter.
    pub fn capabilities(&self) -> DapCapabilities {
        self.session().capabilities().clone()
    }

    /// Thread reported by the most recent `stopped` event.
    pub fn stopped_thread(&self) -> Option<i64> {
        self.session().stopped_thread()
    }

    /// The frame used for scopes and evaluation.
    pub fn frame_id(&self) -> Option<i64> {
        *self.frame_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the frame used for scopes and evaluation.
    pub fn select_frame(&self, frame_id: Option<i64>) {
        *self.frame_id.lock().unwrap_or_else(PoisonError::into_inner) = frame_id;
    }

    fn session(&self) -> MutexGuard<'_, DapSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&self, adapter_id: &str) -> Result<(), DapError> {
        if self.state() != SessionState::Uninitialized {
            return Err(DapError::InvalidState {
                operation: "initialize".into(),
                state: self.state().to_string(),
            });
        }
        let args = InitializeRequestArguments::for_adapter(adapter_id);
        let arguments = serde_json::to_value(args).map_err(DapError::serialization)?;
        let response = self.connection.request("initialize", Some(arguments)).await?;
        let caps: Capabilities = match response.body {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| DapError::InvalidResponse(format!("initialize body: {e}")))?,
            None => Capabilities::default(),
        };
        self.session().initialize(&caps)?;
        tracing::info!(session = %self.id, "debug session initialized");
        Ok(())
    }

    /// Send `launch` and move the session to Running.
    pub async fn launch(&self, args: &LaunchRequestArguments) -> Result<(), DapError> {
        self.session().require_active()?;
        let arguments = serde_json::to_value(args).map_err(DapError::serialization)?;
        self.connection.request("launch", Some(arguments)).await?;
        self.session().launch()
    }

    /// Send `configurationDone` if the adapter supports it.
    pub async fn configuration_done(&self) -> Result<(), DapError> {
        self.session().require_active()?;
        if !self.capabilities().supports_configuration_done_request {
            return Ok(());
        }
        self.connection.request("configurationDone", None).await?;
        Ok(())
    }

    /// List the debuggee's threads.
    pub async fn threads(&self) -> Result<Vec<Thread>, DapError> {
        self.session().require_active()?;
        let response = self.connection.request("threads", None).await?;
        let body: ThreadsResponseBody =
            serde_json::from_value(response.body.unwrap_or(serde_json::Value::Null))
                .map_err(|e| DapError::InvalidResponse(format!("threads body: {e}")))?;
        Ok(body.threads)
    }

    /// Fetch the call stack of a stopped thread.
    pub async fn stack_trace(&self, thread_id: i64) -> Result<Vec<StackFrame>, DapError> {
        self.session().require_stopped("stackTrace")?;
        let args = StackTraceArguments {
            thread_id,
            start_frame: None,
            levels: None,
        };
        let body: StackTraceResponseBody =
            self.connection.request_with("stackTrace", &args).await?;
        Ok(body.stack_frames)
    }

    /// Fetch the scopes of a frame.
    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, DapError> {
        self.session().require_stopped("scopes")?;
        let body: ScopesResponseBody = self
            .connection
            .request_with("scopes", &ScopesArguments { frame_id })
            .await?;
        Ok(body.scopes)
    }

    /// Fetch one page of a container's children.
    pub async fn variables(&self, args: &VariablesArguments) -> Result<Vec<Variable>, DapError> {
        self.session().require_stopped("variables")?;
        let body: VariablesResponseBody = self.connection.request_with("variables", args).await?;
        Ok(body.variables)
    }

    /// Assign a new value to a variable inside a container.
    pub async fn set_variable(
        &self,
        args: &SetVariableArguments,
    ) -> Result<SetVariableResponseBody, DapError> {
        self.session().require_stopped("setVariable")?;
        self.connection.request_with("setVariable", args).await
    }

    /// Evaluate an expression in the selected frame.
    pub async fn evaluate(
        &self,
        expression: &str,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, DapError> {
        self.session().require_active()?;
        let args = EvaluateArguments {
            expression: expression.into(),
            frame_id: self.frame_id(),
            context: context.map(|c| c.into()),
        };
        self.connection.request_with("evaluate", &args).await
    }

    /// Send `disconnect` and mark the session terminated.
    pub async fn disconnect(&self, terminate_debuggee: Option<bool>) -> Result<(), DapError> {
        // allowed in every state short of terminated
        if self.session().is_terminated() {
            return Err(DapError::Terminated);
        }
        let args = DisconnectArguments {
            restart: Some(false),
            terminate_debuggee,
        };
        let arguments = serde_json::to_value(args).map_err(DapError::serialization)?;
        let result = self.connection.request("disconnect", Some(arguments)).await;
        self.session().terminate();
        self.select_frame(None);
        result.map(|_| ())
    }

    /// Advance the session state machine from an adapter event.
    ///
    /// Events this client does not track are ignored.
    pub fn handle_event(&self, event: &Event) -> Result<(), DapError> {
        match event.event.as_str() {
            "stopped" => {
                let body: StoppedEventBody = serde_json::from_value(
                    event.body.clone().unwrap_or(serde_json::Value::Null),
                )
                .map_err(|e| DapError::InvalidResponse(format!("stopped event: {e}")))?;
                tracing::debug!(reason = ?body.reason, thread = ?body.thread_id, "debuggee stopped");
                self.select_frame(None);
                self.session().handle_stopped(body.thread_id)
            }
            "continued" => {
                self.select_frame(None);
                let mut session = self.session();
                if session.state() == SessionState::Stopped {
                    session.continue_execution()?;
                }
                Ok(())
            }
            "terminated" | "exited" => {
                tracing::info!(session = %self.id, event = %event.event, "debug session ended");
                self.select_frame(None);
                self.session().terminate();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
