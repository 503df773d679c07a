//! The request interface the tree needs from a debug session.

use vartree_dap::{
    DapCapabilities, DapClient, DapError, EvaluateResponseBody, Scope, SetVariableArguments,
    SetVariableResponseBody, Variable, VariablesArguments,
};

/// A live debug session as seen by an [`crate::ExpressionTree`].
///
/// Implemented for [`DapClient`]; tests substitute an in-memory session.
#[allow(async_fn_in_trait)]
pub trait DebugSession {
    /// Session identifier.
    fn id(&self) -> &str;

    /// Whether the session has ended. Terminated sessions are never sent requests.
    fn is_terminated(&self) -> bool;

    /// Capability flags advertised by the adapter.
    fn capabilities(&self) -> DapCapabilities;

    /// Top-level scopes of the currently selected frame.
    async fn scopes(&self) -> Result<Vec<Scope>, DapError>;

    /// One page of a container's children.
    async fn variables(&self, args: VariablesArguments) -> Result<Vec<Variable>, DapError>;

    /// Assign a value to a named child of a container.
    async fn set_variable(
        &self,
        args: SetVariableArguments,
    ) -> Result<SetVariableResponseBody, DapError>;

    /// Evaluate an expression in the given context (`watch`, `repl`, `hover`, `clipboard`).
    async fn evaluate(
        &self,
        expression: &str,
        context: &str,
    ) -> Result<Option<EvaluateResponseBody>, DapError>;
}

impl DebugSession for DapClient {
    fn id(&self) -> &str {
        DapClient::id(self)
    }

    fn is_terminated(&self) -> bool {
        DapClient::is_terminated(self)
    }

    fn capabilities(&self) -> DapCapabilities {
        DapClient::capabilities(self)
    }

    async fn scopes(&self) -> Result<Vec<Scope>, DapError> {
        match self.frame_id() {
            Some(frame_id) => DapClient::scopes(self, frame_id).await,
            None => {
                tracing::debug!(session = %DapClient::id(self), "no frame selected, no scopes");
                Ok(Vec::new())
            }
        }
    }

    async fn variables(&self, args: VariablesArguments) -> Result<Vec<Variable>, DapError> {
        DapClient::variables(self, &args).await
    }

    async fn set_variable(
        &self,
        args: SetVariableArguments,
    ) -> Result<SetVariableResponseBody, DapError> {
        DapClient::set_variable(self, &args).await
    }

    async fn evaluate(
        &self,
        expression: &str,
        context: &str,
    ) -> Result<Option<EvaluateResponseBody>, DapError> {
        DapClient::evaluate(self, expression, Some(context))
            .await
            .map(Some)
    }
}
