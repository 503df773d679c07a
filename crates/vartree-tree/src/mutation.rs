//! In-place value mutation of variable nodes.

use vartree_dap::SetVariableArguments;

use crate::error::TreeError;
use crate::node::NodeId;
use crate::service::ExpressionTree;
use crate::session::DebugSession;

impl<S: DebugSession> ExpressionTree<S> {
    /// Whether the session advertises `supportsSetVariable` for this node.
    pub fn supports_set_variable(&self, id: NodeId) -> bool {
        let is_variable = self.arena.get(id).is_some_and(|n| n.kind.is_variable());
        is_variable
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.capabilities().supports_set_variable)
    }

    /// Assign `value` to a variable through its parent's reference.
    ///
    /// Without a live session, or for a node without a parent, this is a
    /// no-op. On success the node keeps its id and takes the value, type
    /// and child counts from the response. Adapter failures are returned
    /// and leave the node untouched.
    pub async fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.kind.is_variable() {
            return Err(TreeError::Unsupported {
                operation: "set value",
                kind: node.kind,
            });
        }
        let Some(session) = self.live_session() else {
            tracing::debug!(%id, "set value skipped: no live session");
            return Ok(());
        };
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let name = node
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| node.name());
        let variables_reference = self
            .arena
            .get(parent)
            .map(|p| p.variables_reference)
            .ok_or(TreeError::UnknownNode(parent))?;

        let args = SetVariableArguments {
            variables_reference,
            name,
            value: value.to_string(),
        };
        let body = session.set_variable(args).await.map_err(|e| {
            tracing::warn!(%id, "set value failed: {e}");
            e
        })?;

        let node = self.arena.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        node.value = body.value;
        node.variable_type = body.variable_type;
        node.variables_reference = body.variables_reference.unwrap_or(0);
        node.named_variables = body.named_variables;
        node.indexed_variables = body.indexed_variables;
        Ok(())
    }
}
