use thiserror::Error;
use vartree_dap::DapError;

use crate::node::{NodeId, NodeKind};

/// Errors returned by tree operations that report failure to the caller.
///
/// Child resolution never fails; see [`crate::TreeItem::Error`].
#[derive(Debug, Error)]
pub enum TreeError {
    /// The id does not name a node in this tree.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// The operation does not apply to this kind of node.
    #[error("cannot {operation} on a {kind} node")]
    Unsupported {
        /// Operation that was attempted.
        operation: &'static str,
        /// Kind of the node it was attempted on.
        kind: NodeKind,
    },

    /// The debug adapter rejected or failed the request.
    #[error(transparent)]
    Dap(#[from] DapError),
}
