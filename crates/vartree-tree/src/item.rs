//! Entries of a resolved child list.

use crate::node::NodeId;

/// Severity of an inline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A failed request.
    Error,
}

/// A failure rendered in place of the children it prevented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineError {
    /// Always [`Severity::Error`] for fetch failures.
    pub severity: Severity,
    /// Whether there is any message to show.
    pub visible: bool,
    /// Error text reported by the adapter or transport.
    pub message: String,
}

impl InlineError {
    /// Build an error entry from a message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            severity: Severity::Error,
            visible: !message.is_empty(),
            message,
        }
    }
}

/// One entry in a resolved child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    /// A node stored in the tree's arena.
    Node(NodeId),
    /// A failed fetch, kept in the list so the tree stays usable.
    Error(InlineError),
}

impl TreeItem {
    /// The node id, if this entry is a node.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            TreeItem::Node(id) => Some(*id),
            TreeItem::Error(_) => None,
        }
    }

    /// The error entry, if this entry is one.
    pub fn as_error(&self) -> Option<&InlineError> {
        match self {
            TreeItem::Node(_) => None,
            TreeItem::Error(e) => Some(e),
        }
    }
}
