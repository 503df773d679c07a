//! vartree-tree: lazy expression trees over a debug session.
//!
//! Containers resolve their children on demand: scopes for the
//! variables root, named and indexed pages for structured values, and
//! virtual range nodes for very large indexed collections. Nodes live
//! in an arena owned by [`ExpressionTree`] and keep their [`NodeId`]
//! across value mutation and re-evaluation.

pub mod arena;
pub mod error;
pub mod evaluate;
pub mod item;
pub mod mutation;
pub mod node;
pub mod roots;
pub mod service;
pub mod session;
pub mod sort;

#[cfg(test)]
pub(crate) mod mock;

pub use arena::NodeArena;
pub use error::TreeError;
pub use item::{InlineError, Severity, TreeItem};
pub use node::{ExpressionNode, NodeId, NodeKind};
pub use roots::is_root;
pub use service::{chunk_size, ExpressionTree, TreeOptions};
pub use session::DebugSession;
pub use sort::SortPolicy;
