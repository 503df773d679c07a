//! Root variants and their child population.
//!
//! | Root | Children |
//! |---|---|
//! | variables | session scopes, fetched on resolve |
//! | watch | preset watch nodes, replaced with [`ExpressionTree::update_preset_children`] |
//! | console | preset console entries, kept in insertion order |
//! | hover | the root itself is evaluated; children come from its result |

use std::sync::Arc;

use vartree_dap::Variable;

use crate::error::TreeError;
use crate::node::{ExpressionNode, NodeId, NodeKind};
use crate::service::{ExpressionTree, TreeOptions};
use crate::session::DebugSession;
use crate::sort::SortPolicy;

/// Whether `node` is a tree root: an existing container with no parent.
pub fn is_root(node: Option<&ExpressionNode>) -> bool {
    node.is_some_and(ExpressionNode::is_root)
}

impl<S: DebugSession> ExpressionTree<S> {
    /// Tree whose root resolves to the session's scopes.
    pub fn variables(session: Option<Arc<S>>, options: TreeOptions) -> Self {
        let root = ExpressionNode::new(NodeKind::VariableRoot, None);
        Self::with_root(session, root, SortPolicy::Default, options)
    }

    /// Tree of watch expressions, initially empty.
    pub fn watch(session: Option<Arc<S>>, options: TreeOptions) -> Self {
        let mut root = ExpressionNode::new(NodeKind::WatchRoot, None);
        root.preset_children = Some(Vec::new());
        Self::with_root(session, root, SortPolicy::Default, options)
    }

    /// Console tree, initially empty and ordered by insertion.
    pub fn console(session: Option<Arc<S>>, options: TreeOptions) -> Self {
        let mut root = ExpressionNode::new(NodeKind::ConsoleRoot, None);
        root.preset_children = Some(Vec::new());
        Self::with_root(session, root, SortPolicy::InsertionOrder, options)
    }

    /// Tree rooted at a single hover expression.
    pub fn hover(session: Option<Arc<S>>, options: TreeOptions, expression: impl Into<String>) -> Self {
        let mut root = ExpressionNode::new(NodeKind::Hover, None);
        root.expression = Some(expression.into());
        root.value = options.hover_not_available.clone();
        Self::with_root(session, root, SortPolicy::Default, options)
    }

    /// Whether `id` names a root of this tree.
    pub fn is_root(&self, id: NodeId) -> bool {
        is_root(self.arena.get(id))
    }

    /// Create a watch node under the watch root without listing it.
    ///
    /// The node stays in the arena until the next
    /// [`update_preset_children`](Self::update_preset_children), which
    /// drops it unless it is listed there.
    pub fn create_watch(&mut self, expression: impl Into<String>) -> Result<NodeId, TreeError> {
        self.require_root_kind(NodeKind::WatchRoot, "create watch")?;
        let mut node = ExpressionNode::new(NodeKind::Watch, Some(self.root));
        node.expression = Some(expression.into());
        node.placeholder = self.options.watch_not_available.clone();
        Ok(self.arena.insert(node))
    }

    /// Create a watch node and append it to the root's presets.
    pub fn add_watch(&mut self, expression: impl Into<String>) -> Result<NodeId, TreeError> {
        let id = self.create_watch(expression)?;
        self.push_preset(id);
        Ok(id)
    }

    /// Create a console entry under the console root without listing it.
    ///
    /// Swept like [`create_watch`](Self::create_watch) nodes.
    pub fn create_console_entry(
        &mut self,
        expression: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.require_root_kind(NodeKind::ConsoleRoot, "create console entry")?;
        let mut node = ExpressionNode::new(NodeKind::Console, Some(self.root));
        node.expression = Some(expression.into());
        Ok(self.arena.insert(node))
    }

    /// Create a console entry and append it to the root's presets.
    pub fn add_console_entry(&mut self, expression: impl Into<String>) -> Result<NodeId, TreeError> {
        let id = self.create_console_entry(expression)?;
        self.push_preset(id);
        Ok(id)
    }

    /// Append a structured value printed by the adapter to the console.
    pub fn add_console_variable(&mut self, variable: Variable) -> Result<NodeId, TreeError> {
        self.require_root_kind(NodeKind::ConsoleRoot, "add console variable")?;
        let node = ExpressionNode::from_variable(NodeKind::ConsoleVariable, variable, Some(self.root));
        let id = self.arena.insert(node);
        self.push_preset(id);
        Ok(id)
    }

    /// Replace the preset children of a watch or console root.
    ///
    /// Every id must already belong to this tree. Presets that are not
    /// kept are dropped with their descendants.
    pub fn update_preset_children(&mut self, presets: Vec<NodeId>) -> Result<(), TreeError> {
        let root = self.root;
        let kind = self.arena.get(root).map(|n| n.kind).ok_or(TreeError::UnknownNode(root))?;
        if !matches!(kind, NodeKind::WatchRoot | NodeKind::ConsoleRoot) {
            return Err(TreeError::Unsupported {
                operation: "update preset children",
                kind,
            });
        }
        if let Some(missing) = presets.iter().find(|id| **id == root || !self.arena.contains(**id)) {
            return Err(TreeError::UnknownNode(*missing));
        }

        for id in &presets {
            if let Some(node) = self.arena.get_mut(*id) {
                node.parent = Some(root);
            }
        }
        let Some(root_node) = self.arena.get_mut(root) else {
            return Err(TreeError::UnknownNode(root));
        };
        root_node.preset_children = Some(presets.clone());
        root_node.children.retain(|id| presets.contains(id));
        // Dropped presets and created-but-never-listed entries alike.
        for id in self.arena.children_of(root) {
            if !presets.contains(&id) {
                self.arena.remove_subtree(id);
            }
        }
        tracing::debug!(root = %root, count = presets.len(), "preset children replaced");
        Ok(())
    }

    /// Remove one preset child of a watch or console root.
    pub fn remove_preset_child(&mut self, id: NodeId) -> Result<(), TreeError> {
        let presets: Vec<NodeId> = self
            .arena
            .get(self.root)
            .and_then(|root| root.preset_children.as_ref())
            .map(|p| p.iter().copied().filter(|p| *p != id).collect())
            .unwrap_or_default();
        self.update_preset_children(presets)
    }

    fn require_root_kind(&self, expected: NodeKind, operation: &'static str) -> Result<(), TreeError> {
        let kind = self
            .arena
            .get(self.root)
            .map(|n| n.kind)
            .ok_or(TreeError::UnknownNode(self.root))?;
        if kind == expected {
            Ok(())
        } else {
            Err(TreeError::Unsupported { operation, kind })
        }
    }

    fn push_preset(&mut self, id: NodeId) {
        if let Some(root) = self.arena.get_mut(self.root) {
            root.preset_children.get_or_insert_with(Vec::new).push(id);
        }
    }
}
