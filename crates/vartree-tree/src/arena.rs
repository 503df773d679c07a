//! Node storage keyed by [`NodeId`].

use std::collections::HashMap;

use crate::node::{ExpressionNode, NodeId};

/// Owns every node of one expression tree.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: HashMap<NodeId, ExpressionNode>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its id.
    pub fn insert(&mut self, node: ExpressionNode) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&ExpressionNode> {
        self.nodes.get(&id)
    }

    /// Look up a node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ExpressionNode> {
        self.nodes.get_mut(&id)
    }

    /// Whether the arena holds `id`.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node whose parent is `parent`, listed or not.
    pub fn children_of(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.parent == Some(parent))
            .map(|node| node.id)
            .collect()
    }

    /// Remove a node together with its resolved and preset descendants.
    pub fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                stack.extend(node.preset_children.unwrap_or_default());
            }
        }
    }

    /// Slash-separated path from the root to `id`.
    pub fn path(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.nodes.get(&cur)?;
            segments.push(node.path_segment());
            current = node.parent;
        }
        segments.reverse();
        Some(segments.join("/"))
    }
}
