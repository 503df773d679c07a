//! Sibling ordering.

use std::cmp::Ordering;

use crate::node::{ExpressionNode, NodeKind};

/// How a tree orders sibling nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortPolicy {
    /// Leaves before containers, then by name within one kind.
    #[default]
    Default,
    /// Keep emission order; only missing nodes move to the end.
    InsertionOrder,
}

impl SortPolicy {
    /// Compare two siblings. `None` stands for an entry with no node
    /// (an inline error) and always sorts last.
    pub fn compare(self, a: Option<&ExpressionNode>, b: Option<&ExpressionNode>) -> Ordering {
        let (a, b) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(a), Some(b)) => (a, b),
        };
        match self {
            SortPolicy::InsertionOrder => Ordering::Equal,
            SortPolicy::Default => compare_default(a, b),
        }
    }
}

fn compare_default(a: &ExpressionNode, b: &ExpressionNode) -> Ordering {
    a.is_container()
        .cmp(&b.is_container())
        .then_with(|| kind_rank(a.kind()).cmp(&kind_rank(b.kind())))
        .then_with(|| match a.kind() {
            // Range labels are numeric; order by offset.
            NodeKind::VirtualRange => a.start_of_variables().cmp(&b.start_of_variables()),
            _ => a.name().cmp(&b.name()),
        })
}

fn kind_rank(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Scope => 0,
        NodeKind::Variable => 1,
        NodeKind::ConsoleVariable => 2,
        NodeKind::VirtualRange => 3,
        NodeKind::Watch => 4,
        NodeKind::Console => 5,
        NodeKind::Hover => 6,
        NodeKind::VariableRoot => 7,
        NodeKind::WatchRoot => 8,
        NodeKind::ConsoleRoot => 9,
    }
}
