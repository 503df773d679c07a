//! Plain-text rendering of expression trees.

use std::fmt::Write as _;

use vartree_tree::{DebugSession, ExpressionNode, ExpressionTree, NodeId, NodeKind, TreeItem};

/// One line for a node: marker, name, description, type and badge.
pub fn format_node(node: &ExpressionNode) -> String {
    let marker = if node.is_expandable() { '+' } else { '-' };
    let mut line = format!("{marker} {}", node.display_name());
    let description = node.description();
    if !description.is_empty() {
        let _ = write!(line, " = {description}");
    }
    if let Some(ty) = node.variable_type() {
        let _ = write!(line, " ({ty})");
    }
    let badge = node.badge();
    if !badge.is_empty() {
        let _ = write!(line, "  @{badge}");
    }
    line
}

/// Render the tree below its root, showing `depth` levels.
///
/// A hover root is itself a value and is printed first, with its
/// children indented beneath it.
pub async fn render_tree<S: DebugSession>(tree: &mut ExpressionTree<S>, depth: usize) -> String {
    let mut out = String::new();
    let root = tree.root();
    let mut indent_base = 0;
    if let Some(node) = tree.node(root).filter(|n| n.kind() == NodeKind::Hover) {
        let _ = writeln!(out, "{}", format_node(node));
        indent_base = 1;
    }

    let mut stack: Vec<(TreeItem, usize)> = Vec::new();
    if depth > 0 {
        push_children(tree, root, 0, &mut stack).await;
    }
    while let Some((item, level)) = stack.pop() {
        let indent = "  ".repeat(indent_base + level);
        match item {
            TreeItem::Error(err) => {
                if err.visible {
                    let _ = writeln!(out, "{indent}! {}", err.message);
                }
            }
            TreeItem::Node(id) => {
                let Some(node) = tree.node(id) else {
                    continue;
                };
                let _ = writeln!(out, "{indent}{}", format_node(node));
                let expandable = node.is_expandable();
                if expandable && level + 1 < depth {
                    push_children(tree, id, level + 1, &mut stack).await;
                }
            }
        }
    }
    out
}

async fn push_children<S: DebugSession>(
    tree: &mut ExpressionTree<S>,
    parent: NodeId,
    level: usize,
    stack: &mut Vec<(TreeItem, usize)>,
) {
    let mut children = tree.resolve_children(Some(parent)).await;
    tree.sort_items(&mut children);
    stack.extend(children.into_iter().rev().map(|item| (item, level)));
}
