//! Expression node entity.
//!
//! Every scope, variable, watch, console entry, virtual range and root
//! is one [`ExpressionNode`] tagged with a [`NodeKind`]. Kind-specific
//! behaviour (display name, description, tooltip) is computed from the
//! tag and the node's mutable state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use vartree_dap::{Scope, Source, Variable};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Generate a fresh, unique `NodeId`.
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A scope returned by the session (e.g. "Locals").
    Scope,
    /// A variable returned by a `variables` fetch.
    Variable,
    /// A client-side slice `[start..end]` of a large indexed collection.
    VirtualRange,
    /// A watch expression.
    Watch,
    /// A console (REPL) entry.
    Console,
    /// A structured value printed to the console.
    ConsoleVariable,
    /// Root of a hover evaluation; itself the evaluated expression.
    Hover,
    /// Root of the session variables tree.
    VariableRoot,
    /// Root of the watch expressions tree.
    WatchRoot,
    /// Root of the console tree.
    ConsoleRoot,
}

impl NodeKind {
    /// Whether nodes of this kind are tree roots.
    pub fn is_root(self) -> bool {
        matches!(
            self,
            NodeKind::Hover | NodeKind::VariableRoot | NodeKind::WatchRoot | NodeKind::ConsoleRoot
        )
    }

    /// Whether `setValue` applies to nodes of this kind.
    pub fn is_variable(self) -> bool {
        matches!(self, NodeKind::Variable | NodeKind::ConsoleVariable)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Scope => "scope",
            NodeKind::Variable => "variable",
            NodeKind::VirtualRange => "virtual range",
            NodeKind::Watch => "watch",
            NodeKind::Console => "console",
            NodeKind::ConsoleVariable => "console variable",
            NodeKind::Hover => "hover",
            NodeKind::VariableRoot => "variable root",
            NodeKind::WatchRoot => "watch root",
            NodeKind::ConsoleRoot => "console root",
        };
        f.write_str(s)
    }
}

/// One node of an expression tree.
///
/// Identity (`id`, `kind`) is fixed at creation. Value, type and
/// child counts are updated in place by mutation and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) container: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) name: Option<String>,
    pub(crate) evaluate_name: Option<String>,
    pub(crate) expression: Option<String>,
    pub(crate) value: String,
    pub(crate) variable_type: Option<String>,
    pub(crate) variables_reference: i64,
    pub(crate) named_variables: Option<i64>,
    pub(crate) indexed_variables: Option<i64>,
    pub(crate) start_of_variables: i64,
    pub(crate) preset_children: Option<Vec<NodeId>>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) source: Option<Source>,
    pub(crate) line: Option<i64>,
    pub(crate) available: bool,
    pub(crate) evaluated: bool,
    pub(crate) failed: bool,
    pub(crate) placeholder: String,
}

impl ExpressionNode {
    /// Create an empty node of the given kind.
    ///
    /// Every kind except [`NodeKind::Variable`] is a container;
    /// variables become containers when they carry a reference.
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            container: kind != NodeKind::Variable,
            parent,
            name: None,
            evaluate_name: None,
            expression: None,
            value: String::new(),
            variable_type: None,
            variables_reference: 0,
            named_variables: None,
            indexed_variables: None,
            start_of_variables: 0,
            preset_children: None,
            children: Vec::new(),
            source: None,
            line: None,
            available: false,
            evaluated: false,
            failed: false,
            placeholder: String::new(),
        }
    }

    /// Wrap a raw protocol variable.
    pub fn from_variable(kind: NodeKind, variable: Variable, parent: Option<NodeId>) -> Self {
        let mut node = Self::new(kind, parent);
        node.container = kind != NodeKind::Variable || variable.variables_reference != 0;
        node.name = Some(variable.name);
        node.evaluate_name = variable.evaluate_name;
        node.value = variable.value;
        node.variable_type = variable.variable_type;
        node.variables_reference = variable.variables_reference;
        node.named_variables = variable.named_variables;
        node.indexed_variables = variable.indexed_variables;
        node
    }

    /// Wrap a raw protocol scope.
    pub fn from_scope(scope: Scope, parent: NodeId) -> Self {
        let mut node = Self::new(NodeKind::Scope, Some(parent));
        node.name = Some(scope.name);
        node.variables_reference = scope.variables_reference;
        node.named_variables = scope.named_variables;
        node.indexed_variables = scope.indexed_variables;
        node
    }

    /// Create a virtual range covering `count` indexed children from `start`.
    pub fn virtual_range(parent: NodeId, variables_reference: i64, start: i64, count: i64) -> Self {
        let mut node = Self::new(NodeKind::VirtualRange, Some(parent));
        node.name = Some(format!("[{}..{}]", start, start.saturating_add(count.saturating_sub(1))));
        node.variables_reference = variables_reference;
        node.named_variables = Some(0);
        node.indexed_variables = Some(count);
        node.start_of_variables = start;
        node
    }

    /// Stable node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Variant tag.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Parent node, `None` for roots.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether this node holds children.
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Adapter handle for this node's children; 0 means none.
    pub fn variables_reference(&self) -> i64 {
        self.variables_reference
    }

    /// Number of named children, when reported.
    pub fn named_variables(&self) -> Option<i64> {
        self.named_variables
    }

    /// Number of indexed children, when reported.
    pub fn indexed_variables(&self) -> Option<i64> {
        self.indexed_variables
    }

    /// Index of the first indexed child this node covers.
    pub fn start_of_variables(&self) -> i64 {
        self.start_of_variables
    }

    /// Statically supplied children, if any.
    pub fn preset_children(&self) -> Option<&[NodeId]> {
        self.preset_children.as_deref()
    }

    /// Children recorded by the last resolution.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Raw value string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Type tag reported by the adapter.
    pub fn variable_type(&self) -> Option<&str> {
        self.variable_type.as_deref()
    }

    /// Expression that evaluates to this variable.
    pub fn evaluate_name(&self) -> Option<&str> {
        self.evaluate_name.as_deref()
    }

    /// Expression of a watch, console or hover node.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Origin source, for "go to definition".
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Origin line.
    pub fn line(&self) -> Option<i64> {
        self.line
    }

    /// Whether the last evaluation succeeded.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Whether this node can be expanded.
    pub fn is_expandable(&self) -> bool {
        self.preset_children.is_some() || self.variables_reference != 0
    }

    /// A container with no parent.
    pub fn is_root(&self) -> bool {
        self.container && self.parent.is_none()
    }

    /// Roots are always shown expanded.
    pub fn expanded(&self) -> bool {
        self.kind.is_root()
    }

    /// Display key.
    pub fn name(&self) -> String {
        match self.kind {
            NodeKind::Variable => self.variable_name(),
            NodeKind::ConsoleVariable => self.id.to_string(),
            NodeKind::Scope | NodeKind::VirtualRange => self.name.clone().unwrap_or_default(),
            NodeKind::Watch => match (&self.expression, self.evaluated) {
                (Some(expression), true) => expression.clone(),
                _ => self.id.to_string(),
            },
            NodeKind::Console => format!("log_{}", self.id),
            NodeKind::Hover => self.value.clone(),
            NodeKind::VariableRoot => format!("variableRoot_{}", self.id),
            NodeKind::WatchRoot => format!("watchRoot_{}", self.id),
            NodeKind::ConsoleRoot => format!("consoleRoot_{}", self.id),
        }
    }

    /// Label shown in place of the name; differs only for console entries.
    pub fn display_name(&self) -> String {
        match (self.kind, &self.expression) {
            (NodeKind::Console, Some(expression)) if self.evaluated => expression.clone(),
            _ => self.name(),
        }
    }

    /// Secondary text shown next to the name.
    pub fn description(&self) -> String {
        match self.kind {
            NodeKind::Variable | NodeKind::ConsoleVariable | NodeKind::Console => {
                self.value.clone()
            }
            NodeKind::Watch => {
                if self.available || self.failed {
                    self.value.clone()
                } else {
                    self.placeholder.clone()
                }
            }
            _ => String::new(),
        }
    }

    /// `"{source}:{line}"` when an origin is attached.
    pub fn badge(&self) -> String {
        match &self.source {
            Some(source) => format!(
                "{}:{}",
                source.name.as_deref().unwrap_or_default(),
                self.line.map(|l| l.to_string()).unwrap_or_default()
            ),
            None => String::new(),
        }
    }

    /// Hover text.
    pub fn tooltip(&self) -> String {
        match self.kind {
            NodeKind::Variable => self
                .variable_type
                .clone()
                .unwrap_or_else(|| self.description()),
            NodeKind::ConsoleVariable => self.value.clone(),
            _ => self.description(),
        }
    }

    /// Path segment used when building a node path.
    pub(crate) fn path_segment(&self) -> String {
        match self.kind {
            NodeKind::Hover => format!("hoverRoot_{}", self.id),
            _ => self.name(),
        }
    }

    fn variable_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(evaluate_name) = self.evaluate_name.as_deref() {
            if let Some(symbol) = symbol_accessor(evaluate_name) {
                return symbol.to_string();
            }
            if let Some(last) = evaluate_name.rsplit('.').next() {
                return last.to_string();
            }
        }
        self.id.to_string()
    }
}

/// Text inside the first `["..."]` accessor of an expression.
fn symbol_accessor(expression: &str) -> Option<&str> {
    let start = expression.find("[\"")? + 2;
    let end = expression.rfind("\"]")?;
    (end > start).then(|| &expression[start..end])
}
