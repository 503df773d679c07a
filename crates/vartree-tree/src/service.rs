//! Child resolution engine.
//!
//! [`ExpressionTree::resolve_children`] decides, per container, whether
//! to ask the session for scopes, return preset children, fetch named
//! and indexed pages, or split a large indexed collection into virtual
//! range nodes that are fetched only when expanded.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use vartree_config::TreeConfig;
use vartree_dap::{Source, VariablesArguments, VariablesFilter};

use crate::arena::NodeArena;
use crate::item::{InlineError, TreeItem};
use crate::node::{ExpressionNode, NodeId, NodeKind};
use crate::session::DebugSession;
use crate::sort::SortPolicy;

/// Tuning and labels shared by every node of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Base of the chunk-size progression.
    pub base_chunk_size: i64,
    /// Watch description before a successful evaluation.
    pub watch_not_available: String,
    /// Hover label before evaluation.
    pub hover_not_available: String,
    /// Hover label when evaluated without a session.
    pub hover_no_session: String,
}

impl From<&TreeConfig> for TreeOptions {
    fn from(config: &TreeConfig) -> Self {
        Self {
            base_chunk_size: i64::try_from(config.base_chunk_size).unwrap_or(i64::MAX),
            watch_not_available: config.watch_not_available.clone(),
            hover_not_available: config.hover_not_available.clone(),
            hover_no_session: config.hover_no_session.clone(),
        }
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::from(&TreeConfig::default())
    }
}

/// Size of each virtual range for a collection of `indexed` elements.
///
/// Starts at `base` and multiplies by `base` while `indexed` exceeds
/// `chunk * base`, so a collection never splits into more than `base`
/// top-level ranges.
pub fn chunk_size(indexed: i64, base: i64) -> i64 {
    let base = base.max(2);
    let mut chunk = base;
    while chunk
        .checked_mul(base)
        .is_some_and(|limit| indexed > limit)
    {
        chunk *= base;
    }
    chunk
}

/// One expression tree bound to an optional debug session.
///
/// The tree owns every node in a [`NodeArena`]. All operations take
/// `&mut self`, so concurrent resolutions of one tree are serialized by
/// the caller and the last one to finish owns the child list.
pub struct ExpressionTree<S> {
    pub(crate) session: Option<Arc<S>>,
    pub(crate) arena: NodeArena,
    pub(crate) root: NodeId,
    pub(crate) policy: SortPolicy,
    pub(crate) options: TreeOptions,
    pub(crate) source: Option<Source>,
    pub(crate) line: Option<i64>,
}

impl<S> fmt::Debug for ExpressionTree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionTree")
            .field("root", &self.root)
            .field("nodes", &self.arena.len())
            .field("has_session", &self.session.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S: DebugSession> ExpressionTree<S> {
    pub(crate) fn with_root(
        session: Option<Arc<S>>,
        root: ExpressionNode,
        policy: SortPolicy,
        options: TreeOptions,
    ) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(root);
        Self {
            session,
            arena,
            root,
            policy,
            options,
            source: None,
            line: None,
        }
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&ExpressionNode> {
        self.arena.get(id)
    }

    /// All nodes currently held by the tree.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Slash-separated path of a node.
    pub fn path(&self, id: NodeId) -> Option<String> {
        self.arena.path(id)
    }

    /// The session this tree talks to.
    pub fn session(&self) -> Option<&Arc<S>> {
        self.session.as_ref()
    }

    /// Replace the session; existing nodes keep their state.
    pub fn attach_session(&mut self, session: Option<Arc<S>>) {
        self.session = session;
    }

    /// Origin attached to every expandable variable created from now on.
    pub fn set_source(&mut self, source: Option<Source>, line: Option<i64>) {
        self.source = source;
        self.line = line;
    }

    /// Labels and chunk base in effect.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Sibling ordering of this tree.
    pub fn sort_policy(&self) -> SortPolicy {
        self.policy
    }

    /// The session, unless absent or terminated.
    pub(crate) fn live_session(&self) -> Option<Arc<S>> {
        self.session
            .as_ref()
            .filter(|session| !session.is_terminated())
            .cloned()
    }

    /// Resolve the children of `parent`.
    ///
    /// Never fails: fetch errors become [`TreeItem::Error`] entries.
    /// The returned nodes replace the parent's recorded child list and
    /// previous children that were not returned again are dropped.
    pub async fn resolve_children(&mut self, parent: Option<NodeId>) -> Vec<TreeItem> {
        let Some(parent) = parent else {
            return Vec::new();
        };
        let Some(node) = self.arena.get(parent) else {
            tracing::warn!(%parent, "resolve requested for unknown node");
            return Vec::new();
        };
        let items = if node.kind == NodeKind::VariableRoot
            && node.variables_reference == 0
            && node.preset_children.is_none()
        {
            self.resolve_scopes(parent).await
        } else {
            self.do_resolve(parent).await
        };
        self.record_children(parent, &items);
        items
    }

    async fn resolve_scopes(&mut self, parent: NodeId) -> Vec<TreeItem> {
        let Some(session) = self.live_session() else {
            return Vec::new();
        };
        match session.scopes().await {
            Ok(scopes) => scopes
                .into_iter()
                .map(|scope| TreeItem::Node(self.arena.insert(ExpressionNode::from_scope(scope, parent))))
                .collect(),
            Err(e) => {
                tracing::warn!(session = %session.id(), "scopes failed: {e}");
                vec![TreeItem::Error(InlineError::new(e.to_string()))]
            }
        }
    }

    async fn do_resolve(&mut self, parent: NodeId) -> Vec<TreeItem> {
        let Some(node) = self.arena.get(parent) else {
            return Vec::new();
        };
        if let Some(presets) = &node.preset_children {
            return presets.iter().copied().map(TreeItem::Node).collect();
        }
        let Some(session) = self.live_session() else {
            return Vec::new();
        };
        let reference = node.variables_reference;
        if reference == 0 {
            return Vec::new();
        }
        let named = node.named_variables.unwrap_or(0);
        let indexed = node.indexed_variables.unwrap_or(0);
        let start = node.start_of_variables;

        let mut result = Vec::new();
        if named > 0 {
            let args = VariablesArguments {
                variables_reference: reference,
                filter: Some(VariablesFilter::Named),
                start: None,
                count: None,
            };
            self.fetch(&session, &mut result, parent, args).await;
        }

        if indexed > 0 {
            let chunk = chunk_size(indexed, self.options.base_chunk_size);
            if indexed > chunk {
                let chunks = indexed / chunk + i64::from(indexed % chunk != 0);
                for i in 0..chunks {
                    // i * chunk < indexed, so only the absolute offset can overflow.
                    let offset = i * chunk;
                    let count = chunk.min(indexed - offset);
                    let Some(range_start) = start
                        .checked_add(offset)
                        .filter(|s| s.checked_add(count - 1).is_some())
                    else {
                        tracing::warn!(%parent, start, offset, count, "range exceeds index space");
                        result.push(TreeItem::Error(InlineError::new(format!(
                            "elements beyond index {} cannot be addressed",
                            i64::MAX
                        ))));
                        break;
                    };
                    let range = ExpressionNode::virtual_range(parent, reference, range_start, count);
                    result.push(TreeItem::Node(self.arena.insert(range)));
                }
                tracing::debug!(%parent, indexed, chunk, chunks, "split into virtual ranges");
                return result;
            }
            let args = VariablesArguments {
                variables_reference: reference,
                filter: Some(VariablesFilter::Indexed),
                start: Some(start),
                count: Some(indexed),
            };
            self.fetch(&session, &mut result, parent, args).await;
        } else if named == 0 {
            // No counts reported: let the adapter return everything.
            let args = VariablesArguments {
                variables_reference: reference,
                filter: None,
                start: None,
                count: None,
            };
            self.fetch(&session, &mut result, parent, args).await;
        }

        result
    }

    /// Send one `variables` request and append the wrapped results.
    async fn fetch(
        &mut self,
        session: &S,
        result: &mut Vec<TreeItem>,
        parent: NodeId,
        args: VariablesArguments,
    ) {
        tracing::debug!(
            %parent,
            reference = args.variables_reference,
            filter = ?args.filter,
            start = ?args.start,
            count = ?args.count,
            "fetching variables"
        );
        match session.variables(args).await {
            Ok(variables) => {
                for variable in variables {
                    let mut node =
                        ExpressionNode::from_variable(NodeKind::Variable, variable, Some(parent));
                    if node.variables_reference != 0 {
                        node.source = self.source.clone();
                        node.line = self.line;
                    }
                    result.push(TreeItem::Node(self.arena.insert(node)));
                }
            }
            Err(e) => {
                tracing::warn!(%parent, "variables failed: {e}");
                result.push(TreeItem::Error(InlineError::new(e.to_string())));
            }
        }
    }

    fn record_children(&mut self, parent: NodeId, items: &[TreeItem]) {
        let fresh: Vec<NodeId> = items.iter().filter_map(TreeItem::node_id).collect();
        let keep: HashSet<NodeId> = fresh.iter().copied().collect();
        let Some(node) = self.arena.get_mut(parent) else {
            return;
        };
        let previous = std::mem::replace(&mut node.children, fresh);
        for id in previous.into_iter().filter(|id| !keep.contains(id)) {
            self.arena.remove_subtree(id);
        }
    }

    /// Order entries with this tree's sort policy; errors go last.
    pub fn sort_items(&self, items: &mut [TreeItem]) {
        items.sort_by(|a, b| {
            self.policy.compare(
                a.node_id().and_then(|id| self.arena.get(id)),
                b.node_id().and_then(|id| self.arena.get(id)),
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{scope, var, MockSession};

    fn container(
        tree: &mut ExpressionTree<MockSession>,
        reference: i64,
        named: Option<i64>,
        indexed: Option<i64>,
    ) -> NodeId {
        let mut raw = var("items", "Vec", reference);
        raw.named_variables = named;
        raw.indexed_variables = indexed;
        let node = ExpressionNode::from_variable(NodeKind::Variable, raw, Some(tree.root()));
        tree.arena.insert(node)
    }

    fn tree_with(session: MockSession) -> (ExpressionTree<MockSession>, Arc<MockSession>) {
        let session = Arc::new(session);
        let tree = ExpressionTree::variables(Some(Arc::clone(&session)), TreeOptions::default());
        (tree, session)
    }

    fn names(tree: &ExpressionTree<MockSession>, items: &[TreeItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| item.node_id())
            .filter_map(|id| tree.node(id))
            .map(|n| n.name())
            .collect()
    }

    #[test]
    fn chunk_size_progression() {
        assert_eq!(chunk_size(50, 100), 100);
        assert_eq!(chunk_size(150, 100), 100);
        assert_eq!(chunk_size(10_000, 100), 100);
        assert_eq!(chunk_size(10_001, 100), 10_000);
        assert_eq!(chunk_size(15_000, 100), 10_000);
        assert_eq!(chunk_size(100_000, 100), 10_000);
        assert_eq!(chunk_size(1_000_001, 100), 1_000_000);
    }

    #[test]
    fn chunk_size_survives_huge_counts() {
        let chunk = chunk_size(i64::MAX, 100);
        assert!(chunk > 0);
    }

    #[tokio::test]
    async fn no_parent_resolves_empty() {
        let (mut tree, session) = tree_with(MockSession::default());
        assert!(tree.resolve_children(None).await.is_empty());
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn variable_root_resolves_scopes() {
        let (mut tree, session) = tree_with(MockSession {
            scopes: vec![scope("Locals", 1, 2), scope("Globals", 2, 5)],
            ..MockSession::default()
        });
        let root = tree.root();
        let items = tree.resolve_children(Some(root)).await;

        assert_eq!(names(&tree, &items), vec!["Locals", "Globals"]);
        assert_eq!(session.scopes_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(session.variables_requests().is_empty());
        let locals = tree.node(items[0].node_id().unwrap()).unwrap();
        assert_eq!(locals.kind(), NodeKind::Scope);
        assert_eq!(locals.parent(), Some(root));
        assert_eq!(locals.variables_reference(), 1);
    }

    #[tokio::test]
    async fn small_indexed_collection_fetched_in_one_request() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, None, Some(42));

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(items.len(), 42);
        assert_eq!(
            session.variables_requests(),
            vec![VariablesArguments {
                variables_reference: 7,
                filter: Some(VariablesFilter::Indexed),
                start: Some(0),
                count: Some(42),
            }]
        );
    }

    #[tokio::test]
    async fn exactly_base_elements_are_not_chunked() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, None, Some(100));
        let items = tree.resolve_children(Some(parent)).await;
        assert_eq!(items.len(), 100);
        assert_eq!(session.variables_requests().len(), 1);
    }

    #[tokio::test]
    async fn large_collection_becomes_virtual_ranges_without_fetch() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, None, Some(150));

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(names(&tree, &items), vec!["[0..99]", "[100..149]"]);
        assert!(session.variables_requests().is_empty());
        let second = tree.node(items[1].node_id().unwrap()).unwrap();
        assert_eq!(second.kind(), NodeKind::VirtualRange);
        assert_eq!(second.variables_reference(), 7);
        assert_eq!(second.start_of_variables(), 100);
        assert_eq!(second.indexed_variables(), Some(50));
    }

    #[tokio::test]
    async fn fifteen_thousand_elements_use_ten_thousand_chunks() {
        let (mut tree, _session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, None, Some(15_000));
        let items = tree.resolve_children(Some(parent)).await;
        assert_eq!(names(&tree, &items), vec!["[0..9999]", "[10000..14999]"]);
    }

    #[tokio::test]
    async fn ranges_are_contiguous_and_cover_every_element() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 3, None, Some(100_000));

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(items.len(), 10);
        let mut expected_start = 0;
        let mut total = 0;
        for item in &items {
            let node = tree.node(item.node_id().unwrap()).unwrap();
            assert_eq!(node.start_of_variables(), expected_start);
            let count = node.indexed_variables().unwrap();
            expected_start += count;
            total += count;
        }
        assert_eq!(total, 100_000);
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn maximal_indexed_count_splits_without_overflow() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 3, None, Some(i64::MAX));

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(items.len(), 10);
        assert!(items.iter().all(|item| item.as_error().is_none()));
        let last = tree.node(items[9].node_id().unwrap()).unwrap();
        assert_eq!(last.start_of_variables(), 9_000_000_000_000_000_000);
        assert_eq!(last.name(), format!("[9000000000000000000..{}]", i64::MAX - 1));
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn range_past_the_index_space_becomes_inline_error() {
        let (mut tree, session) = tree_with(MockSession::default());
        let root = tree.root();
        let range = ExpressionNode::virtual_range(root, 3, i64::MAX - 50, 500);
        assert_eq!(range.name(), format!("[{}..{}]", i64::MAX - 50, i64::MAX));
        let parent = tree.arena.insert(range);

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(items.len(), 1);
        assert!(items[0].as_error().unwrap().visible);
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn expanding_a_range_recurses_with_its_offset() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 3, None, Some(15_000));
        let ranges = tree.resolve_children(Some(parent)).await;

        // [10000..14999] holds 5000 elements: split again into 100-element ranges.
        let second = ranges[1].node_id();
        let sub = tree.resolve_children(second).await;
        assert_eq!(sub.len(), 50);
        let first_sub = tree.node(sub[0].node_id().unwrap()).unwrap();
        assert_eq!(first_sub.name(), "[10000..10099]");

        let leaves = tree.resolve_children(sub[0].node_id()).await;
        assert_eq!(leaves.len(), 100);
        assert_eq!(
            session.variables_requests(),
            vec![VariablesArguments {
                variables_reference: 3,
                filter: Some(VariablesFilter::Indexed),
                start: Some(10_000),
                count: Some(100),
            }]
        );
        let first_leaf = tree.node(leaves[0].node_id().unwrap()).unwrap();
        assert_eq!(first_leaf.name(), "[10000]");
    }

    #[tokio::test]
    async fn named_entries_come_before_ranges() {
        let mut session = MockSession::default();
        session.named.insert(4, vec![var("len", "300", 0)]);
        let (mut tree, session) = tree_with(session);
        let parent = container(&mut tree, 4, Some(1), Some(300));

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(names(&tree, &items), vec!["len", "[0..99]", "[100..199]", "[200..299]"]);
        assert_eq!(session.variables_requests().len(), 1);
        assert_eq!(
            session.variables_requests()[0].filter,
            Some(VariablesFilter::Named)
        );
    }

    #[tokio::test]
    async fn missing_counts_fetch_unfiltered() {
        let mut session = MockSession::default();
        session.named.insert(9, vec![var("a", "1", 0), var("b", "{..}", 12)]);
        let (mut tree, session) = tree_with(session);
        let parent = container(&mut tree, 9, None, None);

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(names(&tree, &items), vec!["a", "b"]);
        assert_eq!(session.variables_requests()[0].filter, None);
        let a = tree.node(items[0].node_id().unwrap()).unwrap();
        let b = tree.node(items[1].node_id().unwrap()).unwrap();
        assert!(!a.is_container());
        assert!(b.is_container());
    }

    #[tokio::test]
    async fn leaf_resolves_empty_without_request() {
        let (mut tree, session) = tree_with(MockSession::default());
        let leaf = container(&mut tree, 0, None, None);
        assert!(tree.resolve_children(Some(leaf)).await.is_empty());
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn preset_children_returned_without_request() {
        let (mut tree, session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, Some(3), Some(500));
        let preset = tree
            .arena
            .insert(ExpressionNode::from_variable(NodeKind::Variable, var("p", "1", 0), Some(parent)));
        tree.arena.get_mut(parent).unwrap().preset_children = Some(vec![preset]);

        let first = tree.resolve_children(Some(parent)).await;
        let second = tree.resolve_children(Some(parent)).await;

        assert_eq!(first, vec![TreeItem::Node(preset)]);
        assert_eq!(first, second);
        assert_eq!(session.request_count(), 0);
        assert!(tree.node(preset).is_some());
    }

    #[tokio::test]
    async fn terminated_session_resolves_empty() {
        let (mut tree, session) = tree_with(MockSession {
            scopes: vec![scope("Locals", 1, 2)],
            ..MockSession::default()
        });
        let parent = container(&mut tree, 7, Some(2), Some(50_000));
        session.terminate();

        assert!(tree.resolve_children(Some(parent)).await.is_empty());
        let root = tree.root();
        assert!(tree.resolve_children(Some(root)).await.is_empty());
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn no_session_resolves_empty() {
        let mut tree: ExpressionTree<MockSession> =
            ExpressionTree::variables(None, TreeOptions::default());
        let parent = container(&mut tree, 7, Some(2), None);
        assert!(tree.resolve_children(Some(parent)).await.is_empty());
        let root = tree.root();
        assert!(tree.resolve_children(Some(root)).await.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_becomes_inline_error() {
        let (mut tree, _session) = tree_with(MockSession {
            variables_error: Some("frame is no longer valid".into()),
            ..MockSession::default()
        });
        let parent = container(&mut tree, 7, Some(2), None);

        let items = tree.resolve_children(Some(parent)).await;

        assert_eq!(
            items,
            vec![TreeItem::Error(InlineError::new("frame is no longer valid"))]
        );
        assert!(items[0].as_error().unwrap().visible);
    }

    #[tokio::test]
    async fn expandable_children_carry_tree_source() {
        let mut session = MockSession::default();
        session.named.insert(9, vec![var("leaf", "1", 0), var("inner", "{..}", 12)]);
        let (mut tree, _session) = tree_with(session);
        tree.set_source(
            Some(Source {
                name: Some("lib.rs".into()),
                ..Source::default()
            }),
            Some(40),
        );
        let parent = container(&mut tree, 9, Some(2), None);

        let items = tree.resolve_children(Some(parent)).await;

        let leaf = tree.node(items[0].node_id().unwrap()).unwrap();
        let inner = tree.node(items[1].node_id().unwrap()).unwrap();
        assert_eq!(leaf.badge(), "");
        assert_eq!(inner.badge(), "lib.rs:40");
    }

    #[tokio::test]
    async fn re_resolution_drops_previous_children() {
        let mut session = MockSession::default();
        session.named.insert(9, vec![var("inner", "{..}", 12)]);
        session.named.insert(12, vec![var("deep", "1", 0)]);
        let (mut tree, _session) = tree_with(session);
        let parent = container(&mut tree, 9, None, None);

        let first = tree.resolve_children(Some(parent)).await;
        let inner = first[0].node_id().unwrap();
        let deep = tree.resolve_children(Some(inner)).await[0].node_id().unwrap();

        let second = tree.resolve_children(Some(parent)).await;

        assert_ne!(second[0].node_id(), Some(inner));
        assert!(tree.node(inner).is_none());
        assert!(tree.node(deep).is_none());
        assert_eq!(tree.node(parent).unwrap().children(), &[second[0].node_id().unwrap()]);
    }

    #[tokio::test]
    async fn sort_items_puts_errors_last() {
        let (mut tree, _session) = tree_with(MockSession::default());
        let parent = container(&mut tree, 7, None, Some(3));
        let mut items = vec![TreeItem::Error(InlineError::new("x"))];
        items.extend(tree.resolve_children(Some(parent)).await);

        tree.sort_items(&mut items);

        assert!(items.last().unwrap().as_error().is_some());
        assert_eq!(names(&tree, &items), vec!["[0]", "[1]", "[2]"]);
    }
}
