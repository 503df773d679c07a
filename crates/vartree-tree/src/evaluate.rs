//! Evaluation of watch, console and hover nodes.

use crate::error::TreeError;
use crate::node::{NodeId, NodeKind};
use crate::service::ExpressionTree;
use crate::session::DebugSession;

/// Context passed to the adapter when none is given.
fn default_context(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Watch => Some("watch"),
        NodeKind::Console | NodeKind::Hover => Some("repl"),
        _ => None,
    }
}

impl<S: DebugSession> ExpressionTree<S> {
    /// Evaluate a watch, console or hover node.
    ///
    /// Adapter failures are not returned: the node becomes unavailable
    /// and its value holds the error message. Without a live session the
    /// node is marked unavailable and no request is sent. Errors are
    /// returned only for unknown or non-evaluatable nodes.
    pub async fn evaluate(&mut self, id: NodeId, context: Option<&str>) -> Result<(), TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::UnknownNode(id))?;
        let kind = node.kind;
        let default = default_context(kind).ok_or(TreeError::Unsupported {
            operation: "evaluate",
            kind,
        })?;
        let expression = node.expression.clone().unwrap_or_default();
        let context = context.unwrap_or(default);

        let Some(session) = self.live_session() else {
            let no_session = self.options.hover_no_session.clone();
            let node = self.arena.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
            node.evaluated = true;
            node.available = false;
            node.failed = false;
            if kind == NodeKind::Hover {
                node.value = no_session;
            }
            return Ok(());
        };

        tracing::debug!(%id, %expression, context, "evaluating");
        let outcome = session.evaluate(&expression, context).await;
        let node = self.arena.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        match outcome {
            Ok(Some(body)) => {
                node.evaluated = true;
                node.available = true;
                node.failed = false;
                node.value = body.result;
                node.variable_type = body.result_type;
                node.variables_reference = body.variables_reference;
                node.named_variables = body.named_variables;
                node.indexed_variables = body.indexed_variables;
            }
            Ok(None) => {
                tracing::debug!(%id, "evaluate returned no result");
            }
            Err(e) => {
                tracing::warn!(%id, %expression, "evaluate failed: {e}");
                node.evaluated = true;
                node.available = false;
                node.failed = true;
                node.value = e.to_string();
            }
        }
        Ok(())
    }

    /// Re-evaluate every watch listed under the root.
    pub async fn refresh_watches(&mut self) -> Result<(), TreeError> {
        let watches: Vec<NodeId> = self
            .arena
            .get(self.root)
            .and_then(|root| root.preset_children.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|id| self.arena.get(*id).is_some_and(|n| n.kind == NodeKind::Watch))
            .collect();
        for id in watches {
            self.evaluate(id, None).await?;
        }
        Ok(())
    }

    /// Text to copy for a watch node.
    ///
    /// Re-evaluates in the `clipboard` context when the adapter supports
    /// value formatting (empty on failure); otherwise returns the last
    /// evaluated value.
    pub async fn clipboard_value(&self, id: NodeId) -> Result<String, TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::UnknownNode(id))?;
        if node.kind != NodeKind::Watch {
            return Err(TreeError::Unsupported {
                operation: "copy value",
                kind: node.kind,
            });
        }
        let session = self
            .live_session()
            .filter(|s| s.capabilities().supports_value_formatting_options);
        let Some(session) = session else {
            return Ok(node.value.clone());
        };
        let expression = node.expression.clone().unwrap_or_default();
        match session.evaluate(&expression, "clipboard").await {
            Ok(Some(body)) => Ok(body.result),
            Ok(None) => Ok(String::new()),
            Err(e) => {
                tracing::debug!(%id, "clipboard evaluate failed: {e}");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vartree_dap::DapCapabilities;

    use super::*;
    use crate::item::TreeItem;
    use crate::mock::{eval_body, MockSession};
    use crate::service::TreeOptions;

    fn watch_tree(session: MockSession) -> (ExpressionTree<MockSession>, Arc<MockSession>) {
        let session = Arc::new(session);
        let tree = ExpressionTree::watch(Some(Arc::clone(&session)), TreeOptions::default());
        (tree, session)
    }

    #[tokio::test]
    async fn watch_success_sets_result_and_counts() {
        let mut session = MockSession::default();
        let mut body = eval_body("[1, 2, 3]", 30);
        body.indexed_variables = Some(3);
        session.evaluations.insert("v".into(), Ok(body));
        let (mut tree, session) = watch_tree(session);
        let watch = tree.add_watch("v").unwrap();

        let before = tree.node(watch).unwrap();
        assert_eq!(before.description(), "not available");
        assert_eq!(before.name(), watch.to_string());

        tree.evaluate(watch, None).await.unwrap();

        let node = tree.node(watch).unwrap();
        assert!(node.available());
        assert_eq!(node.name(), "v");
        assert_eq!(node.description(), "[1, 2, 3]");
        assert_eq!(node.variables_reference(), 30);
        assert_eq!(node.indexed_variables(), Some(3));
        assert_eq!(
            session.evaluate_calls.lock().unwrap().clone(),
            vec![("v".to_string(), "watch".to_string())]
        );

        let children = tree.resolve_children(Some(watch)).await;
        assert_eq!(children.len(), 3);
    }

    #[tokio::test]
    async fn watch_failure_marks_unavailable_with_message() {
        let mut session = MockSession::default();
        session
            .evaluations
            .insert("nope".into(), Err("cannot find value `nope`".into()));
        let (mut tree, _session) = watch_tree(session);
        let watch = tree.add_watch("nope").unwrap();

        tree.evaluate(watch, None).await.unwrap();

        let node = tree.node(watch).unwrap();
        assert!(!node.available());
        assert_eq!(node.name(), "nope");
        assert_eq!(node.description(), "cannot find value `nope`");
        assert_eq!(node.value(), "cannot find value `nope`");
    }

    #[tokio::test]
    async fn watch_without_session_is_unavailable_without_request() {
        let mut tree: ExpressionTree<MockSession> =
            ExpressionTree::watch(None, TreeOptions::default());
        let watch = tree.add_watch("v").unwrap();

        tree.evaluate(watch, None).await.unwrap();

        let node = tree.node(watch).unwrap();
        assert!(!node.available());
        assert_eq!(node.name(), "v");
        assert_eq!(node.description(), "not available");
    }

    #[tokio::test]
    async fn terminated_session_counts_as_no_session() {
        let (mut tree, session) = watch_tree(MockSession::default());
        let watch = tree.add_watch("v").unwrap();
        session.terminate();

        tree.evaluate(watch, None).await.unwrap();

        assert_eq!(session.request_count(), 0);
        assert!(!tree.node(watch).unwrap().available());
    }

    #[tokio::test]
    async fn explicit_context_overrides_default() {
        let (mut tree, session) = watch_tree(MockSession::default());
        let watch = tree.add_watch("v").unwrap();
        tree.evaluate(watch, Some("hover")).await.unwrap();
        assert_eq!(session.evaluate_calls.lock().unwrap()[0].1, "hover");
    }

    #[tokio::test]
    async fn refresh_watches_evaluates_each_preset() {
        let mut session = MockSession::default();
        session.evaluations.insert("a".into(), Ok(eval_body("1", 0)));
        session.evaluations.insert("b".into(), Ok(eval_body("2", 0)));
        let (mut tree, session) = watch_tree(session);
        let a = tree.add_watch("a").unwrap();
        let b = tree.add_watch("b").unwrap();

        tree.refresh_watches().await.unwrap();

        assert_eq!(session.evaluate_calls.lock().unwrap().len(), 2);
        assert_eq!(tree.node(a).unwrap().description(), "1");
        assert_eq!(tree.node(b).unwrap().description(), "2");
    }

    #[tokio::test]
    async fn console_entry_uses_repl_and_displays_expression() {
        let mut session = MockSession::default();
        session.evaluations.insert("1 + 1".into(), Ok(eval_body("2", 0)));
        let session = Arc::new(session);
        let mut tree = ExpressionTree::console(Some(Arc::clone(&session)), TreeOptions::default());
        let entry = tree.add_console_entry("1 + 1").unwrap();

        tree.evaluate(entry, None).await.unwrap();

        let node = tree.node(entry).unwrap();
        assert_eq!(node.display_name(), "1 + 1");
        assert_eq!(node.name(), format!("log_{entry}"));
        assert_eq!(node.description(), "2");
        assert_eq!(session.evaluate_calls.lock().unwrap()[0].1, "repl");
    }

    #[tokio::test]
    async fn console_failure_keeps_entry_with_message() {
        let mut session = MockSession::default();
        session.evaluations.insert("x".into(), Err("not in scope".into()));
        let mut tree =
            ExpressionTree::console(Some(Arc::new(session)), TreeOptions::default());
        let entry = tree.add_console_entry("x").unwrap();

        tree.evaluate(entry, None).await.unwrap();

        let node = tree.node(entry).unwrap();
        assert!(!node.available());
        assert_eq!(node.display_name(), "x");
        assert_eq!(node.description(), "not in scope");
    }

    #[tokio::test]
    async fn hover_name_tracks_result() {
        let mut session = MockSession::default();
        session
            .evaluations
            .insert("point".into(), Ok(eval_body("Point { .. }", 44)));
        session.named.insert(44, vec![crate::mock::var("x", "1", 0)]);
        let mut tree =
            ExpressionTree::hover(Some(Arc::new(session)), TreeOptions::default(), "point");
        let root = tree.root();

        assert!(tree.resolve_children(Some(root)).await.is_empty());
        tree.evaluate(root, None).await.unwrap();

        let node = tree.node(root).unwrap();
        assert!(node.available());
        assert_eq!(node.name(), "Point { .. }");
        let children = tree.resolve_children(Some(root)).await;
        assert!(matches!(children.as_slice(), [TreeItem::Node(_)]));
    }

    #[tokio::test]
    async fn hover_without_session_asks_to_start_one() {
        let mut tree: ExpressionTree<MockSession> =
            ExpressionTree::hover(None, TreeOptions::default(), "x");
        let root = tree.root();
        tree.evaluate(root, None).await.unwrap();
        let node = tree.node(root).unwrap();
        assert_eq!(node.name(), "Please start a debug session to evaluate");
        assert!(!node.available());
    }

    #[tokio::test]
    async fn hover_failure_shows_message() {
        let mut session = MockSession::default();
        session.evaluations.insert("x".into(), Err("bad expression".into()));
        let mut tree = ExpressionTree::hover(Some(Arc::new(session)), TreeOptions::default(), "x");
        let root = tree.root();
        tree.evaluate(root, None).await.unwrap();
        assert_eq!(tree.node(root).unwrap().name(), "bad expression");
    }

    #[tokio::test]
    async fn variables_cannot_be_evaluated() {
        let mut tree: ExpressionTree<MockSession> =
            ExpressionTree::variables(None, TreeOptions::default());
        let root = tree.root();
        let err = tree.evaluate(root, None).await.unwrap_err();
        assert!(matches!(err, TreeError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn clipboard_uses_formatting_context_when_supported() {
        let mut session = MockSession {
            capabilities: DapCapabilities {
                supports_value_formatting_options: true,
                ..DapCapabilities::default()
            },
            ..MockSession::default()
        };
        session.evaluations.insert("v".into(), Ok(eval_body("full text", 0)));
        let (mut tree, session) = watch_tree(session);
        let watch = tree.add_watch("v").unwrap();

        assert_eq!(tree.clipboard_value(watch).await.unwrap(), "full text");
        assert_eq!(session.evaluate_calls.lock().unwrap()[0].1, "clipboard");
    }

    #[tokio::test]
    async fn clipboard_failure_is_empty() {
        let mut session = MockSession {
            capabilities: DapCapabilities {
                supports_value_formatting_options: true,
                ..DapCapabilities::default()
            },
            ..MockSession::default()
        };
        session.evaluations.insert("v".into(), Err("gone".into()));
        let (mut tree, _session) = watch_tree(session);
        let watch = tree.add_watch("v").unwrap();
        assert_eq!(tree.clipboard_value(watch).await.unwrap(), "");
    }

    #[tokio::test]
    async fn clipboard_falls_back_to_last_value() {
        let mut session = MockSession::default();
        session.evaluations.insert("v".into(), Ok(eval_body("42", 0)));
        let (mut tree, session) = watch_tree(session);
        let watch = tree.add_watch("v").unwrap();
        tree.evaluate(watch, None).await.unwrap();

        assert_eq!(tree.clipboard_value(watch).await.unwrap(), "42");
        assert_eq!(session.evaluate_calls.lock().unwrap().len(), 1);
    }
}
