//! Effective scope computation after conflicts are resolved.

use std::collections::HashMap;

use trellis_core::dependency::scope;

use crate::error::TransformError;
use crate::node::{DependencyNode, NodePath};

use super::{GraphTransformer, TransformContext};

/// Combine a parent's effective scope with a child's declared scope.
///
/// `test` and `provided` narrow whatever they touch; `runtime` wins over
/// `compile`. Unknown combinations keep the parent's scope.
pub fn propagate_scope(parent_scope: &str, dep_scope: &str) -> String {
    match (parent_scope, dep_scope) {
        (scope::COMPILE, scope::COMPILE) => scope::COMPILE,
        (scope::COMPILE, scope::RUNTIME) => scope::RUNTIME,
        (scope::RUNTIME, scope::COMPILE) => scope::RUNTIME,
        (scope::RUNTIME, scope::RUNTIME) => scope::RUNTIME,
        (scope::TEST, _) => scope::TEST,
        (_, scope::TEST) => scope::TEST,
        (scope::PROVIDED, _) => scope::PROVIDED,
        (_, scope::PROVIDED) => scope::PROVIDED,
        (_, scope::SYSTEM) => scope::SYSTEM,
        _ => parent_scope,
    }
    .to_string()
}

/// Sets each node's `effective_scope` and `request_context`.
///
/// The root and its direct dependencies keep their declared scope; deeper
/// nodes combine their parent's effective scope with their own via
/// [`propagate_scope`]. Conflict losers take the effective scope of their
/// winner, and their subtrees inherit from that.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyContextRefiner;

impl GraphTransformer for DependencyContextRefiner {
    fn name(&self) -> &'static str {
        "context-refiner"
    }

    fn transform_graph(
        &self,
        root: &mut DependencyNode,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        if !context.conflicts_resolved {
            return Err(TransformError::new(
                self.name(),
                "conflicts not resolved, run the conflict resolver first",
            ));
        }

        // Winners never sit below a loser, so their scopes are final after
        // the first pass and the second pass only changes losers.
        let mut path = Vec::new();
        refine(root, None, &mut path, &HashMap::new());

        let mut losers: Vec<(NodePath, NodePath)> = Vec::new();
        root.visit(&mut |node, path| {
            if let Some(ref winner) = node.winner {
                losers.push((path.to_vec(), winner.path.clone()));
            }
        });
        let adopted: HashMap<NodePath, String> = losers
            .into_iter()
            .filter_map(|(loser, winner)| Some((loser, root.node_at(&winner)?.scope().to_string())))
            .collect();

        refine(root, None, &mut path, &adopted);
        root.visit_mut(&mut |node, path| {
            if let (Some(scope), Some(winner)) = (adopted.get(path), node.winner.as_mut()) {
                winner.scope = scope.clone();
            }
        });
        tracing::debug!("Refined scopes, {} losers adopted their winner's", adopted.len());
        Ok(())
    }
}

fn refine(
    node: &mut DependencyNode,
    parent_scope: Option<&str>,
    path: &mut Vec<usize>,
    adopted: &HashMap<NodePath, String>,
) {
    let effective = match (adopted.get(path.as_slice()), parent_scope) {
        (Some(scope), _) => scope.clone(),
        (None, Some(parent)) => propagate_scope(parent, node.dependency.scope()),
        (None, None) => node.dependency.scope().to_string(),
    };
    let base = base_context(node).to_string();
    node.request_context = format!("{base}/{effective}");

    let child_parent = if node.is_root() { None } else { Some(effective.as_str()) };
    for (i, child) in node.children.iter_mut().enumerate() {
        path.push(i);
        refine(child, child_parent, path, adopted);
        path.pop();
    }
    node.effective_scope = Some(effective);
}

/// The caller's context, without the scope suffix a previous refinement appended.
fn base_context(node: &DependencyNode) -> &str {
    node.effective_scope
        .as_deref()
        .and_then(|scope| node.request_context.strip_suffix(scope))
        .and_then(|rest| rest.strip_suffix('/'))
        .unwrap_or(&node.request_context)
}
