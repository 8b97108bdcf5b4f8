//! Conflict marking: groups nodes that stand for the same logical artifact.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use crate::error::TransformError;
use crate::node::{ConflictId, DependencyNode};

use super::{GraphTransformer, TransformContext};

/// Assigns every non-root node a [`ConflictId`].
///
/// A node's keys are its artifact identity (`group:artifact:classifier:extension`)
/// plus the identity of every coordinate it was relocated from. Nodes sharing
/// any key end up in one group, transitively. Keys are unioned in a disjoint
/// set, so the grouping does not depend on the order nodes are visited in.
/// A group is labelled by its lexicographically smallest key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictMarker;

impl GraphTransformer for ConflictMarker {
    fn name(&self) -> &'static str {
        "conflict-marker"
    }

    fn transform_graph(
        &self,
        root: &mut DependencyNode,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        let mut keys = KeyTable::default();
        let mut node_keys: Vec<Vec<usize>> = Vec::new();
        root.visit(&mut |node, path| {
            if path.is_empty() {
                return;
            }
            let mut ids = vec![keys.intern(node.artifact().identity())];
            ids.extend(node.aliases.iter().map(|alias| keys.intern(alias.identity())));
            node_keys.push(ids);
        });

        let mut sets = UnionFind::<usize>::new(keys.len());
        for ids in &node_keys {
            if let Some((&first, rest)) = ids.split_first() {
                for &other in rest {
                    sets.union(first, other);
                }
            }
        }

        let mut labels: HashMap<usize, usize> = HashMap::new();
        for key in 0..keys.len() {
            let set = sets.find_mut(key);
            let label = labels.entry(set).or_insert(key);
            if keys.name(key) < keys.name(*label) {
                *label = key;
            }
        }
        let ids: HashMap<usize, ConflictId> = labels
            .into_iter()
            .map(|(set, label)| (set, ConflictId::new(keys.name(label))))
            .collect();

        let mut assigned = node_keys.iter();
        let mut missing = false;
        root.visit_mut(&mut |node, path| {
            if path.is_empty() {
                node.conflict_id = None;
                return;
            }
            let id = assigned
                .next()
                .and_then(|own| own.first())
                .and_then(|&key| ids.get(&sets.find(key)));
            match id {
                Some(id) => node.conflict_id = Some(id.clone()),
                None => missing = true,
            }
        });
        if missing {
            return Err(TransformError::new(
                self.name(),
                "graph changed while conflict ids were being assigned",
            ));
        }

        tracing::debug!(
            "Marked {} nodes into {} conflict groups",
            node_keys.len(),
            ids.len()
        );
        context.conflict_groups = Some(ids.len());
        Ok(())
    }
}

/// Interned conflict keys.
#[derive(Debug, Default)]
struct KeyTable {
    index: HashMap<String, usize>,
    names: Vec<String>,
}

impl KeyTable {
    fn intern(&mut self, key: String) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.names.len();
        self.names.push(key.clone());
        self.index.insert(key, i);
        i
    }

    fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}
