//! Nearest-wins conflict resolution.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::conflict::VersionConflict;
use crate::error::TransformError;
use crate::node::{ConflictId, ConflictWinner, DependencyNode, NodePath};

use super::{GraphTransformer, TransformContext};

/// A live member of a conflict group at the shallowest depth the group reaches.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub node: &'a DependencyNode,
    pub path: &'a [usize],
}

/// Breaks ties between equally near candidates.
///
/// `candidates` is never empty, shares one depth, and is in pre-order.
pub trait WinnerSelector: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Index into `candidates` of the winner.
    fn select_winner(&self, candidates: &[Candidate<'_>]) -> usize;
}

/// The first candidate in depth-first declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestFirstDeclared;

impl WinnerSelector for NearestFirstDeclared {
    fn name(&self) -> &'static str {
        "first declared"
    }

    fn select_winner(&self, _candidates: &[Candidate<'_>]) -> usize {
        0
    }
}

/// The highest version; equal versions fall back to declaration order.
/// Candidates without a resolved version rank lowest.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestHighestVersion;

impl WinnerSelector for NearestHighestVersion {
    fn name(&self) -> &'static str {
        "highest version"
    }

    fn select_winner(&self, candidates: &[Candidate<'_>]) -> usize {
        let mut best = 0;
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            let current = candidates[best].node.version.as_ref();
            if candidate.node.version.as_ref() > current {
                best = i;
            }
        }
        best
    }
}

/// Picks one winner per conflict group: the shallowest member, ties broken
/// by the [`WinnerSelector`].
///
/// Nodes below a losing node are out of the running, as they would not be
/// part of the graph if the loser were removed. Losers stay in the tree and
/// point at their winner. A group with only such nodes gets no winner.
#[derive(Debug)]
pub struct ConflictResolver {
    selector: Box<dyn WinnerSelector>,
}

impl ConflictResolver {
    pub fn new(selector: Box<dyn WinnerSelector>) -> Self {
        Self { selector }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(Box::new(NearestFirstDeclared))
    }
}

struct Entry {
    path: NodePath,
    depth: usize,
    id: ConflictId,
}

impl GraphTransformer for ConflictResolver {
    fn name(&self) -> &'static str {
        "conflict-resolver"
    }

    fn transform_graph(
        &self,
        root: &mut DependencyNode,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        if context.conflict_groups.is_none() {
            return Err(TransformError::new(
                self.name(),
                "conflict ids missing, run the conflict marker first",
            ));
        }

        let mut entries = Vec::new();
        let mut unmarked = None;
        root.visit(&mut |node, path| {
            if path.is_empty() {
                return;
            }
            match &node.conflict_id {
                Some(id) => entries.push(Entry {
                    path: path.to_vec(),
                    depth: node.depth,
                    id: id.clone(),
                }),
                None => {
                    unmarked.get_or_insert_with(|| node.artifact().to_string());
                }
            }
        });
        if let Some(artifact) = unmarked {
            return Err(TransformError::new(
                self.name(),
                format!("{artifact} has no conflict id"),
            ));
        }

        let winners = self.pick_winners(root, &entries);
        self.apply(root, &entries, &winners, context);
        context.conflicts_resolved = true;
        Ok(())
    }
}

impl ConflictResolver {
    /// Winner entry index for every group that has one.
    fn pick_winners(&self, root: &DependencyNode, entries: &[Entry]) -> HashMap<ConflictId, usize> {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by_key(|&i| entries[i].depth);

        let mut winners: HashMap<ConflictId, usize> = HashMap::new();
        let mut losers: HashSet<&[usize]> = HashSet::new();
        let mut level_start = 0;
        while level_start < order.len() {
            let depth = entries[order[level_start]].depth;
            let level_end = order[level_start..]
                .iter()
                .position(|&i| entries[i].depth != depth)
                .map_or(order.len(), |offset| level_start + offset);
            let level = &order[level_start..level_end];

            let mut pending: Vec<(&ConflictId, Vec<usize>)> = Vec::new();
            for &i in level {
                let entry = &entries[i];
                if winners.contains_key(&entry.id) || is_dead(&entry.path, &losers) {
                    continue;
                }
                match pending.iter_mut().find(|(id, _)| **id == entry.id) {
                    Some((_, members)) => members.push(i),
                    None => pending.push((&entry.id, vec![i])),
                }
            }

            for (id, members) in pending {
                let candidates: Vec<Candidate<'_>> = members
                    .iter()
                    .filter_map(|&i| {
                        root.node_at(&entries[i].path).map(|node| Candidate {
                            node,
                            path: &entries[i].path,
                        })
                    })
                    .collect();
                if candidates.is_empty() {
                    continue;
                }
                let picked = self.selector.select_winner(&candidates).min(candidates.len() - 1);
                winners.insert(id.clone(), members[picked]);
            }

            for &i in level {
                let entry = &entries[i];
                if winners.get(&entry.id).is_some_and(|&w| w != i) {
                    losers.insert(&entry.path);
                }
            }
            level_start = level_end;
        }
        winners
    }

    fn apply(
        &self,
        root: &mut DependencyNode,
        entries: &[Entry],
        winners: &HashMap<ConflictId, usize>,
        context: &mut TransformContext,
    ) {
        let winner_refs: HashMap<&ConflictId, (ConflictWinner, usize)> = winners
            .iter()
            .filter_map(|(id, &i)| {
                let node = root.node_at(&entries[i].path)?;
                let winner = ConflictWinner {
                    path: entries[i].path.clone(),
                    artifact: node.artifact().clone(),
                    scope: node.scope().to_string(),
                };
                Some((id, (winner, node.depth)))
            })
            .collect();

        for (i, entry) in entries.iter().enumerate() {
            let Some(node) = root.node_at_mut(&entry.path) else {
                continue;
            };
            let won = winners.get(&entry.id) == Some(&i);
            match winner_refs.get(&entry.id) {
                Some((winner, winner_depth)) if !won => {
                    let requested = node.artifact().version();
                    let resolved = winner.artifact.version();
                    if requested != resolved {
                        let reason = if *winner_depth < entry.depth {
                            format!("nearest wins (depth {} vs {})", winner_depth, entry.depth)
                        } else {
                            format!("{} wins at depth {}", self.selector.name(), entry.depth)
                        };
                        context.conflicts.add(VersionConflict {
                            conflict_id: entry.id.clone(),
                            artifact: node.key(),
                            requested: requested.to_string(),
                            resolved: resolved.to_string(),
                            requested_depth: entry.depth,
                            resolved_depth: *winner_depth,
                            reason,
                        });
                    }
                    node.winner = Some(winner.clone());
                }
                _ => node.winner = None,
            }
        }
        tracing::debug!(
            "Resolved {} conflict groups, {} version conflicts",
            winners.len(),
            context.conflicts.len()
        );
    }
}

/// Whether any proper ancestor of `path` lost its conflict group.
fn is_dead(path: &[usize], losers: &HashSet<&[usize]>) -> bool {
    (1..path.len()).any(|len| losers.contains(&path[..len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::ConflictMarker;
    use crate::version::Version;
    use trellis_core::artifact::ArtifactCoordinate;
    use trellis_core::dependency::{scope, Dependency};

    fn node(coord: &str, depth: usize) -> DependencyNode {
        let artifact = ArtifactCoordinate::parse(coord).unwrap();
        let mut node = DependencyNode::new(Dependency::new(artifact.clone(), scope::COMPILE), depth);
        node.version = Version::parse(artifact.version()).ok();
        node
    }

    fn resolve(root: &mut DependencyNode, resolver: ConflictResolver) -> TransformContext {
        let mut context = TransformContext::new();
        ConflictMarker.transform_graph(root, &mut context).unwrap();
        resolver.transform_graph(root, &mut context).unwrap();
        context
    }

    #[test]
    fn nearest_wins_over_declaration_order() {
        // app -> a -> lib:2.0, app -> lib:1.0
        let mut root = node("com.example:app:1", 0);
        let mut a = node("org.a:a:1", 1);
        a.children.push(node("org.lib:lib:2.0", 2));
        root.children.push(a);
        root.children.push(node("org.lib:lib:1.0", 1));

        let context = resolve(&mut root, ConflictResolver::default());
        let deep = &root.children[0].children[0];
        assert_eq!(deep.winner.as_ref().map(|w| w.path.clone()), Some(vec![1]));
        assert!(root.children[1].winner.is_none());
        assert_eq!(context.conflicts.len(), 1);
        assert_eq!(context.conflicts.conflicts[0].reason, "nearest wins (depth 1 vs 2)");
    }

    #[test]
    fn tie_break_is_pluggable() {
        let mut first = node("com.example:app:1", 0);
        first.children.push(node("org.lib:lib:1.0", 1));
        first.children.push(node("org.lib:lib:3.0", 1));
        let mut second = first.clone();

        resolve(&mut first, ConflictResolver::default());
        assert!(first.children[0].winner.is_none());
        assert!(first.children[1].is_conflict_loser());

        resolve(&mut second, ConflictResolver::new(Box::new(NearestHighestVersion)));
        assert!(second.children[0].is_conflict_loser());
        assert!(second.children[1].winner.is_none());
    }

    #[test]
    fn nodes_below_losers_cannot_win() {
        // app -> a:1 -> m -> n -> x:1 ; app -> b -> a:2 -> x:2
        let mut root = node("com.example:app:1", 0);
        let mut a1 = node("org.a:a:1", 1);
        let mut m = node("org.m:m:1", 2);
        let mut n = node("org.n:n:1", 3);
        n.children.push(node("org.x:x:1", 4));
        m.children.push(n);
        a1.children.push(m);
        let mut b = node("org.b:b:1", 1);
        let mut a2 = node("org.a:a:2", 2);
        a2.children.push(node("org.x:x:2", 3));
        b.children.push(a2);
        root.children.push(a1);
        root.children.push(b);

        resolve(&mut root, ConflictResolver::default());
        assert!(root.node_at(&[1, 0]).unwrap().is_conflict_loser());
        assert!(root.node_at(&[0, 0, 0, 0]).unwrap().winner.is_none());
        let x2 = root.node_at(&[1, 0, 0]).unwrap();
        assert_eq!(x2.winner.as_ref().map(|w| w.path.clone()), Some(vec![0, 0, 0, 0]));
    }

    #[test]
    fn requires_marker() {
        let mut root = node("com.example:app:1", 0);
        root.children.push(node("org.lib:lib:1.0", 1));
        let mut context = TransformContext::new();
        let err = ConflictResolver::default()
            .transform_graph(&mut root, &mut context)
            .unwrap_err();
        assert_eq!(err.transformer, "conflict-resolver");
    }
}
