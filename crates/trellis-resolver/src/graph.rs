//! Inspection of a transformed dependency tree: rendering, path queries and
//! the flattened artifact list handed to downloaders.

use std::collections::HashSet;

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::dependency::scope;
use trellis_core::repository::RemoteRepository;

use crate::node::DependencyNode;

/// One artifact of the final, conflict-free dependency set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub artifact: ArtifactCoordinate,
    pub scope: String,
    pub depth: usize,
    /// Repositories the artifact was collected against.
    pub repositories: Vec<RemoteRepository>,
    /// Resolved coordinates of its direct dependencies.
    pub dependencies: Vec<ArtifactCoordinate>,
}

impl DependencyNode {
    /// Render the tree below `self`, one node per line.
    ///
    /// Direct dependencies are grouped by scope when more than one scope is
    /// present. Conflict losers are shown but not expanded.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = format!("{}\n", self.artifact());

        let mut sections: Vec<(&str, Vec<&DependencyNode>)> = Vec::new();
        for child in &self.children {
            let label = child.scope();
            match sections.iter_mut().find(|(s, _)| *s == label) {
                Some((_, nodes)) => nodes.push(child),
                None => sections.push((label, vec![child])),
            }
        }
        sections.sort_by_key(|(label, _)| section_rank(label));

        let show_headers = sections.len() > 1;
        let total_sections = sections.len();
        for (section, (label, nodes)) in sections.iter().enumerate() {
            if show_headers {
                output.push_str(&format!("[{label}]\n"));
            }
            let is_last_section = section + 1 == total_sections;
            let count = nodes.len();
            for (i, node) in nodes.iter().enumerate() {
                let is_last = i == count - 1 && is_last_section;
                node.print_subtree(&mut output, "", is_last, 1, max_depth);
            }
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}", self.artifact()));
        if let Some(ref winner) = self.winner {
            output.push_str(&format!(" (omitted for conflict with {})", winner.artifact.version()));
        }
        if let Some(ref failure) = self.failure {
            output.push_str(&format!(" (failed: {failure})"));
        }
        output.push('\n');

        if self.is_conflict_loser() || max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            child.print_subtree(output, &child_prefix, i == count - 1, depth + 1, max_depth);
        }
    }

    /// Path from `self` to the first node matching `target` in pre-order.
    ///
    /// Accepts either `group:artifact` or just `artifact`.
    pub fn find_path(&self, target: &str) -> Option<Vec<&DependencyNode>> {
        let mut path = vec![self];
        if self.dfs_path(target, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn matches_key(&self, target: &str) -> bool {
        self.key() == target || self.artifact().artifact_id() == target
    }

    fn dfs_path<'a>(&'a self, target: &str, path: &mut Vec<&'a DependencyNode>) -> bool {
        if self.matches_key(target) {
            return true;
        }
        for child in &self.children {
            path.push(child);
            if child.dfs_path(target, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Every chain leading to `target`, rendered bottom-up.
    pub fn print_inverted_tree(&self, target: &str) -> String {
        let mut chains: Vec<Vec<&DependencyNode>> = Vec::new();
        let mut stack = vec![self];
        self.collect_chains(target, &mut stack, &mut chains);

        let mut output = String::new();
        for chain in chains {
            let mut prefix = String::new();
            for (i, node) in chain.iter().rev().enumerate() {
                if i == 0 {
                    output.push_str(&format!("{}\n", node.artifact()));
                } else {
                    output.push_str(&format!("{prefix}└── {}\n", node.artifact()));
                    prefix.push_str("    ");
                }
            }
        }
        output
    }

    fn collect_chains<'a>(
        &'a self,
        target: &str,
        stack: &mut Vec<&'a DependencyNode>,
        chains: &mut Vec<Vec<&'a DependencyNode>>,
    ) {
        for child in &self.children {
            stack.push(child);
            if child.matches_key(target) {
                chains.push(stack.clone());
            }
            child.collect_chains(target, stack, chains);
            stack.pop();
        }
    }

    /// The deduplicated artifact set: one entry per conflict group, taken
    /// from its winner, in pre-order. Subtrees of conflict losers are skipped.
    pub fn flatten(&self) -> Vec<ResolvedArtifact> {
        let mut seen = HashSet::new();
        let mut artifacts = Vec::new();
        for child in &self.children {
            child.flatten_into(&mut seen, &mut artifacts);
        }
        artifacts
    }

    fn flatten_into(&self, seen: &mut HashSet<String>, artifacts: &mut Vec<ResolvedArtifact>) {
        if self.is_conflict_loser() {
            return;
        }
        let group = match self.conflict_id {
            Some(ref id) => id.as_str().to_string(),
            None => self.artifact().identity(),
        };
        if !seen.insert(group) {
            return;
        }
        artifacts.push(ResolvedArtifact {
            artifact: self.artifact().clone(),
            scope: self.scope().to_string(),
            depth: self.depth,
            repositories: self.repositories.clone(),
            dependencies: self
                .children
                .iter()
                .map(|child| match child.winner {
                    Some(ref winner) => winner.artifact.clone(),
                    None => child.artifact().clone(),
                })
                .collect(),
        });
        for child in &self.children {
            child.flatten_into(seen, artifacts);
        }
    }
}

/// Display order of scope sections in [`DependencyNode::print_tree`].
fn section_rank(label: &str) -> usize {
    match label {
        scope::COMPILE => 0,
        scope::RUNTIME => 1,
        scope::PROVIDED => 2,
        scope::SYSTEM => 3,
        scope::TEST => 4,
        _ => 5,
    }
}
