//! The dependency graph vertex produced by collection and refined by transforms.

use std::fmt;
use std::sync::Arc;

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::dependency::Dependency;
use trellis_core::repository::RemoteRepository;

use crate::error::NodeFailure;
use crate::version::{Version, VersionConstraint};

/// Conflict group key shared by every node considered the same logical dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictId(Arc<str>);

impl ConflictId {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Child-index path from the root to a node. The root's path is empty.
pub type NodePath = Vec<usize>;

/// Reference from a conflict loser to the node that won its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictWinner {
    pub path: NodePath,
    pub artifact: ArtifactCoordinate,
    pub scope: String,
}

/// A vertex of the dependency tree.
///
/// Children are owned by their parent and kept in declaration order. Nodes
/// hold no parent pointers; traversals that need the ancestor chain carry it.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub dependency: Dependency,
    pub children: Vec<DependencyNode>,
    pub depth: usize,
    /// Concrete version selected for this node, once known.
    pub version: Option<Version>,
    pub version_constraint: Option<VersionConstraint>,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
    pub conflict_id: Option<ConflictId>,
    pub premanaged_version: Option<String>,
    pub premanaged_scope: Option<String>,
    /// Coordinates this node was relocated from, oldest first.
    pub aliases: Vec<ArtifactCoordinate>,
    pub failure: Option<NodeFailure>,
    pub winner: Option<ConflictWinner>,
    pub effective_scope: Option<String>,
}

impl DependencyNode {
    pub fn new(dependency: Dependency, depth: usize) -> Self {
        Self {
            dependency,
            children: Vec::new(),
            depth,
            version: None,
            version_constraint: None,
            repositories: Vec::new(),
            request_context: String::new(),
            conflict_id: None,
            premanaged_version: None,
            premanaged_scope: None,
            aliases: Vec::new(),
            failure: None,
            winner: None,
            effective_scope: None,
        }
    }

    pub fn artifact(&self) -> &ArtifactCoordinate {
        self.dependency.artifact()
    }

    /// Effective scope if refined, otherwise the declared one.
    pub fn scope(&self) -> &str {
        self.effective_scope
            .as_deref()
            .unwrap_or_else(|| self.dependency.scope())
    }

    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        self.artifact().key()
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn is_conflict_loser(&self) -> bool {
        self.winner.is_some()
    }

    /// Visit every node in pre-order, passing its path from `self`.
    pub fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&DependencyNode, &[usize]),
    {
        let mut path = Vec::new();
        self.visit_inner(&mut path, f);
    }

    fn visit_inner<F>(&self, path: &mut Vec<usize>, f: &mut F)
    where
        F: FnMut(&DependencyNode, &[usize]),
    {
        f(self, path);
        for (i, child) in self.children.iter().enumerate() {
            path.push(i);
            child.visit_inner(path, f);
            path.pop();
        }
    }

    /// Mutable pre-order walk; `f` runs on a node before its children.
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut DependencyNode, &[usize]),
    {
        let mut path = Vec::new();
        self.visit_mut_inner(&mut path, f);
    }

    fn visit_mut_inner<F>(&mut self, path: &mut Vec<usize>, f: &mut F)
    where
        F: FnMut(&mut DependencyNode, &[usize]),
    {
        f(self, path);
        for (i, child) in self.children.iter_mut().enumerate() {
            path.push(i);
            child.visit_mut_inner(path, f);
            path.pop();
        }
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&DependencyNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut DependencyNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// Number of nodes below `self`.
    pub fn len(&self) -> usize {
        self.children.iter().map(|c| 1 + c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.artifact(), self.scope())
    }
}
