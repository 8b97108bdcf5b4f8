//! Dependency traversers: which selected nodes get their own children collected.

use std::fmt;
use std::sync::Arc;

use trellis_core::artifact::PROPERTY_INCLUDES_DEPENDENCIES;
use trellis_core::dependency::Dependency;

use super::CollectionContext;

/// Decides whether a selected dependency is expanded or kept as a leaf.
pub trait DependencyTraverser: fmt::Debug + Send + Sync {
    fn traverse_dependency(&self, dependency: &Dependency) -> bool;

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencyTraverser>;
}

/// Traverses all or nothing.
#[derive(Debug, Clone, Copy)]
pub struct StaticDependencyTraverser {
    traverse: bool,
}

impl StaticDependencyTraverser {
    pub fn new(traverse: bool) -> Self {
        Self { traverse }
    }
}

impl DependencyTraverser for StaticDependencyTraverser {
    fn traverse_dependency(&self, _dependency: &Dependency) -> bool {
        self.traverse
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencyTraverser> {
        self
    }
}

/// Does not descend into artifacts that already bundle their dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct FatArtifactTraverser;

impl DependencyTraverser for FatArtifactTraverser {
    fn traverse_dependency(&self, dependency: &Dependency) -> bool {
        dependency
            .artifact()
            .property(PROPERTY_INCLUDES_DEPENDENCIES)
            != Some("true")
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencyTraverser> {
        self
    }
}
