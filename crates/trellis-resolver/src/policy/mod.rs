//! Per-node collection policies.
//!
//! Each policy decides one thing about a declared dependency and derives a
//! (possibly different) instance for the next level down via `derive_child`.
//! Instances are never mutated, so every node may be governed by its own
//! policy value and sibling branches can share them freely.

pub mod manager;
pub mod selector;
pub mod traverser;

use std::sync::Arc;

use trellis_core::config::SelectionConfig;
use trellis_core::dependency::Dependency;

pub use manager::{ClassicDependencyManager, DependencyManagement, DependencyManager, NoopDependencyManager};
pub use selector::{
    AndDependencySelector, DependencySelector, ExclusionDependencySelector,
    OptionalDependencySelector, ScopeDependencySelector, StaticDependencySelector,
};
pub use traverser::{DependencyTraverser, FatArtifactTraverser, StaticDependencyTraverser};

/// What a policy sees when deriving the instance for a node's children.
#[derive(Debug, Clone, Copy)]
pub struct CollectionContext<'a> {
    /// The dependency whose children are about to be collected.
    pub dependency: &'a Dependency,
    /// Managed dependencies declared by that dependency's descriptor.
    pub managed_dependencies: &'a [Dependency],
    /// Depth of that dependency; the root is 0.
    pub depth: usize,
}

/// The three policies governing one level of collection.
#[derive(Debug, Clone)]
pub struct Policies {
    pub selector: Arc<dyn DependencySelector>,
    pub traverser: Arc<dyn DependencyTraverser>,
    pub manager: Arc<dyn DependencyManager>,
}

impl Policies {
    pub fn new(
        selector: Arc<dyn DependencySelector>,
        traverser: Arc<dyn DependencyTraverser>,
        manager: Arc<dyn DependencyManager>,
    ) -> Self {
        Self {
            selector,
            traverser,
            manager,
        }
    }

    /// Select and traverse everything, manage nothing.
    pub fn permissive() -> Self {
        Self::new(
            Arc::new(StaticDependencySelector::new(true)),
            Arc::new(StaticDependencyTraverser::new(true)),
            Arc::new(NoopDependencyManager),
        )
    }

    /// Maven-style defaults: scope, optional and exclusion filtering, fat
    /// artifacts not traversed, root-level dependency management.
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(
            selector::default_selector(config),
            Arc::new(FatArtifactTraverser),
            Arc::new(ClassicDependencyManager::new()),
        )
    }

    pub fn derive_child(&self, context: &CollectionContext<'_>) -> Self {
        Self {
            selector: self.selector.clone().derive_child(context),
            traverser: self.traverser.clone().derive_child(context),
            manager: self.manager.clone().derive_child(context),
        }
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}
