//! Dependency managers: version/scope/optional/exclusion overrides.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use trellis_core::dependency::{Dependency, Exclusion};

use super::CollectionContext;

/// Overrides a manager applies to one dependency. `None` fields are left as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub exclusions: Option<BTreeSet<Exclusion>>,
}

impl DependencyManagement {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.optional.is_none()
            && self.exclusions.is_none()
    }

    /// The managed dependency. Management always wins over the declared values.
    pub fn apply(&self, dependency: &Dependency) -> Dependency {
        let mut managed = dependency.clone();
        if let Some(ref version) = self.version {
            managed = managed.with_artifact(managed.artifact().with_version(version));
        }
        if let Some(ref scope) = self.scope {
            managed = managed.with_scope(scope);
        }
        if let Some(optional) = self.optional {
            managed = managed.with_optional(optional);
        }
        if let Some(ref exclusions) = self.exclusions {
            managed = managed.with_exclusions(exclusions.iter().cloned());
        }
        managed
    }
}

/// Supplies management for declared dependencies.
pub trait DependencyManager: fmt::Debug + Send + Sync {
    fn manage_dependency(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencyManager>;
}

/// Manages nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDependencyManager;

impl DependencyManager for NoopDependencyManager {
    fn manage_dependency(&self, _dependency: &Dependency) -> Option<DependencyManagement> {
        None
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencyManager> {
        self
    }
}

/// Maven 2/3 style management.
///
/// Only the managed dependencies declared at the root count, and they apply
/// to transitive dependencies (depth 2 and below), never to the root's own
/// direct dependencies. When two root entries share a key the first wins.
#[derive(Debug, Clone, Default)]
pub struct ClassicDependencyManager {
    depth: usize,
    versions: Arc<HashMap<String, String>>,
    scopes: Arc<HashMap<String, String>>,
    optionals: Arc<HashMap<String, bool>>,
    exclusions: Arc<HashMap<String, BTreeSet<Exclusion>>>,
}

impl ClassicDependencyManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DependencyManager for ClassicDependencyManager {
    fn manage_dependency(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        if self.depth < 2 {
            return None;
        }
        let key = dependency.management_key();
        let management = DependencyManagement {
            version: self.versions.get(&key).cloned(),
            scope: self.scopes.get(&key).cloned(),
            optional: self.optionals.get(&key).copied(),
            exclusions: self.exclusions.get(&key).map(|managed| {
                let mut merged = dependency.exclusions().clone();
                merged.extend(managed.iter().cloned());
                merged
            }),
        };
        (!management.is_empty()).then_some(management)
    }

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencyManager> {
        match self.depth {
            0 => {
                let mut versions = (*self.versions).clone();
                let mut scopes = (*self.scopes).clone();
                let mut optionals = (*self.optionals).clone();
                let mut exclusions = (*self.exclusions).clone();
                for managed in context.managed_dependencies {
                    let key = managed.management_key();
                    let version = managed.artifact().version();
                    if !version.is_empty() {
                        versions.entry(key.clone()).or_insert_with(|| version.to_string());
                    }
                    if !managed.scope().is_empty() {
                        scopes
                            .entry(key.clone())
                            .or_insert_with(|| managed.scope().to_string());
                    }
                    if managed.is_optional() {
                        optionals.entry(key.clone()).or_insert(true);
                    }
                    if !managed.exclusions().is_empty() {
                        exclusions
                            .entry(key)
                            .or_default()
                            .extend(managed.exclusions().iter().cloned());
                    }
                }
                Arc::new(Self {
                    depth: 1,
                    versions: Arc::new(versions),
                    scopes: Arc::new(scopes),
                    optionals: Arc::new(optionals),
                    exclusions: Arc::new(exclusions),
                })
            }
            1 => Arc::new(Self {
                depth: 2,
                ..(*self).clone()
            }),
            _ => self,
        }
    }
}
