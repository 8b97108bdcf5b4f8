//! Dependency selectors: which declared dependencies become nodes at all.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use trellis_core::config::SelectionConfig;
use trellis_core::dependency::{Dependency, Exclusion};

use super::CollectionContext;

/// Decides whether a declared dependency is included in the graph.
pub trait DependencySelector: fmt::Debug + Send + Sync {
    fn select_dependency(&self, dependency: &Dependency) -> bool;

    /// Selector governing the children of the context's dependency.
    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencySelector>;
}

/// Saturating level counter shared by the depth-aware selectors.
fn next_level(level: usize, ceiling: usize) -> Option<usize> {
    (level < ceiling).then_some(level + 1)
}

/// Selects all or nothing.
#[derive(Debug, Clone, Copy)]
pub struct StaticDependencySelector {
    select: bool,
}

impl StaticDependencySelector {
    pub fn new(select: bool) -> Self {
        Self { select }
    }
}

impl DependencySelector for StaticDependencySelector {
    fn select_dependency(&self, _dependency: &Dependency) -> bool {
        self.select
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencySelector> {
        self
    }
}

/// Accepts optional dependencies only on the first levels below the root.
///
/// The level starts at 0 and increases with each derivation until it
/// reaches `max_level`, where it stays.
#[derive(Debug, Clone, Copy)]
pub struct OptionalDependencySelector {
    level: usize,
    max_level: usize,
}

impl OptionalDependencySelector {
    pub fn new() -> Self {
        Self::with_max_level(2)
    }

    pub fn with_max_level(max_level: usize) -> Self {
        Self {
            level: 0,
            max_level,
        }
    }
}

impl Default for OptionalDependencySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencySelector for OptionalDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        self.level < self.max_level || !dependency.is_optional()
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencySelector> {
        match next_level(self.level, self.max_level) {
            Some(level) => Arc::new(Self { level, ..*self }),
            None => self,
        }
    }
}

/// Drops dependencies in the given scopes once below the direct level.
#[derive(Debug, Clone)]
pub struct ScopeDependencySelector {
    excluded: Arc<[String]>,
    level: usize,
}

impl ScopeDependencySelector {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
            level: 0,
        }
    }
}

impl DependencySelector for ScopeDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        self.level < 2 || !self.excluded.iter().any(|s| s == dependency.scope())
    }

    fn derive_child(self: Arc<Self>, _context: &CollectionContext<'_>) -> Arc<dyn DependencySelector> {
        match next_level(self.level, 2) {
            Some(level) => Arc::new(Self {
                excluded: self.excluded.clone(),
                level,
            }),
            None => self,
        }
    }
}

/// Drops dependencies matched by an exclusion declared anywhere on the path from the root.
#[derive(Debug, Clone, Default)]
pub struct ExclusionDependencySelector {
    exclusions: BTreeSet<Exclusion>,
}

impl ExclusionDependencySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusions<I>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = Exclusion>,
    {
        Self {
            exclusions: exclusions.into_iter().collect(),
        }
    }
}

impl DependencySelector for ExclusionDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        !self
            .exclusions
            .iter()
            .any(|e| e.matches(dependency.artifact()))
    }

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencySelector> {
        let declared = context.dependency.exclusions();
        if declared.is_subset(&self.exclusions) {
            return self;
        }
        let mut exclusions = self.exclusions.clone();
        exclusions.extend(declared.iter().cloned());
        Arc::new(Self { exclusions })
    }
}

/// Selects a dependency only if every inner selector does.
#[derive(Debug, Clone)]
pub struct AndDependencySelector {
    selectors: Vec<Arc<dyn DependencySelector>>,
}

impl AndDependencySelector {
    pub fn new(selectors: Vec<Arc<dyn DependencySelector>>) -> Self {
        Self { selectors }
    }
}

impl DependencySelector for AndDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        self.selectors.iter().all(|s| s.select_dependency(dependency))
    }

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencySelector> {
        let derived: Vec<Arc<dyn DependencySelector>> = self
            .selectors
            .iter()
            .map(|s| s.clone().derive_child(context))
            .collect();
        let unchanged = derived
            .iter()
            .zip(&self.selectors)
            .all(|(d, s)| Arc::ptr_eq(d, s));
        if unchanged {
            self
        } else {
            Arc::new(Self { selectors: derived })
        }
    }
}

/// Scope, optional and exclusion filtering combined.
pub fn default_selector(config: &SelectionConfig) -> Arc<dyn DependencySelector> {
    Arc::new(AndDependencySelector::new(vec![
        Arc::new(ScopeDependencySelector::new(
            config.transitive_excluded_scopes.iter().cloned(),
        )),
        Arc::new(OptionalDependencySelector::with_max_level(config.optional_depth)),
        Arc::new(ExclusionDependencySelector::new()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::artifact::ArtifactCoordinate;
    use trellis_core::dependency::scope;

    fn dep(coord: &str, dep_scope: &str) -> Dependency {
        Dependency::new(ArtifactCoordinate::parse(coord).unwrap(), dep_scope)
    }

    fn derive(
        selector: Arc<dyn DependencySelector>,
        parent: &Dependency,
    ) -> Arc<dyn DependencySelector> {
        let context = CollectionContext {
            dependency: parent,
            managed_dependencies: &[],
            depth: 0,
        };
        selector.derive_child(&context)
    }

    #[test]
    fn static_selector() {
        let d = dep("g:a:1", scope::COMPILE);
        assert!(StaticDependencySelector::new(true).select_dependency(&d));
        assert!(!StaticDependencySelector::new(false).select_dependency(&d));
    }

    #[test]
    fn optional_selector_window() {
        let parent = dep("g:root:1", scope::COMPILE);
        let optional = dep("g:opt:1", scope::COMPILE).with_optional(true);
        let required = dep("g:req:1", scope::COMPILE);

        let level0: Arc<dyn DependencySelector> = Arc::new(OptionalDependencySelector::new());
        assert!(level0.select_dependency(&optional));

        let level1 = derive(level0, &parent);
        assert!(level1.select_dependency(&optional));

        let level2 = derive(level1, &parent);
        assert!(!level2.select_dependency(&optional));
        assert!(level2.select_dependency(&required));

        let level3 = derive(level2.clone(), &parent);
        assert!(Arc::ptr_eq(&level2, &level3), "level saturates");
        assert!(!level3.select_dependency(&optional));
    }

    #[test]
    fn scope_selector_keeps_direct_test_deps() {
        let parent = dep("g:root:1", scope::COMPILE);
        let test_dep = dep("g:junit:4", scope::TEST);
        let provided = dep("g:servlet:3", scope::PROVIDED);

        let root: Arc<dyn DependencySelector> =
            Arc::new(ScopeDependencySelector::new(["test", "provided"]));
        let direct = derive(root, &parent);
        assert!(direct.select_dependency(&test_dep));

        let transitive = derive(direct, &parent);
        assert!(!transitive.select_dependency(&test_dep));
        assert!(!transitive.select_dependency(&provided));
        assert!(transitive.select_dependency(&dep("g:x:1", scope::RUNTIME)));
    }

    #[test]
    fn exclusions_accumulate_down_the_path() {
        let root: Arc<dyn DependencySelector> = Arc::new(ExclusionDependencySelector::new());
        let first = dep("g:first:1", scope::COMPILE).with_exclusions([Exclusion::new("x", "*")]);
        let second = dep("g:second:1", scope::COMPILE).with_exclusions([Exclusion::new("y", "b")]);

        let below_first = derive(root, &first);
        assert!(!below_first.select_dependency(&dep("x:anything:1", scope::COMPILE)));
        assert!(below_first.select_dependency(&dep("y:b:1", scope::COMPILE)));

        let below_second = derive(below_first, &second);
        assert!(!below_second.select_dependency(&dep("x:anything:1", scope::COMPILE)));
        assert!(!below_second.select_dependency(&dep("y:b:1", scope::COMPILE)));
        assert!(below_second.select_dependency(&dep("y:c:1", scope::COMPILE)));
    }

    #[test]
    fn and_selector_requires_all() {
        let selector = AndDependencySelector::new(vec![
            Arc::new(StaticDependencySelector::new(true)),
            Arc::new(ExclusionDependencySelector::with_exclusions([Exclusion::new(
                "g", "bad",
            )])),
        ]);
        assert!(selector.select_dependency(&dep("g:good:1", scope::COMPILE)));
        assert!(!selector.select_dependency(&dep("g:bad:1", scope::COMPILE)));
    }

    #[test]
    fn and_selector_reuses_itself_when_nothing_changes() {
        let parent = dep("g:root:1", scope::COMPILE);
        let selector: Arc<dyn DependencySelector> = Arc::new(AndDependencySelector::new(vec![
            Arc::new(StaticDependencySelector::new(true)),
        ]));
        let derived = derive(selector.clone(), &parent);
        assert!(Arc::ptr_eq(&selector, &derived));
    }

    #[test]
    fn default_selector_combines_rules() {
        let parent = dep("g:root:1", scope::COMPILE);
        let direct = derive(default_selector(&SelectionConfig::default()), &parent);
        assert!(direct.select_dependency(&dep("g:t:1", scope::TEST).with_optional(true)));

        let transitive = derive(direct, &parent);
        assert!(!transitive.select_dependency(&dep("g:t:1", scope::TEST)));
        assert!(!transitive.select_dependency(&dep("g:o:1", scope::COMPILE).with_optional(true)));
        assert!(transitive.select_dependency(&dep("g:c:1", scope::COMPILE)));
    }
}
