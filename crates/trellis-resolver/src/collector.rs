//! Recursive expansion of a root dependency into a dependency tree.
//!
//! Each node resolves its version, reads its descriptor (following
//! relocations), then filters its declared dependencies through the
//! selector, traverser and manager it was handed. Sibling subtrees are
//! expanded concurrently on a `JoinSet`; results are reassembled in
//! declaration order. Descriptor reads and range resolutions are the only
//! suspension points and are bounded by a semaphore.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::config::CollectConfig;
use trellis_core::dependency::Dependency;
use trellis_core::repository::{merge_repositories, RemoteRepository};

use crate::cache::DescriptorCache;
use crate::error::{CollectionError, DescriptorError, NodeFailure, RangeResolutionError};
use crate::node::DependencyNode;
use crate::policy::{CollectionContext, Policies};
use crate::spi::{
    ArtifactDescriptor, ArtifactDescriptorReader, DescriptorRequest, VersionRangeRequest,
    VersionRangeResolver,
};
use crate::version::{Version, VersionConstraint};

/// What to collect.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub root: Dependency,
    pub repositories: Vec<RemoteRepository>,
    /// Management declared by the project itself, ahead of the root descriptor's own.
    pub managed_dependencies: Vec<Dependency>,
    pub request_context: String,
}

impl CollectRequest {
    pub fn new(root: Dependency, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            root,
            repositories,
            managed_dependencies: Vec::new(),
            request_context: "project".to_string(),
        }
    }

    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    pub fn with_request_context(mut self, context: &str) -> Self {
        self.request_context = context.to_string();
        self
    }
}

/// Builds raw dependency graphs from an external descriptor reader and range resolver.
#[derive(Clone)]
pub struct DependencyCollector {
    reader: Arc<dyn ArtifactDescriptorReader>,
    range_resolver: Arc<dyn VersionRangeResolver>,
    config: CollectConfig,
}

impl DependencyCollector {
    pub fn new(
        reader: Arc<dyn ArtifactDescriptorReader>,
        range_resolver: Arc<dyn VersionRangeResolver>,
    ) -> Self {
        Self {
            reader,
            range_resolver,
            config: CollectConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CollectConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    /// Collect the full graph below `request.root`.
    ///
    /// On failure the error still carries the partial graph: a broken
    /// subtree never stops its siblings from being collected.
    pub async fn collect(
        &self,
        request: CollectRequest,
        policies: Policies,
    ) -> Result<DependencyNode, CollectionError> {
        self.collect_with_cancellation(request, policies, CancellationToken::new())
            .await
    }

    /// Like [`collect`](Self::collect), but stops issuing external calls once
    /// `cancel` fires. Pending calls are abandoned and the partial graph is
    /// returned with `cancelled` set.
    pub async fn collect_with_cancellation(
        &self,
        request: CollectRequest,
        policies: Policies,
        cancel: CancellationToken,
    ) -> Result<DependencyNode, CollectionError> {
        let session = Arc::new(Session {
            reader: self.reader.clone(),
            range_resolver: self.range_resolver.clone(),
            config: self.config.clone(),
            cache: DescriptorCache::new(),
            permits: Semaphore::new(self.config.max_concurrent_requests.max(1)),
            cancel,
            request_context: request.request_context.clone(),
        });

        let job = Job {
            dependency: request.root,
            depth: 0,
            policies,
            repositories: request.repositories,
            ancestors: Vec::new(),
            root_managed: request.managed_dependencies,
            premanaged_version: None,
            premanaged_scope: None,
            traverse: true,
        };

        let Expanded { node, failures, .. } = expand(session.clone(), job).await;
        let cancelled =
            session.cancel.is_cancelled() || failures.iter().any(NodeFailure::is_cancellation);

        let descriptors = session.cache.descriptor_count().await;
        tracing::info!(
            "Collected {} nodes below {} ({} failures, {descriptors} descriptors read)",
            node.len(),
            node.artifact(),
            failures.len()
        );

        if failures.is_empty() && !cancelled {
            Ok(node)
        } else {
            Err(CollectionError {
                root: Box::new(node),
                failures,
                cancelled,
            })
        }
    }
}

/// State shared by every branch of one collection request.
struct Session {
    reader: Arc<dyn ArtifactDescriptorReader>,
    range_resolver: Arc<dyn VersionRangeResolver>,
    config: CollectConfig,
    cache: DescriptorCache,
    permits: Semaphore,
    cancel: CancellationToken,
    request_context: String,
}

/// One node waiting to be expanded.
struct Job {
    /// The managed dependency.
    dependency: Dependency,
    depth: usize,
    /// Policies that selected this node; derived again for its children.
    policies: Policies,
    repositories: Vec<RemoteRepository>,
    /// `group:artifact` keys from the root down to the parent.
    ancestors: Vec<String>,
    /// Request-level management, only set for the root.
    root_managed: Vec<Dependency>,
    premanaged_version: Option<String>,
    premanaged_scope: Option<String>,
    traverse: bool,
}

struct Expanded {
    node: DependencyNode,
    /// Unrecoverable failures in this subtree, in pre-order.
    failures: Vec<NodeFailure>,
    /// The node relocated onto one of its ancestors and must be dropped.
    cyclic: bool,
}

impl Expanded {
    fn done(node: DependencyNode, failures: Vec<NodeFailure>) -> Self {
        Self {
            node,
            failures,
            cyclic: false,
        }
    }

    fn failed(session: &Session, mut node: DependencyNode, failure: NodeFailure) -> Self {
        let ignorable = is_ignorable(&session.config, &failure);
        if ignorable {
            tracing::warn!("Ignoring failure for {}: {failure}", node.artifact());
        } else {
            tracing::debug!("Collection failed at {}: {failure}", node.artifact());
        }
        node.failure = Some(failure.clone());
        let failures = if ignorable { Vec::new() } else { vec![failure] };
        Self::done(node, failures)
    }
}

fn is_ignorable(config: &CollectConfig, failure: &NodeFailure) -> bool {
    match failure {
        NodeFailure::Descriptor(DescriptorError::Missing { .. }) => {
            config.ignore_missing_descriptors
        }
        NodeFailure::Descriptor(DescriptorError::Invalid { .. })
        | NodeFailure::VersionRange(_)
        | NodeFailure::Constraint { .. } => config.ignore_invalid_descriptors,
        NodeFailure::Descriptor(DescriptorError::Transport { .. })
        | NodeFailure::Cancelled { .. }
        | NodeFailure::TaskAborted { .. } => false,
    }
}

fn expand(session: Arc<Session>, job: Job) -> BoxFuture<'static, Expanded> {
    async move {
        let mut node = DependencyNode::new(job.dependency.clone(), job.depth);
        node.repositories = job.repositories.clone();
        node.request_context = session.request_context.clone();
        node.premanaged_version = job.premanaged_version.clone();
        node.premanaged_scope = job.premanaged_scope.clone();

        if session.cancel.is_cancelled() {
            let failure = cancelled(node.artifact());
            return Expanded::failed(&session, node, failure);
        }

        if let Err(failure) = resolve_version(&session, &mut node).await {
            return Expanded::failed(&session, node, failure);
        }

        let descriptor = match read_with_relocations(&session, &mut node).await {
            Ok(descriptor) => descriptor,
            Err(failure) => return Expanded::failed(&session, node, failure),
        };

        if !node.aliases.is_empty() && job.ancestors.contains(&node.key()) {
            tracing::debug!(
                "Skipping {} relocated onto an ancestor ({})",
                node.aliases[0],
                node.artifact()
            );
            return Expanded {
                node,
                failures: Vec::new(),
                cyclic: true,
            };
        }

        if !job.traverse {
            tracing::debug!("Not traversing {}", node.artifact());
            return Expanded::done(node, Vec::new());
        }

        let mut managed = job.root_managed.clone();
        managed.extend(descriptor.managed_dependencies.iter().cloned());
        let context = CollectionContext {
            dependency: &node.dependency,
            managed_dependencies: &managed,
            depth: node.depth,
        };
        let child_policies = job.policies.derive_child(&context);
        let child_repositories = merge_repositories(&job.repositories, &descriptor.repositories);

        let mut ancestors = job.ancestors.clone();
        ancestors.push(node.key());
        ancestors.extend(node.aliases.iter().map(ArtifactCoordinate::key));

        let mut jobs = Vec::new();
        for declared in &descriptor.dependencies {
            let (dependency, premanaged_version, premanaged_scope) =
                apply_management(&child_policies, declared);

            if !child_policies.selector.select_dependency(&dependency) {
                tracing::debug!("{} rejected below {}", dependency, node.artifact());
                continue;
            }
            if ancestors.contains(&dependency.artifact().key()) {
                tracing::debug!(
                    "Skipping cyclic dependency {} below {}",
                    dependency,
                    node.artifact()
                );
                continue;
            }
            let traverse = child_policies.traverser.traverse_dependency(&dependency);
            jobs.push(Job {
                dependency,
                depth: node.depth + 1,
                policies: child_policies.clone(),
                repositories: child_repositories.clone(),
                ancestors: ancestors.clone(),
                root_managed: Vec::new(),
                premanaged_version,
                premanaged_scope,
                traverse,
            });
        }

        let (children, failures) = expand_children(&session, &node, jobs).await;
        node.children = children;
        Expanded::done(node, failures)
    }
    .boxed()
}

/// Expand sibling jobs concurrently, keeping declaration order.
async fn expand_children(
    session: &Arc<Session>,
    parent: &DependencyNode,
    jobs: Vec<Job>,
) -> (Vec<DependencyNode>, Vec<NodeFailure>) {
    let placeholders: Vec<(Dependency, usize)> = jobs
        .iter()
        .map(|job| (job.dependency.clone(), job.depth))
        .collect();
    let mut slots: Vec<Option<Expanded>> = placeholders.iter().map(|_| None).collect();

    let mut join_set = JoinSet::new();
    for (index, job) in jobs.into_iter().enumerate() {
        join_set.spawn(expand(session.clone(), job).map(move |expanded| (index, expanded)));
    }

    let mut aborted = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok((index, expanded)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(expanded);
                }
            }
            Err(e) => aborted.push(e.to_string()),
        }
    }

    let mut children = Vec::with_capacity(slots.len());
    let mut failures = Vec::new();
    let mut aborted = aborted.into_iter();
    for (slot, (dependency, depth)) in slots.into_iter().zip(placeholders) {
        match slot {
            Some(expanded) if expanded.cyclic => {}
            Some(expanded) => {
                children.push(expanded.node);
                failures.extend(expanded.failures);
            }
            None => {
                let failure = NodeFailure::TaskAborted {
                    parent: parent.artifact().to_string(),
                    message: aborted.next().unwrap_or_else(|| "task lost".to_string()),
                };
                let mut node = DependencyNode::new(dependency, depth);
                node.failure = Some(failure.clone());
                children.push(node);
                failures.push(failure);
            }
        }
    }
    (children, failures)
}

/// Apply the manager to a declared dependency. Returns the managed
/// dependency and the version/scope it replaced, if any.
fn apply_management(
    policies: &Policies,
    declared: &Dependency,
) -> (Dependency, Option<String>, Option<String>) {
    let Some(management) = policies.manager.manage_dependency(declared) else {
        return (declared.clone(), None, None);
    };
    let managed = management.apply(declared);
    let premanaged_version = (managed.artifact().version() != declared.artifact().version())
        .then(|| declared.artifact().version().to_string());
    let premanaged_scope =
        (managed.scope() != declared.scope()).then(|| declared.scope().to_string());
    if premanaged_version.is_some() || premanaged_scope.is_some() {
        tracing::debug!("Managed {declared} to {managed}");
    }
    (managed, premanaged_version, premanaged_scope)
}

/// Parse the node's version constraint and pin a concrete version.
async fn resolve_version(session: &Session, node: &mut DependencyNode) -> Result<(), NodeFailure> {
    let artifact = node.artifact().clone();
    let constraint =
        VersionConstraint::parse(artifact.version()).map_err(|source| NodeFailure::Constraint {
            artifact: artifact.to_string(),
            source,
        })?;

    // Kept even when the range below cannot be resolved.
    node.version_constraint = Some(constraint.clone());

    let version = match constraint {
        VersionConstraint::Recommended(ref version) => version.clone(),
        VersionConstraint::Ranges(_) => {
            let version = resolve_range(session, &artifact, &constraint, &node.repositories).await?;
            tracing::debug!("Resolved {} {} to {version}", artifact.key(), constraint);
            node.dependency = node
                .dependency
                .with_artifact(artifact.with_version(version.as_str()));
            version
        }
    };
    node.version = Some(version);
    Ok(())
}

async fn resolve_range(
    session: &Session,
    artifact: &ArtifactCoordinate,
    constraint: &VersionConstraint,
    repositories: &[RemoteRepository],
) -> Result<Version, NodeFailure> {
    let request = VersionRangeRequest {
        artifact: artifact.clone(),
        constraint: artifact.version().to_string(),
        repositories: repositories.to_vec(),
    };
    let key = DescriptorCache::key(artifact, repositories);
    let (resolver, permits, request) = (&session.range_resolver, &session.permits, &request);
    let fetch = session.cache.range(key, || async move {
        let _permit = permits.acquire().await;
        resolver.resolve(request).await
    });
    let result = tokio::select! {
        biased;
        _ = session.cancel.cancelled() => return Err(cancelled(artifact)),
        result = fetch => result?,
    };

    let selected = result
        .selected
        .as_ref()
        .filter(|v| constraint.contains(*v))
        .or_else(|| constraint.highest_match(&result.candidates));
    selected.cloned().ok_or_else(|| {
        NodeFailure::VersionRange(RangeResolutionError {
            artifact: artifact.key(),
            constraint: constraint.to_string(),
            message: "no available version satisfies the range".to_string(),
        })
    })
}

/// Read the node's descriptor, following relocations. Each hop records the
/// coordinate it left in `node.aliases`.
async fn read_with_relocations(
    session: &Session,
    node: &mut DependencyNode,
) -> Result<ArtifactDescriptor, NodeFailure> {
    let mut artifact = node.artifact().clone();
    let mut seen = HashSet::from([artifact.identity()]);
    loop {
        let descriptor = read_descriptor(session, &artifact, &node.repositories).await?;
        let Some(target) = descriptor.relocated_to.clone() else {
            if artifact != *node.artifact() {
                node.dependency = node.dependency.with_artifact(artifact);
            }
            return Ok(descriptor);
        };

        let target = relocation_target(&artifact, target);
        if node.aliases.len() >= session.config.max_relocations || !seen.insert(target.identity())
        {
            return Err(NodeFailure::Descriptor(DescriptorError::Invalid {
                artifact: node.artifact().to_string(),
                message: format!("relocation loop at {target}"),
            }));
        }
        tracing::debug!("{artifact} relocated to {target}");
        node.aliases.push(artifact);
        artifact = target;
    }
}

/// Fill what the relocation leaves unspecified from the coordinate being relocated.
fn relocation_target(from: &ArtifactCoordinate, to: ArtifactCoordinate) -> ArtifactCoordinate {
    let mut target = to;
    if target.version().is_empty() {
        target = target.with_version(from.version());
    }
    if target.properties().is_empty() && !from.properties().is_empty() {
        target = target.with_properties(from.properties().clone());
    }
    target
}

async fn read_descriptor(
    session: &Session,
    artifact: &ArtifactCoordinate,
    repositories: &[RemoteRepository],
) -> Result<ArtifactDescriptor, NodeFailure> {
    let request = DescriptorRequest {
        artifact: artifact.clone(),
        repositories: repositories.to_vec(),
        request_context: session.request_context.clone(),
    };
    let key = DescriptorCache::key(artifact, repositories);
    let (reader, permits, request) = (&session.reader, &session.permits, &request);
    let fetch = session.cache.descriptor(key, || async move {
        let _permit = permits.acquire().await;
        reader.read(request).await
    });
    tokio::select! {
        biased;
        _ = session.cancel.cancelled() => Err(cancelled(artifact)),
        result = fetch => result.map_err(NodeFailure::from),
    }
}

fn cancelled(artifact: &ArtifactCoordinate) -> NodeFailure {
    NodeFailure::Cancelled {
        artifact: artifact.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ClassicDependencyManager, StaticDependencySelector, StaticDependencyTraverser};
    use trellis_core::dependency::scope;

    fn dep(coord: &str) -> Dependency {
        Dependency::new(ArtifactCoordinate::parse(coord).unwrap(), scope::COMPILE)
    }

    #[test]
    fn ignorable_failures_follow_config() {
        let mut config = CollectConfig::default();
        let missing = NodeFailure::Descriptor(DescriptorError::Missing {
            artifact: "g:a".into(),
        });
        let transport = NodeFailure::Descriptor(DescriptorError::Transport {
            artifact: "g:a".into(),
            message: "timeout".into(),
        });
        assert!(!is_ignorable(&config, &missing));

        config.ignore_missing_descriptors = true;
        config.ignore_invalid_descriptors = true;
        assert!(is_ignorable(&config, &missing));
        assert!(!is_ignorable(&config, &transport));
        assert!(!is_ignorable(&config, &cancelled(&ArtifactCoordinate::new("g", "a", "1"))));
    }

    #[test]
    fn management_records_premanaged_values() {
        let policies = Policies::new(
            Arc::new(StaticDependencySelector::new(true)),
            Arc::new(StaticDependencyTraverser::new(true)),
            Arc::new(ClassicDependencyManager::new()),
        );
        let root = dep("com.example:app:1");
        let managed = vec![dep("org.lib:core:2.0").with_scope(scope::RUNTIME)];
        let direct = policies.derive_child(&CollectionContext {
            dependency: &root,
            managed_dependencies: &managed,
            depth: 0,
        });
        let transitive = direct.derive_child(&CollectionContext {
            dependency: &root,
            managed_dependencies: &[],
            depth: 1,
        });

        let (managed_dep, version, dep_scope) =
            apply_management(&transitive, &dep("org.lib:core:1.0"));
        assert_eq!(managed_dep.artifact().version(), "2.0");
        assert_eq!(version.as_deref(), Some("1.0"));
        assert_eq!(dep_scope.as_deref(), Some("compile"));

        let (untouched, version, dep_scope) = apply_management(&direct, &dep("org.lib:core:1.0"));
        assert_eq!(untouched.artifact().version(), "1.0");
        assert_eq!((version, dep_scope), (None, None));
    }

    #[test]
    fn relocation_keeps_version_and_properties() {
        let from = ArtifactCoordinate::new("old", "lib", "1.2")
            .with_property("includesDependencies", "true");
        let target = relocation_target(&from, ArtifactCoordinate::new("new", "lib", ""));
        assert_eq!(target.version(), "1.2");
        assert_eq!(target.property("includesDependencies"), Some("true"));

        let pinned = relocation_target(&from, ArtifactCoordinate::new("new", "lib", "2.0"));
        assert_eq!(pinned.version(), "2.0");
    }
}
