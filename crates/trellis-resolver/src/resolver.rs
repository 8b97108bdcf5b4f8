//! Top-level entry point: collect a graph, then run the transform pipeline.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use trellis_core::config::ResolverConfig;

use crate::collector::{CollectRequest, DependencyCollector};
use crate::conflict::ConflictReport;
use crate::error::ResolveError;
use crate::graph::ResolvedArtifact;
use crate::node::DependencyNode;
use crate::policy::Policies;
use crate::spi::{ArtifactDescriptorReader, VersionRangeResolver};
use crate::transform::TransformPipeline;

/// The output of dependency resolution.
#[derive(Debug)]
pub struct Resolution {
    /// The transformed tree. Conflict losers are still present, pointing at their winner.
    pub root: DependencyNode,
    pub conflicts: ConflictReport,
    /// Deduplicated winners in pre-order.
    pub artifacts: Vec<ResolvedArtifact>,
}

/// Collect `request` with `policies`, then run `pipeline` over the result.
pub async fn resolve(
    collector: &DependencyCollector,
    request: CollectRequest,
    policies: Policies,
    pipeline: &TransformPipeline,
) -> Result<Resolution, ResolveError> {
    resolve_with_cancellation(collector, request, policies, pipeline, CancellationToken::new())
        .await
}

pub async fn resolve_with_cancellation(
    collector: &DependencyCollector,
    request: CollectRequest,
    policies: Policies,
    pipeline: &TransformPipeline,
    cancel: CancellationToken,
) -> Result<Resolution, ResolveError> {
    let root = collector
        .collect_with_cancellation(request, policies, cancel)
        .await?;
    let (root, context) = pipeline.run(root)?;
    let artifacts = root.flatten();
    tracing::info!(
        "Resolved {} artifacts for {}",
        artifacts.len(),
        root.artifact()
    );
    Ok(Resolution {
        root,
        conflicts: context.conflicts,
        artifacts,
    })
}

/// Collector, policies and pipeline assembled from a [`ResolverConfig`].
pub struct Resolver {
    collector: DependencyCollector,
    policies: Policies,
    pipeline: TransformPipeline,
}

impl Resolver {
    pub fn new(
        reader: Arc<dyn ArtifactDescriptorReader>,
        range_resolver: Arc<dyn VersionRangeResolver>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            collector: DependencyCollector::new(reader, range_resolver)
                .with_config(config.collect.clone()),
            policies: Policies::from_config(&config.selection),
            pipeline: TransformPipeline::with_tie_break(config.conflicts.tie_break),
        }
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    pub async fn resolve(&self, request: CollectRequest) -> Result<Resolution, ResolveError> {
        resolve(&self.collector, request, self.policies.clone(), &self.pipeline).await
    }

    pub async fn resolve_with_cancellation(
        &self,
        request: CollectRequest,
        cancel: CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        resolve_with_cancellation(
            &self.collector,
            request,
            self.policies.clone(),
            &self.pipeline,
            cancel,
        )
        .await
    }
}
