//! Graph transformers run over a collected tree, strictly in sequence.
//!
//! The order is part of the result: conflict resolution needs conflict ids,
//! and scope refinement needs resolved winners. Pipelines are therefore
//! assembled explicitly by the caller; each transformer checks that the
//! stages it depends on have already run and fails otherwise.

pub mod conflict_resolver;
pub mod marker;
pub mod refiner;

use trellis_core::config::TieBreak;

use crate::conflict::ConflictReport;
use crate::error::TransformError;
use crate::node::DependencyNode;

pub use conflict_resolver::{
    ConflictResolver, NearestFirstDeclared, NearestHighestVersion, WinnerSelector,
};
pub use marker::ConflictMarker;
pub use refiner::{propagate_scope, DependencyContextRefiner};

/// State handed from one transformer to the next.
#[derive(Debug, Default)]
pub struct TransformContext {
    /// Number of conflict groups, set by the marker.
    pub conflict_groups: Option<usize>,
    pub conflicts_resolved: bool,
    pub conflicts: ConflictReport,
}

impl TransformContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One stage of the pipeline. Mutates the tree in place.
pub trait GraphTransformer: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform_graph(
        &self,
        root: &mut DependencyNode,
        context: &mut TransformContext,
    ) -> Result<(), TransformError>;
}

/// An ordered list of transformers.
pub struct TransformPipeline {
    transformers: Vec<Box<dyn GraphTransformer>>,
}

impl TransformPipeline {
    pub fn new(transformers: Vec<Box<dyn GraphTransformer>>) -> Self {
        Self { transformers }
    }

    /// Marker, then nearest-wins resolution, then scope refinement.
    pub fn standard() -> Self {
        Self::with_tie_break(TieBreak::default())
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        let resolver = match tie_break {
            TieBreak::FirstDeclared => ConflictResolver::new(Box::new(NearestFirstDeclared)),
            TieBreak::HighestVersion => ConflictResolver::new(Box::new(NearestHighestVersion)),
        };
        Self::new(vec![
            Box::new(ConflictMarker),
            Box::new(resolver),
            Box::new(DependencyContextRefiner),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub fn run(
        &self,
        root: DependencyNode,
    ) -> Result<(DependencyNode, TransformContext), TransformError> {
        run_pipeline(&self.transformers, root)
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run `transformers` in order over `root`, stopping at the first error.
pub fn run_pipeline(
    transformers: &[Box<dyn GraphTransformer>],
    mut root: DependencyNode,
) -> Result<(DependencyNode, TransformContext), TransformError> {
    let mut context = TransformContext::new();
    for transformer in transformers {
        tracing::debug!("Running graph transformer {}", transformer.name());
        transformer.transform_graph(&mut root, &mut context)?;
    }
    tracing::info!(
        "Transformed {} nodes ({} conflicts)",
        root.len(),
        context.conflicts.len()
    );
    Ok((root, context))
}
