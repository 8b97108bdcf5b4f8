//! Error taxonomy for version parsing, collection and graph transformation.

use miette::Diagnostic;
use thiserror::Error;

use trellis_util::errors::TrellisError;

use crate::node::DependencyNode;

/// A malformed version, range or constraint string.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error("empty version string")]
    #[diagnostic(code(trellis::version::empty))]
    EmptyVersion,

    #[error("invalid character {character:?} in version {input:?}")]
    #[diagnostic(code(trellis::version::invalid_character))]
    InvalidVersion { input: String, character: char },

    #[error("version range {input:?} must start with '[' or '('")]
    #[diagnostic(code(trellis::range::missing_open))]
    MissingOpenDelimiter { input: String },

    #[error("version range {input:?} must end with ']' or ')'")]
    #[diagnostic(code(trellis::range::missing_close))]
    MissingCloseDelimiter { input: String },

    #[error("version range {input:?} has more than two bounds")]
    #[diagnostic(code(trellis::range::too_many_bounds))]
    TooManyBounds { input: String },

    #[error("single-version range {input:?} must be written as [version]")]
    #[diagnostic(code(trellis::range::exact))]
    ExactRangeNeedsBrackets { input: String },

    #[error("version range {input:?} has its lower bound above its upper bound")]
    #[diagnostic(code(trellis::range::inverted))]
    InvertedRange { input: String },

    #[error("version range {input:?} cannot contain any version")]
    #[diagnostic(code(trellis::range::empty))]
    EmptyRange { input: String },

    #[error("empty version constraint")]
    #[diagnostic(code(trellis::constraint::empty))]
    EmptyConstraint,

    #[error("version constraint {input:?} mixes a bare version with ranges")]
    #[diagnostic(
        code(trellis::constraint::mixed),
        help("write every alternative as a range, e.g. [1.0,2.0),[3.0]")
    )]
    MixedConstraint { input: String },

    #[error("version constraint {input:?} lists more than one bare version")]
    #[diagnostic(code(trellis::constraint::multiple_recommended))]
    MultipleRecommended { input: String },

    #[error("unexpected input {rest:?} in version constraint {input:?}")]
    #[diagnostic(code(trellis::constraint::trailing_input))]
    TrailingInput { input: String, rest: String },
}

/// Failure reported by an [`crate::spi::ArtifactDescriptorReader`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DescriptorError {
    #[error("descriptor for {artifact} not found")]
    #[diagnostic(code(trellis::descriptor::missing))]
    Missing { artifact: String },

    #[error("invalid descriptor for {artifact}: {message}")]
    #[diagnostic(code(trellis::descriptor::invalid))]
    Invalid { artifact: String, message: String },

    #[error("failed to fetch descriptor for {artifact}: {message}")]
    #[diagnostic(code(trellis::descriptor::transport))]
    Transport { artifact: String, message: String },
}

/// Failure reported by a [`crate::spi::VersionRangeResolver`], or a range no
/// available version satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("failed to resolve version range {constraint} for {artifact}: {message}")]
#[diagnostic(code(trellis::range::resolution))]
pub struct RangeResolutionError {
    pub artifact: String,
    pub constraint: String,
    pub message: String,
}

/// Why a node could not be fully collected. Attached to the node it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum NodeFailure {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    VersionRange(#[from] RangeResolutionError),

    #[error("invalid version constraint for {artifact}: {source}")]
    #[diagnostic(code(trellis::collect::constraint))]
    Constraint {
        artifact: String,
        #[source]
        source: ParseError,
    },

    #[error("collection of {artifact} was cancelled")]
    #[diagnostic(code(trellis::collect::cancelled))]
    Cancelled { artifact: String },

    #[error("collection task for a child of {parent} aborted: {message}")]
    #[diagnostic(code(trellis::collect::task))]
    TaskAborted { parent: String, message: String },
}

impl NodeFailure {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, NodeFailure::Cancelled { .. })
    }
}

/// Collection finished with at least one unrecoverable subtree failure.
///
/// Carries the partial graph: failed nodes are present with their failure
/// attached and no children, every sibling subtree is complete.
#[derive(Debug, Error, Diagnostic)]
#[error("{}", summary(.failures, .cancelled))]
#[diagnostic(code(trellis::collect::failed))]
pub struct CollectionError {
    pub root: Box<DependencyNode>,
    #[related]
    pub failures: Vec<NodeFailure>,
    pub cancelled: bool,
}

fn summary(failures: &[NodeFailure], cancelled: &bool) -> String {
    if *cancelled {
        return "dependency collection was cancelled".to_string();
    }
    match failures {
        [only] => format!("failed to collect dependencies: {only}"),
        [first, ..] => format!(
            "failed to collect dependencies: {first} (and {} more)",
            failures.len() - 1
        ),
        [] => "failed to collect dependencies".to_string(),
    }
}

/// A graph transformer could not complete. Fatal to the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("graph transformer {transformer} failed: {message}")]
#[diagnostic(code(trellis::transform::failed))]
pub struct TransformError {
    pub transformer: String,
    pub message: String,
}

impl TransformError {
    pub fn new(transformer: &str, message: impl Into<String>) -> Self {
        Self {
            transformer: transformer.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of the combined collect-then-transform entry point.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(#[from] TransformError),
}

impl From<ParseError> for TrellisError {
    fn from(err: ParseError) -> Self {
        TrellisError::Parse {
            message: err.to_string(),
        }
    }
}

impl From<ResolveError> for TrellisError {
    fn from(err: ResolveError) -> Self {
        TrellisError::Resolution {
            message: err.to_string(),
        }
    }
}
