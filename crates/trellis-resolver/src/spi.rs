//! Collaborators the collector consumes but does not implement.
//!
//! Metadata readers and version listings live in the transport layer; the
//! collector only sees these traits.

use async_trait::async_trait;

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::dependency::Dependency;
use trellis_core::repository::RemoteRepository;

use crate::error::{DescriptorError, RangeResolutionError};
use crate::version::Version;

/// Request to read the descriptor of one artifact.
#[derive(Debug, Clone)]
pub struct DescriptorRequest {
    pub artifact: ArtifactCoordinate,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
}

/// What a descriptor says about an artifact.
#[derive(Debug, Clone)]
pub struct ArtifactDescriptor {
    pub artifact: ArtifactCoordinate,
    /// Direct dependencies in declaration order.
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub relocated_to: Option<ArtifactCoordinate>,
    /// Additional repositories declared by the artifact.
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactDescriptor {
    pub fn new(artifact: ArtifactCoordinate) -> Self {
        Self {
            artifact,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            relocated_to: None,
            repositories: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    pub fn with_relocation(mut self, target: ArtifactCoordinate) -> Self {
        self.relocated_to = Some(target);
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }
}

#[async_trait]
pub trait ArtifactDescriptorReader: Send + Sync {
    async fn read(&self, request: &DescriptorRequest) -> Result<ArtifactDescriptor, DescriptorError>;
}

/// Request to list the versions that satisfy a range constraint.
#[derive(Debug, Clone)]
pub struct VersionRangeRequest {
    pub artifact: ArtifactCoordinate,
    /// The constraint string exactly as declared.
    pub constraint: String,
    pub repositories: Vec<RemoteRepository>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionRangeResult {
    /// The resolver's own pick, if it made one.
    pub selected: Option<Version>,
    /// Every available version inside the constraint, in any order.
    pub candidates: Vec<Version>,
}

#[async_trait]
pub trait VersionRangeResolver: Send + Sync {
    async fn resolve(
        &self,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, RangeResolutionError>;
}
