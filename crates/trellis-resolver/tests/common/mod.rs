//! In-memory collaborators and builders shared by the resolver integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::dependency::{scope, Dependency};
use trellis_core::repository::RemoteRepository;
use trellis_resolver::collector::{CollectRequest, DependencyCollector};
use trellis_resolver::error::{DescriptorError, RangeResolutionError};
use trellis_resolver::spi::{
    ArtifactDescriptor, ArtifactDescriptorReader, DescriptorRequest, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult,
};
use trellis_resolver::version::{Version, VersionConstraint};

pub fn coord(s: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::parse(s).unwrap()
}

pub fn dep(s: &str) -> Dependency {
    Dependency::new(coord(s), scope::COMPILE)
}

pub fn dep_scoped(s: &str, dep_scope: &str) -> Dependency {
    Dependency::new(coord(s), dep_scope)
}

pub fn request(root: &str) -> CollectRequest {
    CollectRequest::new(dep(root), vec![RemoteRepository::maven_central()])
}

/// Descriptors keyed by the coordinate's display form (`g:a:ext[:cls]:v`).
#[derive(Default)]
pub struct MemoryRepository {
    descriptors: HashMap<String, ArtifactDescriptor>,
    invalid: HashSet<String>,
    unreachable: HashSet<String>,
    slow: HashSet<String>,
    reads: Mutex<HashMap<String, usize>>,
    total_reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `artifact` with the given direct dependencies.
    pub fn with(mut self, artifact: &str, dependencies: Vec<Dependency>) -> Self {
        let descriptor = ArtifactDescriptor::new(coord(artifact)).with_dependencies(dependencies);
        self.descriptors.insert(coord(artifact).to_string(), descriptor);
        self
    }

    pub fn with_descriptor(mut self, descriptor: ArtifactDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.artifact.to_string(), descriptor);
        self
    }

    pub fn with_relocation(mut self, from: &str, to: &str) -> Self {
        let descriptor = ArtifactDescriptor::new(coord(from)).with_relocation(coord(to));
        self.descriptors.insert(coord(from).to_string(), descriptor);
        self
    }

    pub fn with_invalid(mut self, artifact: &str) -> Self {
        self.invalid.insert(coord(artifact).to_string());
        self
    }

    pub fn with_unreachable(mut self, artifact: &str) -> Self {
        self.unreachable.insert(coord(artifact).to_string());
        self
    }

    /// Reads of `artifact` hang until the collection is cancelled.
    pub fn with_slow(mut self, artifact: &str) -> Self {
        self.slow.insert(coord(artifact).to_string());
        self
    }

    pub fn reads_of(&self, artifact: &str) -> usize {
        let reads = self.reads.lock().unwrap();
        reads.get(&coord(artifact).to_string()).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.total_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactDescriptorReader for MemoryRepository {
    async fn read(&self, request: &DescriptorRequest) -> Result<ArtifactDescriptor, DescriptorError> {
        let key = request.artifact.to_string();
        *self.reads.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.total_reads.fetch_add(1, Ordering::SeqCst);

        if self.slow.contains(&key) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.invalid.contains(&key) {
            return Err(DescriptorError::Invalid {
                artifact: key,
                message: "malformed descriptor".to_string(),
            });
        }
        if self.unreachable.contains(&key) {
            return Err(DescriptorError::Transport {
                artifact: key,
                message: "connection refused".to_string(),
            });
        }
        self.descriptors
            .get(&key)
            .cloned()
            .ok_or(DescriptorError::Missing { artifact: key })
    }
}

/// Available versions keyed by `group:artifact`.
#[derive(Default)]
pub struct MemoryVersions {
    versions: HashMap<String, Vec<Version>>,
}

impl MemoryVersions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, versions: &[&str]) -> Self {
        self.versions.insert(
            key.to_string(),
            versions.iter().map(|v| Version::parse(v).unwrap()).collect(),
        );
        self
    }
}

#[async_trait]
impl VersionRangeResolver for MemoryVersions {
    async fn resolve(
        &self,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, RangeResolutionError> {
        let error = |message: String| RangeResolutionError {
            artifact: request.artifact.key(),
            constraint: request.constraint.clone(),
            message,
        };
        let constraint =
            VersionConstraint::parse(&request.constraint).map_err(|e| error(e.to_string()))?;
        let available = self
            .versions
            .get(&request.artifact.key())
            .ok_or_else(|| error("no versions listed".to_string()))?;
        Ok(VersionRangeResult {
            selected: None,
            candidates: available
                .iter()
                .filter(|v| constraint.contains(v))
                .cloned()
                .collect(),
        })
    }
}

pub fn collector(repository: MemoryRepository) -> (DependencyCollector, Arc<MemoryRepository>) {
    collector_with_versions(repository, MemoryVersions::new())
}

pub fn collector_with_versions(
    repository: MemoryRepository,
    versions: MemoryVersions,
) -> (DependencyCollector, Arc<MemoryRepository>) {
    let repository = Arc::new(repository);
    let collector = DependencyCollector::new(repository.clone(), Arc::new(versions));
    (collector, repository)
}
