//! Per-request memo of descriptor reads and range resolutions.
//!
//! The same coordinate usually shows up in many branches of one graph. Each
//! distinct (coordinate, repositories) pair is fetched at most once; branches
//! asking concurrently wait on the same in-flight fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use trellis_core::artifact::ArtifactCoordinate;
use trellis_core::repository::RemoteRepository;

use crate::error::{DescriptorError, RangeResolutionError};
use crate::spi::{ArtifactDescriptor, VersionRangeResult};

type Slot<T> = Arc<OnceCell<T>>;

#[derive(Debug, Default)]
pub struct DescriptorCache {
    descriptors: Mutex<HashMap<String, Slot<Result<ArtifactDescriptor, DescriptorError>>>>,
    ranges: Mutex<HashMap<String, Slot<Result<VersionRangeResult, RangeResolutionError>>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key: the full coordinate plus the ids of the repositories searched.
    pub fn key(artifact: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> String {
        let mut key = artifact.to_string();
        for repo in repositories {
            key.push('|');
            key.push_str(&repo.id);
        }
        key
    }

    /// Return the cached descriptor for `key`, running `fetch` on first use.
    pub async fn descriptor<F, Fut>(
        &self,
        key: String,
        fetch: F,
    ) -> Result<ArtifactDescriptor, DescriptorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ArtifactDescriptor, DescriptorError>>,
    {
        memoize(&self.descriptors, key, fetch).await
    }

    pub async fn range<F, Fut>(
        &self,
        key: String,
        fetch: F,
    ) -> Result<VersionRangeResult, RangeResolutionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VersionRangeResult, RangeResolutionError>>,
    {
        memoize(&self.ranges, key, fetch).await
    }

    /// Number of distinct descriptors requested so far.
    pub async fn descriptor_count(&self) -> usize {
        self.descriptors.lock().await.len()
    }
}

async fn memoize<T, F, Fut>(map: &Mutex<HashMap<String, Slot<T>>>, key: String, fetch: F) -> T
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let slot = map.lock().await.entry(key).or_default().clone();
    slot.get_or_init(fetch).await.clone()
}
