use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote repository that artifacts and descriptors are fetched from.
///
/// The resolver never talks to it directly; it is handed to the external
/// descriptor reader and range resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn maven_central() -> Self {
        Self::new("central", "https://repo.maven.apache.org/maven2")
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Append `extra` to `repos`, skipping ids already present.
pub fn merge_repositories(repos: &[RemoteRepository], extra: &[RemoteRepository]) -> Vec<RemoteRepository> {
    let mut merged = repos.to_vec();
    for repo in extra {
        if !merged.iter().any(|r| r.id == repo.id) {
            merged.push(repo.clone());
        }
    }
    merged
}
