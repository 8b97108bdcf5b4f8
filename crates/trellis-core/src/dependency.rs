use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactCoordinate;

/// Maven-compatible dependency scopes.
pub mod scope {
    pub const COMPILE: &str = "compile";
    pub const RUNTIME: &str = "runtime";
    pub const PROVIDED: &str = "provided";
    pub const TEST: &str = "test";
    pub const SYSTEM: &str = "system";
}

/// Wildcard accepted by every [`Exclusion`] field.
pub const WILDCARD: &str = "*";

/// A transitive dependency to exclude. Any field may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "wildcard")]
    pub classifier: String,
    #[serde(default = "wildcard")]
    pub extension: String,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl Exclusion {
    /// Exclude `group:artifact` regardless of classifier and extension.
    pub fn new(group_id: &str, artifact_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            classifier: wildcard(),
            extension: wildcard(),
        }
    }

    pub fn matches(&self, artifact: &ArtifactCoordinate) -> bool {
        field_matches(&self.group_id, artifact.group_id())
            && field_matches(&self.artifact_id, artifact.artifact_id())
            && field_matches(&self.classifier, artifact.classifier())
            && field_matches(&self.extension, artifact.extension())
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

/// An immutable dependency edge: the target artifact plus how it is depended upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    artifact: ArtifactCoordinate,
    scope: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    exclusions: BTreeSet<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: ArtifactCoordinate, scope: &str) -> Self {
        Self {
            artifact,
            scope: scope.to_string(),
            optional: false,
            exclusions: BTreeSet::new(),
        }
    }

    pub fn artifact(&self) -> &ArtifactCoordinate {
        &self.artifact
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn exclusions(&self) -> &BTreeSet<Exclusion> {
        &self.exclusions
    }

    /// Key used to look up dependency management: `group:artifact:extension:classifier`.
    pub fn management_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.artifact.group_id(),
            self.artifact.artifact_id(),
            self.artifact.extension(),
            self.artifact.classifier()
        )
    }

    pub fn with_artifact(&self, artifact: ArtifactCoordinate) -> Self {
        Self {
            artifact,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            ..self.clone()
        }
    }

    pub fn with_optional(&self, optional: bool) -> Self {
        Self {
            optional,
            ..self.clone()
        }
    }

    pub fn with_exclusions<I>(&self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = Exclusion>,
    {
        Self {
            exclusions: exclusions.into_iter().collect(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.optional {
            f.write_str("?")?;
        }
        f.write_str(")")
    }
}
