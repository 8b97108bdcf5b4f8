use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Artifact property marking a fat artifact that bundles its own dependencies.
pub const PROPERTY_INCLUDES_DEPENDENCIES: &str = "includesDependencies";

/// Extension used when a coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// An immutable artifact coordinate: `group:artifact[:extension[:classifier]]:version`.
///
/// Equality and hashing consider only the five coordinate fields; the
/// `properties` bag is carried along but never compared. Every `with_*`
/// method returns a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(default)]
    classifier: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl ArtifactCoordinate {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: String::new(),
            extension: default_extension(),
            properties: BTreeMap::new(),
        }
    }

    /// Parse `group:artifact[:extension[:classifier]]:version`.
    ///
    /// Returns `None` unless the string has 3 to 5 non-empty leading parts.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 3 || parts.len() > 5 {
            return None;
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return None;
        }
        let version = parts[parts.len() - 1];
        let mut coord = Self::new(parts[0], parts[1], version);
        if parts.len() >= 4 {
            coord.extension = parts[2].to_string();
        }
        if parts.len() == 5 {
            coord.classifier = parts[3].to_string();
        }
        Some(coord)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }

    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Version-less identity: `group:artifact:classifier:extension`.
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.classifier, self.extension
        )
    }

    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..self.clone()
        }
    }

    pub fn with_classifier(&self, classifier: &str) -> Self {
        Self {
            classifier: classifier.to_string(),
            ..self.clone()
        }
    }

    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            ..self.clone()
        }
    }

    pub fn with_properties(&self, properties: BTreeMap<String, String>) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    pub fn with_property(&self, key: &str, value: &str) -> Self {
        let mut properties = self.properties.clone();
        properties.insert(key.to_string(), value.to_string());
        self.with_properties(properties)
    }
}

impl PartialEq for ArtifactCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
            && self.classifier == other.classifier
            && self.extension == other.extension
    }
}

impl Eq for ArtifactCoordinate {}

impl Hash for ArtifactCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.version.hash(state);
        self.classifier.hash(state);
        self.extension.hash(state);
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}
