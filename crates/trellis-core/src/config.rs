use std::path::Path;

use serde::{Deserialize, Serialize};

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::dependency::scope;

/// Resolver settings, usually loaded from a `trellis.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub collect: CollectConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub conflicts: ConflictConfig,
}

/// Collection settings from `[collect]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    #[serde(
        default = "default_max_concurrent_requests",
        rename = "max-concurrent-requests"
    )]
    pub max_concurrent_requests: usize,
    #[serde(default, rename = "ignore-missing-descriptors")]
    pub ignore_missing_descriptors: bool,
    #[serde(default, rename = "ignore-invalid-descriptors")]
    pub ignore_invalid_descriptors: bool,
    #[serde(default = "default_max_relocations", rename = "max-relocations")]
    pub max_relocations: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            ignore_missing_descriptors: false,
            ignore_invalid_descriptors: false,
            max_relocations: default_max_relocations(),
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_max_relocations() -> usize {
    16
}

/// Default dependency selection settings from `[selection]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_optional_depth", rename = "optional-depth")]
    pub optional_depth: usize,
    #[serde(
        default = "default_transitive_excluded_scopes",
        rename = "transitive-excluded-scopes"
    )]
    pub transitive_excluded_scopes: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            optional_depth: default_optional_depth(),
            transitive_excluded_scopes: default_transitive_excluded_scopes(),
        }
    }
}

fn default_optional_depth() -> usize {
    2
}

fn default_transitive_excluded_scopes() -> Vec<String> {
    vec![scope::TEST.to_string(), scope::PROVIDED.to_string()]
}

/// Conflict resolution settings from `[conflicts]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictConfig {
    #[serde(default, rename = "tie-break")]
    pub tie_break: TieBreak,
}

/// How two conflict candidates at the same depth are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// First candidate in depth-first declaration order.
    #[default]
    FirstDeclared,
    /// Highest version among the shallowest candidates.
    HighestVersion,
}

impl ResolverConfig {
    /// Parse a configuration from TOML text.
    pub fn parse_toml(content: &str) -> TrellisResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| TrellisError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> TrellisResult<Self> {
        if !path.is_file() {
            tracing::debug!("No resolver config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(TrellisError::Io)?;
        Self::parse_toml(&content)
    }

    fn validate(&self) -> TrellisResult<()> {
        if self.collect.max_concurrent_requests == 0 {
            return Err(TrellisError::Config {
                message: "collect.max-concurrent-requests must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
