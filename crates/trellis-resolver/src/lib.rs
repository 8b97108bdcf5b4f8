//! Dependency resolution engine: version model, recursive graph collection
//! with pluggable selection/traversal/management policies, and the
//! conflict-marking, nearest-wins and scope-refining transform pipeline.

pub mod cache;
pub mod collector;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod node;
pub mod policy;
pub mod resolver;
pub mod spi;
pub mod transform;
pub mod version;
