//! Shared utilities for the Trellis dependency resolver.
//!
//! This crate provides the cross-cutting error type used by the other
//! Trellis crates when a caller does not need the detailed error taxonomy.

pub mod errors;
