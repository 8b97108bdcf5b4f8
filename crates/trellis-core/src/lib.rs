//! Core data types for the Trellis dependency resolver.
//!
//! This crate defines the immutable value objects the resolver works on:
//! artifact coordinates, dependencies and exclusions, remote repositories,
//! and the resolver configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod artifact;
pub mod config;
pub mod dependency;
pub mod repository;
