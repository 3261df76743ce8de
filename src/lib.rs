//! Kiln is a template-driven source tree scaffolding engine.
//! It reads a bundle of template files, rewrites their paths and contents
//! through an ordered chain of stages, and writes the result under a
//! destination root.

/// Built-in blockchain application scaffold
pub mod app;

/// Command-line interface module for the kiln application
pub mod cli;

/// Template manifest handling
/// Supports JSON and YAML formats (kiln.json, kiln.yml, kiln.yaml)
pub mod config;

pub mod constants;

/// Variable bindings shared by every stage of a run
pub mod context;

/// Error types and handling for the kiln application
pub mod error;

/// Run orchestration: transform, preflight, then commit
pub mod generator;

/// File and directory ignore patterns
/// Processes .kilnignore files to exclude specific paths
pub mod ignore;

/// Template sources: local directories and embedded bundles
pub mod loader;

pub mod pipeline;

/// Template expression rendering
pub mod renderer;

/// Ordered rewrite stages
pub mod transform;

/// Destination writers and overwrite policies
pub mod writer;
