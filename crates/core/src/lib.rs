//! mergewise core library.
//!
//! This crate provides the components for resolving git merge conflicts in a
//! working tree: configuration, conflict parsing and syntax validation,
//! oracle-assisted merging, the git subprocess client, and the engine that
//! ties them together.

pub mod config;
pub mod conflict;
pub mod engine;
pub mod errors;
pub mod git;
pub mod oracle;

// Re-exports for convenience.
pub use config::AppConfig;
pub use engine::{ConflictListing, OperationStatus, ResolutionEngine, ResolutionReport};
pub use errors::CoreError;
