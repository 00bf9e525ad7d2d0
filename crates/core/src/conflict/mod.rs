//! Conflict parsing, validation, merging, and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parsing** -- locating marker-delimited regions in a working-tree file.
//! 2. **Merging** -- keeping one side, or asking the oracle to combine both
//!    and checking the result with a syntax validator.
//! 3. **Resolution** -- splicing resolutions back and gating the write on a
//!    whole-file validation.

pub mod analyzer;
pub mod formatter;
pub mod merger;
pub mod parser;
pub mod resolver;
pub mod strategy;
pub mod validator;

pub use analyzer::ConflictAnalyzer;
pub use formatter::ConflictFormatter;
pub use merger::AiMerger;
pub use parser::{ConflictParser, ConflictRegion};
pub use resolver::ConflictResolver;
pub use strategy::{FileFailure, Resolution, ResolutionStrategy};
pub use validator::{SyntaxValidator, Validation};
