//! External text-generation oracle.
//!
//! The conflict subsystem uses the oracle for two roles only: explaining a
//! conflict in prose and generating merged code. Both go through the single
//! prompt-in, text-out [`Oracle::complete`] call.

pub mod huggingface;
pub mod scripted;

use async_trait::async_trait;

use crate::errors::OracleError;

pub use huggingface::HuggingFaceOracle;
pub use scripted::{Reply, ScriptedOracle};

/// A blocking round-trip from prompt to completion text.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}
