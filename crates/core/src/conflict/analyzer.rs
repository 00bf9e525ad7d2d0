//! Natural-language explanation of a conflict.

use std::sync::Arc;

use tracing::{debug, warn};

use super::parser::ConflictRegion;
use crate::oracle::Oracle;

/// Returned when the oracle answers with nothing.
pub const EMPTY_ANALYSIS: &str = "Unable to analyze.";

/// Asks the oracle to explain what each side of a conflict does.
///
/// The output is advisory: it is shown to the user and fed into the merge
/// prompt, never validated.
pub struct ConflictAnalyzer {
    oracle: Arc<dyn Oracle>,
}

impl ConflictAnalyzer {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Explain the conflict. Never fails; oracle errors become the returned text.
    pub async fn analyze(&self, conflict: &ConflictRegion) -> String {
        let prompt = analysis_prompt(conflict);
        debug!(
            path = %conflict.file_path,
            start_line = conflict.start_line,
            oracle = self.oracle.name(),
            "requesting conflict analysis"
        );

        match self.oracle.complete(&prompt).await {
            Ok(text) if text.trim().is_empty() => EMPTY_ANALYSIS.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(path = %conflict.file_path, error = %e, "conflict analysis failed");
                format!("Analysis failed: {}", e)
            }
        }
    }
}

fn analysis_prompt(conflict: &ConflictRegion) -> String {
    format!(
        "You are analyzing a merge conflict. Your job is to EXPLAIN the differences, NOT to write code.

FILE: {path} ({ext})

CURRENT BRANCH ({current_branch}):
{current}

INCOMING BRANCH ({incoming_branch}):
{incoming}

Provide a 2-3 sentence analysis covering:
1. What does the CURRENT version do?
2. What does the INCOMING version do?
3. What is the key difference?

DO NOT generate any code. DO NOT suggest a resolution. ONLY explain what changed.
Keep it concise and clear.",
        path = conflict.file_path,
        ext = conflict.extension(),
        current_branch = conflict.current_branch,
        current = conflict.current_text(),
        incoming_branch = conflict.incoming_branch,
        incoming = conflict.incoming_text(),
    )
}
