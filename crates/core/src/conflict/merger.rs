//! Oracle-backed merge of both sides of a conflict.
//!
//! The oracle proposes merged code, the [`SyntaxValidator`] gates it, and a
//! bounded number of fix prompts are sent when the candidate does not parse.
//! Failure is only ever reported through [`Resolution::is_valid`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::parser::{ConflictRegion, BASE_MARKER, BEGIN_MARKER, END_MARKER, SEPARATOR_MARKER};
use super::strategy::Resolution;
use super::validator::SyntaxValidator;
use crate::oracle::Oracle;

/// Fix attempts made after the first candidate fails validation.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Merges both sides of a conflict through the oracle.
pub struct AiMerger {
    oracle: Arc<dyn Oracle>,
}

impl AiMerger {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Produce a merged candidate for `conflict`.
    ///
    /// At most `max_retries` fix prompts follow the initial merge prompt. If
    /// the initial call fails or yields nothing usable, the incoming side is
    /// returned verbatim with `is_valid = false`.
    pub async fn merge(
        &self,
        conflict: &ConflictRegion,
        analysis: &str,
        max_retries: u32,
    ) -> Resolution {
        let prompt = merge_prompt(conflict, analysis);

        let mut merged = match self.oracle.complete(&prompt).await {
            Ok(text) => clean_output(&text),
            Err(e) => {
                warn!(path = %conflict.file_path, error = %e, "LLM merge failed");
                return Resolution::from_lines(conflict.incoming_content.clone(), false);
            }
        };
        if merged.is_empty() {
            warn!(path = %conflict.file_path, "LLM merge produced no code");
            return Resolution::from_lines(conflict.incoming_content.clone(), false);
        }

        let mut validation = SyntaxValidator::validate_fragment(&conflict.file_path, &merged);
        let mut attempt = 0;
        while !validation.is_valid && attempt < max_retries {
            attempt += 1;
            info!(
                path = %conflict.file_path,
                attempt,
                max_retries,
                error = validation.error_text(),
                "syntax error detected, attempting fix"
            );

            let fix = fix_prompt(conflict, &merged, validation.error_text());
            match self.oracle.complete(&fix).await {
                Ok(text) => {
                    let cleaned = clean_output(&text);
                    if !cleaned.is_empty() {
                        merged = cleaned;
                    }
                }
                Err(e) => {
                    warn!(path = %conflict.file_path, attempt, error = %e, "fix request failed");
                }
            }
            validation = SyntaxValidator::validate_fragment(&conflict.file_path, &merged);
        }

        if validation.is_valid {
            debug!(path = %conflict.file_path, attempts = attempt, "merged candidate validated");
        } else {
            warn!(
                path = %conflict.file_path,
                max_retries,
                error = validation.error_text(),
                "could not fix syntax"
            );
        }
        Resolution::new(merged, validation.is_valid)
    }
}

/// Strip a surrounding markdown fence and leftover conflict marker lines
/// from oracle output.
///
/// Only the first and last non-blank lines are treated as fences; a fence
/// inside the body is content. Separator lines must be exactly seven `=`.
pub fn clean_output(code: &str) -> String {
    let mut lines: Vec<&str> = code.lines().collect();

    let first = lines.iter().position(|l| !l.trim().is_empty());
    if let Some(i) = first {
        if is_opening_fence(lines[i]) {
            lines.remove(i);
        }
    }
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    if let Some(i) = last {
        if lines[i].trim() == "```" {
            lines.remove(i);
        }
    }

    lines
        .into_iter()
        .filter(|line| !is_marker_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_string()
}

fn is_opening_fence(line: &str) -> bool {
    line.trim()
        .strip_prefix("```")
        .is_some_and(|tag| tag.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '+' || c == '-'))
}

fn is_marker_line(line: &str) -> bool {
    line.starts_with(BEGIN_MARKER)
        || line.starts_with(BASE_MARKER)
        || line.starts_with(END_MARKER)
        || line.trim_end() == SEPARATOR_MARKER
}

fn merge_prompt(conflict: &ConflictRegion, analysis: &str) -> String {
    format!(
        "You are merging two versions of code into one valid implementation.

FILE: {path} ({ext})
CONTEXT: {analysis}

CURRENT VERSION:
{current}

INCOMING VERSION:
{incoming}

TASK: Create ONE valid merged version that intelligently combines both.

RULES:
1. Output ONLY the merged code, NO explanations or markdown.
2. Ensure syntax is 100% valid.
3. If both versions do the same thing differently, choose the better one.
4. If they provide different functionality, preserve both if it makes sense.
5. If merging both creates invalid code (e.g., duplicate returns), choose the better version.
6. Remove any conflict markers (<<<<<<<, =======, >>>>>>>).
7. Maintain proper indentation and formatting.
8. Do NOT introduce new functions, classes, or variables that are not in either version.
9. If uncertain, prefer the incoming version exactly as written.
10. Do NOT include backticks or markdown formatting.
11. Preserve indentation exactly for indentation-sensitive languages such as Python and YAML.
12. Keep the original function and variable names; do not invent names like merged_code or resolved_code.

Merged code:",
        path = conflict.file_path,
        ext = conflict.extension(),
        analysis = analysis,
        current = conflict.current_text(),
        incoming = conflict.incoming_text(),
    )
}

fn fix_prompt(conflict: &ConflictRegion, broken: &str, error: &str) -> String {
    format!(
        "The following merged code has a syntax error. Fix it.

FILE TYPE: {ext}
ERROR: {error}

BROKEN CODE:
```
{broken}
```

ORIGINAL VERSIONS FOR REFERENCE:
CURRENT:
```
{current}
```

INCOMING:
```
{incoming}
```

Fix the syntax error and output ONLY the corrected code, NO explanations.

Fixed code:",
        ext = conflict.extension(),
        error = error,
        broken = broken,
        current = conflict.current_text(),
        incoming = conflict.incoming_text(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Reply, ScriptedOracle};

    fn conflict(path: &str) -> ConflictRegion {
        ConflictRegion {
            file_path: path.into(),
            start_line: 0,
            end_line: 4,
            current_branch: "HEAD".into(),
            incoming_branch: "feature".into(),
            current_content: vec!["def f():".into(), "    return 1".into()],
            incoming_content: vec!["def f():".into(), "    return 2".into()],
            base_content: Vec::new(),
        }
    }

    #[test]
    fn test_clean_output_strips_fences_and_markers() {
        let raw = "```python\n<<<<<<< HEAD\ndef f():\n    return 1\n=======\n>>>>>>> feature\n```\n";
        assert_eq!(clean_output(raw), "def f():\n    return 1");
    }

    #[test]
    fn test_clean_output_keeps_inner_fences_and_rules() {
        let raw = "```rst\nTitle\n==========\n\nExample::\n\n```\ncode\n```\n```";
        assert_eq!(
            clean_output(raw),
            "Title\n==========\n\nExample::\n\n```\ncode\n```"
        );
    }

    #[test]
    fn test_clean_output_keeps_leading_indentation() {
        assert_eq!(clean_output("\n    x = 1\n"), "    x = 1");
    }

    #[tokio::test]
    async fn test_valid_first_candidate() {
        let oracle = Arc::new(ScriptedOracle::always("def f():\n    return 1 + 2\n"));
        let merger = AiMerger::new(oracle.clone());
        let res = merger.merge(&conflict("m.py"), "analysis text", 2).await;
        assert!(res.is_valid);
        assert_eq!(res.text(), "def f():\n    return 1 + 2");
        assert_eq!(oracle.call_count(), 1);

        let prompt = &oracle.prompts()[0];
        assert!(prompt.contains("CONTEXT: analysis text"));
        assert!(prompt.contains("INCOMING VERSION:\ndef f():\n    return 2"));
    }

    #[tokio::test]
    async fn test_fix_loop_recovers() {
        let oracle = Arc::new(ScriptedOracle::new(
            [
                Reply::text("def f(:\n    return 3"),
                Reply::text("def f():\n    return 3"),
            ],
            Reply::fail("unexpected extra call"),
        ));
        let merger = AiMerger::new(oracle.clone());
        let res = merger.merge(&conflict("m.py"), "", 2).await;
        assert!(res.is_valid);
        assert_eq!(res.text(), "def f():\n    return 3");
        assert_eq!(oracle.call_count(), 2);

        let fix = &oracle.prompts()[1];
        assert!(fix.starts_with("The following merged code has a syntax error."));
        assert!(fix.contains("ERROR: Line 1:"));
        assert!(fix.contains("def f(:"));
    }

    #[tokio::test]
    async fn test_retry_bound_with_always_invalid_oracle() {
        for max_retries in [0, 1, 2, 5] {
            let oracle = Arc::new(ScriptedOracle::always("def broken(:\n    pass"));
            let merger = AiMerger::new(oracle.clone());
            let res = merger.merge(&conflict("m.py"), "", max_retries).await;
            assert!(!res.is_valid);
            assert_eq!(res.text(), "def broken(:\n    pass");
            // one merge prompt plus exactly `max_retries` fix prompts
            assert_eq!(oracle.call_count(), 1 + max_retries as usize);
        }
    }

    #[tokio::test]
    async fn test_default_retry_bound() {
        let oracle = Arc::new(ScriptedOracle::always("if x:\nprint(1)"));
        let res = AiMerger::new(oracle.clone())
            .merge(&conflict("m.py"), "", DEFAULT_MAX_RETRIES)
            .await;
        assert!(!res.is_valid);
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_incoming() {
        let oracle = Arc::new(ScriptedOracle::failing("timeout"));
        let res = AiMerger::new(oracle.clone()).merge(&conflict("m.py"), "", 2).await;
        assert!(!res.is_valid);
        assert_eq!(res.text(), "def f():\n    return 2");
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fix_call_keeps_previous_candidate() {
        let oracle = Arc::new(ScriptedOracle::new(
            [Reply::text("def f(:\n    return 3")],
            Reply::fail("rate limited"),
        ));
        let res = AiMerger::new(oracle.clone()).merge(&conflict("m.py"), "", 2).await;
        assert!(!res.is_valid);
        assert_eq!(res.text(), "def f(:\n    return 3");
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_markers_only_reply_falls_back() {
        let oracle = Arc::new(ScriptedOracle::always("```\n=======\n```"));
        let res = AiMerger::new(oracle).merge(&conflict("notes.txt"), "", 2).await;
        assert!(!res.is_valid);
        assert_eq!(res.text(), "def f():\n    return 2");
    }
}
