//! Plain-text rendering of conflicts and run summaries.

use super::parser::ConflictRegion;
use super::strategy::{FileFailure, ResolutionStrategy};

const WIDTH: usize = 80;

fn heavy_rule() -> String {
    "=".repeat(WIDTH)
}

fn light_rule() -> String {
    "─".repeat(WIDTH)
}

fn or_empty(text: String) -> String {
    if text.trim().is_empty() {
        "(empty)".to_string()
    } else {
        text
    }
}

/// Stateless text formatting used by the engine and the CLI.
pub struct ConflictFormatter;

impl ConflictFormatter {
    /// Render one conflict for review: both sides followed by the analysis.
    pub fn format_conflict_display(
        conflict: &ConflictRegion,
        number: usize,
        total: usize,
        analysis: &str,
    ) -> String {
        let mut out = vec![
            heavy_rule(),
            format!("FILE: {}", conflict.file_path),
            format!("CONFLICT {} of {}", number, total),
            heavy_rule(),
            String::new(),
            format!("CURRENT ({}):", conflict.current_branch),
            light_rule(),
            or_empty(conflict.current_text()),
            String::new(),
        ];
        if conflict.has_base() {
            out.push("BASE:".to_string());
            out.push(light_rule());
            out.push(or_empty(conflict.base_text()));
            out.push(String::new());
        }
        out.extend([
            format!("INCOMING ({}):", conflict.incoming_branch),
            light_rule(),
            or_empty(conflict.incoming_text()),
            String::new(),
            "AI ANALYSIS:".to_string(),
            light_rule(),
            analysis.to_string(),
            String::new(),
        ]);
        out.join("\n")
    }

    pub fn format_listing_header(files: &[String]) -> String {
        [
            String::new(),
            heavy_rule(),
            "MERGE CONFLICTS DETECTED".to_string(),
            heavy_rule(),
            format!("Files with conflicts: {}", files.len()),
            String::new(),
        ]
        .join("\n")
    }

    /// The menu of strategies shown after a listing.
    pub fn format_resolution_options() -> String {
        let mut out = vec![
            String::new(),
            heavy_rule(),
            "RESOLUTION OPTIONS".to_string(),
            heavy_rule(),
            String::new(),
            "Choose a strategy for ALL conflicts:".to_string(),
            String::new(),
        ];
        for (i, strategy) in ResolutionStrategy::RESOLVING.iter().enumerate() {
            out.push(format!("{}. mergewise resolve {}", i + 1, strategy));
            out.push(format!("   -> {}", strategy.describe()));
            if strategy.uses_oracle() {
                out.push("   -> Validates syntax before applying".to_string());
            }
            out.push(String::new());
        }
        out.push(format!(
            "{}. Manual resolution",
            ResolutionStrategy::RESOLVING.len() + 1
        ));
        out.push("   -> Edit files directly, then: git add <file>".to_string());
        out.push(String::new());
        out.push(heavy_rule());
        out.join("\n")
    }

    pub fn format_summary(
        total_files: usize,
        total_conflicts: usize,
        resolved: usize,
        failed: usize,
    ) -> String {
        let mut out = vec![
            String::new(),
            heavy_rule(),
            "RESOLUTION SUMMARY".to_string(),
            heavy_rule(),
            format!("Total Files: {}", total_files),
            format!("Total Conflicts: {}", total_conflicts),
            format!("Resolved: {}", resolved),
            format!("Failed: {}", failed),
            heavy_rule(),
        ];
        if failed == 0 {
            out.extend([
                String::new(),
                "All conflicts resolved successfully!".to_string(),
                String::new(),
                "Next steps:".to_string(),
                "   1. Review changes: git diff --cached".to_string(),
                "   2. Commit: git commit -m 'Resolved merge conflicts'".to_string(),
            ]);
        }
        out.join("\n")
    }

    /// One bullet per failed file with its reason. Empty when nothing failed.
    pub fn format_failures(failures: &[FileFailure]) -> String {
        if failures.is_empty() {
            return String::new();
        }
        let mut out = String::from("\n\nFailed Files:");
        for failure in failures {
            out.push_str(&format!("\n   * {}", failure.file));
            out.push_str(&format!("\n     Reason: {}", failure.reason));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(current: Vec<&str>, base: Vec<&str>) -> ConflictRegion {
        ConflictRegion {
            file_path: "app.py".into(),
            start_line: 3,
            end_line: 7,
            current_branch: "HEAD".into(),
            incoming_branch: "feature/x".into(),
            current_content: current.into_iter().map(String::from).collect(),
            incoming_content: vec!["return 2".into()],
            base_content: base.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_conflict_display() {
        let text = ConflictFormatter::format_conflict_display(
            &region(vec!["return 1"], vec![]),
            2,
            3,
            "They differ.",
        );
        assert!(text.contains("FILE: app.py"));
        assert!(text.contains("CONFLICT 2 of 3"));
        assert!(text.contains("CURRENT (HEAD):"));
        assert!(text.contains("INCOMING (feature/x):"));
        assert!(text.contains("AI ANALYSIS:\n"));
        assert!(text.contains("They differ."));
        assert!(!text.contains("BASE:"));
    }

    #[test]
    fn test_empty_side_and_base() {
        let text = ConflictFormatter::format_conflict_display(
            &region(vec![], vec!["return 0"]),
            1,
            1,
            "",
        );
        assert!(text.contains(&format!("CURRENT (HEAD):\n{}\n(empty)", light_rule())));
        assert!(text.contains("BASE:"));
        assert!(text.contains("return 0"));
    }

    #[test]
    fn test_summary_next_steps_only_without_failures() {
        let ok = ConflictFormatter::format_summary(2, 3, 3, 0);
        assert!(ok.contains("Total Files: 2"));
        assert!(ok.contains("Resolved: 3"));
        assert!(ok.contains("git diff --cached"));

        let partial = ConflictFormatter::format_summary(2, 3, 1, 1);
        assert!(partial.contains("Failed: 1"));
        assert!(!partial.contains("Next steps"));
    }

    #[test]
    fn test_failures() {
        assert_eq!(ConflictFormatter::format_failures(&[]), "");
        let text = ConflictFormatter::format_failures(&[FileFailure::new(
            "b.py",
            "Final validation failed: Line 2: unexpected EOF",
        )]);
        assert!(text.contains("* b.py"));
        assert!(text.contains("Reason: Final validation failed"));
    }

    #[test]
    fn test_options_list_every_resolving_strategy() {
        let text = ConflictFormatter::format_resolution_options();
        assert!(text.contains("mergewise resolve current"));
        assert!(text.contains("mergewise resolve incoming"));
        assert!(text.contains("mergewise resolve both"));
        assert!(text.contains("Manual resolution"));
        assert!(!text.contains("interactive"));
    }

    #[test]
    fn test_listing_header_counts_files() {
        let header =
            ConflictFormatter::format_listing_header(&["a.py".to_string(), "b.py".to_string()]);
        assert!(header.contains("Files with conflicts: 2"));
    }
}
