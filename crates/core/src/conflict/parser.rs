//! Conflict marker parsing.
//!
//! Scans working-tree text for standard git conflict blocks, with or without
//! the diff3 base section:
//!
//! ```text
//! <<<<<<< HEAD
//! current side
//! ||||||| base
//! common ancestor
//! =======
//! incoming side
//! >>>>>>> feature
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConflictError;

pub const BEGIN_MARKER: &str = "<<<<<<<";
pub const BASE_MARKER: &str = "|||||||";
pub const SEPARATOR_MARKER: &str = "=======";
pub const END_MARKER: &str = ">>>>>>>";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One delimited conflict block inside one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRegion {
    /// Path of the owning file, relative to the work tree root.
    pub file_path: String,
    /// Index of the begin marker line in the original line sequence.
    pub start_line: usize,
    /// Index of the end marker line in the original line sequence.
    pub end_line: usize,
    /// Label after the begin marker.
    pub current_branch: String,
    /// Label after the end marker.
    pub incoming_branch: String,
    pub current_content: Vec<String>,
    pub incoming_content: Vec<String>,
    /// Empty unless the block uses the diff3 style.
    pub base_content: Vec<String>,
}

impl ConflictRegion {
    pub fn current_text(&self) -> String {
        self.current_content.join("\n")
    }

    pub fn incoming_text(&self) -> String {
        self.incoming_content.join("\n")
    }

    pub fn base_text(&self) -> String {
        self.base_content.join("\n")
    }

    /// Whether the block carried a diff3 base section.
    pub fn has_base(&self) -> bool {
        !self.base_content.is_empty()
    }

    /// File extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        file_extension(&self.file_path)
    }
}

/// Extension of `path` with its leading dot (`".py"`), lowercased.
pub fn file_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Current,
    Base,
    Incoming,
}

/// Stateless conflict marker parser.
pub struct ConflictParser;

impl ConflictParser {
    /// Read `path` from disk and parse every conflict block in it.
    ///
    /// `file_path` is the identifier recorded on each region; `path` is where
    /// the bytes are read from.
    pub fn parse_file(path: &Path, file_path: &str) -> Result<Vec<ConflictRegion>, ConflictError> {
        let bytes = std::fs::read(path).map_err(|source| ConflictError::FileAccess {
            path: file_path.to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        Self::parse_content(&content, file_path)
    }

    /// Parse every conflict block in `content`, in file order.
    pub fn parse_content(
        content: &str,
        file_path: &str,
    ) -> Result<Vec<ConflictRegion>, ConflictError> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut conflicts = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if lines[i].starts_with(BEGIN_MARKER) {
                let region = parse_block(&lines, i, file_path)?;
                i = region.end_line;
                conflicts.push(region);
            }
            i += 1;
        }

        debug!(path = file_path, count = conflicts.len(), "parsed conflicts");
        Ok(conflicts)
    }
}

fn parse_block(lines: &[&str], start: usize, file_path: &str) -> Result<ConflictRegion, ConflictError> {
    let mut section = Section::Current;
    let mut current_content = Vec::new();
    let mut base_content = Vec::new();
    let mut incoming_content = Vec::new();

    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        let line = strip_cr(line);
        match section {
            Section::Current | Section::Base if line.starts_with(SEPARATOR_MARKER) => {
                section = Section::Incoming;
            }
            Section::Current if line.starts_with(BASE_MARKER) => {
                section = Section::Base;
            }
            Section::Current => current_content.push(line.to_string()),
            Section::Base => base_content.push(line.to_string()),
            Section::Incoming if line.starts_with(END_MARKER) => {
                return Ok(ConflictRegion {
                    file_path: file_path.to_string(),
                    start_line: start,
                    end_line: idx,
                    current_branch: marker_label(lines[start], BEGIN_MARKER),
                    incoming_branch: marker_label(line, END_MARKER),
                    current_content,
                    incoming_content,
                    base_content,
                });
            }
            Section::Incoming => incoming_content.push(line.to_string()),
        }
    }

    let detail = match section {
        Section::Current | Section::Base => "no separator or end marker before end of file",
        Section::Incoming => "no end marker before end of file",
    };
    Err(ConflictError::Malformed {
        path: file_path.to_string(),
        line: start + 1,
        detail: detail.to_string(),
    })
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn marker_label(line: &str, marker: &str) -> String {
    strip_cr(line)
        .strip_prefix(marker)
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_WAY: &str = "\
def total(items):
<<<<<<< HEAD
    return sum(items)
=======
    return sum(i.price for i in items)
>>>>>>> feature/pricing
";

    #[test]
    fn test_no_conflicts() {
        let conflicts = ConflictParser::parse_content("a\nb\nc\n", "f.txt").unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_two_way_conflict() {
        let conflicts = ConflictParser::parse_content(TWO_WAY, "cart.py").unwrap();
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.start_line, 1);
        assert_eq!(c.end_line, 5);
        assert_eq!(c.current_branch, "HEAD");
        assert_eq!(c.incoming_branch, "feature/pricing");
        assert_eq!(c.current_text(), "    return sum(items)");
        assert_eq!(c.incoming_text(), "    return sum(i.price for i in items)");
        assert!(!c.has_base());
        assert_eq!(c.extension(), ".py");
    }

    #[test]
    fn test_diff3_conflict_keeps_base_separate() {
        let content = "\
<<<<<<< ours
x = 1
||||||| merged common ancestors
x = 0
=======
x = 2
>>>>>>> theirs
";
        let conflicts = ConflictParser::parse_content(content, "v.py").unwrap();
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.base_content, vec!["x = 0"]);
        assert_eq!(c.current_content, vec!["x = 1"]);
        assert_eq!(c.incoming_content, vec!["x = 2"]);
        assert!(c.current_content.iter().all(|l| !l.starts_with(BASE_MARKER)));
        assert!(c.incoming_content.iter().all(|l| !l.contains("x = 0")));
    }

    #[test]
    fn test_multiple_conflicts_in_order() {
        let content = "\
top
<<<<<<< HEAD
a1
=======
b1
>>>>>>> other
middle
<<<<<<< HEAD
a2
a2b
=======
>>>>>>> other
bottom";
        let conflicts = ConflictParser::parse_content(content, "f.txt").unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!((conflicts[0].start_line, conflicts[0].end_line), (1, 5));
        assert_eq!((conflicts[1].start_line, conflicts[1].end_line), (7, 11));
        assert_eq!(conflicts[1].current_content, vec!["a2", "a2b"]);
        assert!(conflicts[1].incoming_content.is_empty());
    }

    #[test]
    fn test_missing_labels_are_empty() {
        let content = "<<<<<<<\nx\n=======\ny\n>>>>>>>\n";
        let conflicts = ConflictParser::parse_content(content, "f.txt").unwrap();
        assert_eq!(conflicts[0].current_branch, "");
        assert_eq!(conflicts[0].incoming_branch, "");
    }

    #[test]
    fn test_crlf_lines() {
        let content = "<<<<<<< HEAD\r\nx\r\n=======\r\ny\r\n>>>>>>> b\r\n";
        let conflicts = ConflictParser::parse_content(content, "f.txt").unwrap();
        assert_eq!(conflicts[0].current_content, vec!["x"]);
        assert_eq!(conflicts[0].incoming_branch, "b");
    }

    #[test]
    fn test_unterminated_conflict_is_malformed() {
        let content = "ok\n<<<<<<< HEAD\nx\n=======\ny\n";
        let err = ConflictParser::parse_content(content, "f.txt").unwrap_err();
        assert!(matches!(
            err,
            ConflictError::Malformed { line: 2, ref path, .. } if path == "f.txt"
        ));

        let content = "<<<<<<< HEAD\nx\n";
        let err = ConflictParser::parse_content(content, "f.txt").unwrap_err();
        assert!(err.to_string().contains("no separator"));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConflictParser::parse_file(&dir.path().join("gone.py"), "gone.py").unwrap_err();
        assert!(matches!(err, ConflictError::FileAccess { .. }));
    }

    #[test]
    fn test_parse_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.py");
        std::fs::write(&path, TWO_WAY).unwrap();
        let conflicts = ConflictParser::parse_file(&path, "cart.py").unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].file_path, "cart.py");
    }
}
