//! Resolution strategies and their outcomes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConflictError;

/// How every conflict in a run is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    /// Keep the current (ours) side.
    Current,
    /// Keep the incoming (theirs) side.
    Incoming,
    /// Merge both sides with the oracle, validated and retried.
    Both,
    /// Placeholder name; always rejected at dispatch.
    Interactive,
}

impl ResolutionStrategy {
    /// The strategies that actually resolve conflicts.
    pub const RESOLVING: [ResolutionStrategy; 3] = [Self::Current, Self::Incoming, Self::Both];

    pub fn uses_oracle(self) -> bool {
        matches!(self, Self::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Incoming => "incoming",
            Self::Both => "both",
            Self::Interactive => "interactive",
        }
    }

    /// One-line description for menus and help text.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Current => "Keep all CURRENT branch changes",
            Self::Incoming => "Accept all INCOMING branch changes",
            Self::Both => "Intelligently merge both versions using AI",
            Self::Interactive => "Review conflicts, then pick a strategy",
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = ConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" | "ours" | "keep-current" => Ok(Self::Current),
            "incoming" | "theirs" | "keep-incoming" => Ok(Self::Incoming),
            "both" | "ai" | "merge" | "ai-merge-both" => Ok(Self::Both),
            "interactive" => Ok(Self::Interactive),
            _ => Err(ConflictError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Resolved lines for one conflict plus its advisory validity.
///
/// An empty `lines` removes the block; a single empty line keeps one blank
/// line in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub lines: Vec<String>,
    pub is_valid: bool,
}

impl Resolution {
    /// Split `text` on newlines. Empty text resolves to no lines at all.
    pub fn new(text: impl Into<String>, is_valid: bool) -> Self {
        let text = text.into();
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(String::from).collect()
        };
        Self::from_lines(lines, is_valid)
    }

    pub fn from_lines(lines: Vec<String>, is_valid: bool) -> Self {
        Self { lines, is_valid }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A file the run could not resolve, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

impl FileFailure {
    pub fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
