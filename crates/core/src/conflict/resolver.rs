//! Strategy dispatch and file reconstruction.
//!
//! The [`ConflictResolver`] turns one conflict plus a strategy into a
//! [`Resolution`], and splices a file's resolutions back over its original
//! lines in a single forward pass.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::merger::{AiMerger, DEFAULT_MAX_RETRIES};
use super::parser::ConflictRegion;
use super::strategy::{Resolution, ResolutionStrategy};
use super::validator::SyntaxValidator;
use crate::errors::ConflictError;
use crate::oracle::Oracle;

/// Resolves conflicts and rewrites their files.
pub struct ConflictResolver {
    merger: AiMerger,
    max_retries: u32,
}

impl ConflictResolver {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            merger: AiMerger::new(oracle),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the number of fix attempts the AI merge may make.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Resolve one conflict with `strategy`.
    ///
    /// Keeping one side always reports valid. `Both` delegates to the AI
    /// merge. `Interactive` is rejected.
    pub async fn resolve(
        &self,
        conflict: &ConflictRegion,
        strategy: ResolutionStrategy,
        analysis: &str,
    ) -> Result<Resolution, ConflictError> {
        debug!(
            path = %conflict.file_path,
            start_line = conflict.start_line,
            %strategy,
            "resolving conflict"
        );
        match strategy {
            ResolutionStrategy::Current => {
                Ok(Resolution::from_lines(conflict.current_content.clone(), true))
            }
            ResolutionStrategy::Incoming => {
                Ok(Resolution::from_lines(conflict.incoming_content.clone(), true))
            }
            ResolutionStrategy::Both => Ok(self
                .merger
                .merge(conflict, analysis, self.max_retries)
                .await),
            ResolutionStrategy::Interactive => Err(ConflictError::InteractiveStrategy),
        }
    }

    /// Rewrite `path` with each conflict replaced by its resolution.
    ///
    /// `file_path` is the identifier used for validation and errors. The
    /// assembled content is validated as a whole and written only if it
    /// passes; otherwise the file on disk is left untouched. A resolution
    /// whose own `is_valid` is false does not block the write by itself.
    pub fn apply_resolution(
        path: &Path,
        file_path: &str,
        conflicts: &[ConflictRegion],
        resolutions: &[Resolution],
    ) -> Result<(), ConflictError> {
        if conflicts.len() != resolutions.len() {
            return Err(ConflictError::ResolutionCountMismatch {
                path: file_path.to_string(),
                expected: conflicts.len(),
                actual: resolutions.len(),
            });
        }
        if conflicts.is_empty() {
            debug!(path = file_path, "no conflicts to apply");
            return Ok(());
        }

        let bytes = std::fs::read(path).map_err(|source| ConflictError::FileAccess {
            path: file_path.to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let eol = LineEnding::detect(&content);
        let lines: Vec<&str> = content.split('\n').collect();

        let resolved = reconstruct(&lines, conflicts, resolutions, eol);

        let validation = SyntaxValidator::validate(file_path, &resolved);
        if !validation.is_valid {
            warn!(path = file_path, error = validation.error_text(), "final validation failed");
            return Err(ConflictError::FinalValidation(
                validation.error_text().to_string(),
            ));
        }

        std::fs::write(path, resolved).map_err(|source| ConflictError::FileAccess {
            path: file_path.to_string(),
            source,
        })?;
        info!(path = file_path, count = conflicts.len(), "wrote resolved file");
        Ok(())
    }
}

/// Line terminator used when a file is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    /// The terminator of the first line in `content`; `Lf` if there is none.
    pub fn detect(content: &str) -> Self {
        match content.find('\n') {
            Some(i) if content[..i].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Splice resolutions over `lines` in one forward pass.
///
/// Pairs are ordered by `start_line` first so the result does not depend on
/// the order they were supplied in. Offsets always refer to `lines`, the
/// original unmodified file. Every output line, copied or resolved, is
/// terminated with `eol`.
pub fn reconstruct(
    lines: &[&str],
    conflicts: &[ConflictRegion],
    resolutions: &[Resolution],
    eol: LineEnding,
) -> String {
    let mut pairs: Vec<(&ConflictRegion, &Resolution)> =
        conflicts.iter().zip(resolutions.iter()).collect();
    pairs.sort_by_key(|(conflict, _)| conflict.start_line);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut cursor = 0;

    for (conflict, resolution) in pairs {
        let start = conflict.start_line.min(lines.len());
        if start > cursor {
            out.extend_from_slice(&lines[cursor..start]);
        }
        out.extend(resolution.lines.iter().map(String::as_str));
        cursor = cursor.max(conflict.end_line + 1);
    }

    if cursor < lines.len() {
        out.extend_from_slice(&lines[cursor..]);
    }

    out.iter()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join(eol.as_str())
}
