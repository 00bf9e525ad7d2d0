//! Repository-wide conflict listing and resolution.
//!
//! The [`ResolutionEngine`] drives one run over every conflicted file:
//!
//! 1. Ask git for the unmerged paths.
//! 2. Parse each file's conflict regions.
//! 3. Analyze (listing, or the `both` strategy) and resolve each region.
//! 4. Splice, validate, and write the file, then stage it.
//!
//! Files are processed one at a time. A failure in one file is recorded in
//! the report and the run moves on to the next.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::conflict::merger::DEFAULT_MAX_RETRIES;
use crate::conflict::{
    ConflictAnalyzer, ConflictFormatter, ConflictParser, ConflictResolver, FileFailure,
    ResolutionStrategy,
};
use crate::errors::{ConflictError, CoreError};
use crate::git::{GitCli, GitOperations};
use crate::oracle::{HuggingFaceOracle, Oracle};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of a listing or resolution run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Partial,
    Error,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Analysis of one conflict, numbered from 1 within its file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictAnalysis {
    pub file: String,
    pub number: usize,
    pub analysis: String,
}

/// Result of [`ResolutionEngine::get_conflicts`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictListing {
    pub status: OperationStatus,
    pub message: String,
    pub total_conflicts: usize,
    pub conflicted_files: Vec<String>,
    pub current_branch: Option<String>,
    pub incoming_branch: Option<String>,
    pub conflicts: Vec<ConflictAnalysis>,
}

impl ConflictListing {
    fn empty(status: OperationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            total_conflicts: 0,
            conflicted_files: Vec::new(),
            current_branch: None,
            incoming_branch: None,
            conflicts: Vec::new(),
        }
    }
}

/// Result of [`ResolutionEngine::resolve_conflicts`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub status: OperationStatus,
    pub message: String,
    pub strategy: Option<ResolutionStrategy>,
    pub total_files: usize,
    pub total_conflicts: usize,
    pub resolved: usize,
    pub failures: Vec<FileFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ResolutionReport {
    fn new(strategy: Option<ResolutionStrategy>, started_at: DateTime<Utc>) -> Self {
        Self {
            status: OperationStatus::Success,
            message: String::new(),
            strategy,
            total_files: 0,
            total_conflicts: 0,
            resolved: 0,
            failures: Vec::new(),
            started_at,
            completed_at: started_at,
        }
    }

    fn finish(mut self, status: OperationStatus, message: impl Into<String>) -> Self {
        self.status = status;
        self.message = message.into();
        self.completed_at = Utc::now();
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Lists and resolves the conflicts of one repository.
pub struct ResolutionEngine {
    git: Arc<dyn GitOperations>,
    oracle: Arc<dyn Oracle>,
    max_retries: u32,
}

impl ResolutionEngine {
    pub fn new(git: Arc<dyn GitOperations>, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            git,
            oracle,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build an engine over the configured repository and HTTP oracle.
    pub async fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let git = GitCli::open(&config.repository.path).await?;
        let oracle = HuggingFaceOracle::new(&config.oracle)?;
        Ok(Self::new(Arc::new(git), Arc::new(oracle)).with_max_retries(config.merge.max_retries))
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// List every conflict with an oracle analysis. Never modifies the repository.
    pub async fn get_conflicts(&self) -> ConflictListing {
        match self.git.has_conflicts().await {
            Ok(false) => {
                return ConflictListing::empty(
                    OperationStatus::Success,
                    "No merge conflicts detected",
                )
            }
            Ok(true) => {}
            Err(e) => {
                warn!(error = %e, "failed to read repository status");
                return ConflictListing::empty(
                    OperationStatus::Error,
                    format!("Failed to analyze conflicts: {}", e),
                );
            }
        }

        let files = match self.git.conflicted_files().await {
            Ok(files) if files.is_empty() => {
                return ConflictListing::empty(OperationStatus::Success, "No merge conflicts found")
            }
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "failed to list conflicted files");
                return ConflictListing::empty(
                    OperationStatus::Error,
                    format!("Failed to analyze conflicts: {}", e),
                );
            }
        };

        let (current_branch, incoming_branch) = match self.git.branch_names().await {
            Ok((current, incoming)) => (Some(current), Some(incoming)),
            Err(e) => {
                debug!(error = %e, "branch names unavailable");
                (None, None)
            }
        };

        let analyzer = ConflictAnalyzer::new(self.oracle.clone());
        let mut listing = ConflictListing::empty(OperationStatus::Success, String::new());
        listing.current_branch = current_branch;
        listing.incoming_branch = incoming_branch;
        let mut report = vec![ConflictFormatter::format_listing_header(&files)];

        for file in &files {
            let path = self.git.work_dir().join(file);
            let conflicts = match ConflictParser::parse_file(&path, file) {
                Ok(conflicts) => conflicts,
                Err(e) => {
                    warn!(file = %file, error = %e, "failed to parse conflicted file");
                    report.push(format!("Error analyzing {}: {}", file, e));
                    continue;
                }
            };
            info!(file = %file, count = conflicts.len(), "analyzing conflicts");

            for (idx, conflict) in conflicts.iter().enumerate() {
                let number = idx + 1;
                let analysis = analyzer.analyze(conflict).await;
                report.push(ConflictFormatter::format_conflict_display(
                    conflict,
                    number,
                    conflicts.len(),
                    &analysis,
                ));
                listing.conflicts.push(ConflictAnalysis {
                    file: file.clone(),
                    number,
                    analysis,
                });
                listing.total_conflicts += 1;
            }
        }

        report.push(ConflictFormatter::format_resolution_options());
        listing.message = report.join("\n");
        listing.conflicted_files = files;
        listing
    }

    /// Resolve every conflict in the repository with the named strategy.
    ///
    /// Unknown names and `interactive` are rejected before any file is read.
    pub async fn resolve_conflicts(&self, strategy: &str) -> ResolutionReport {
        let started_at = Utc::now();

        let strategy = match strategy.parse::<ResolutionStrategy>() {
            Ok(ResolutionStrategy::Interactive) => {
                return ResolutionReport::new(Some(ResolutionStrategy::Interactive), started_at)
                    .finish(
                        OperationStatus::Error,
                        ConflictError::InteractiveStrategy.to_string(),
                    )
            }
            Ok(s) => s,
            Err(e) => {
                return ResolutionReport::new(None, started_at)
                    .finish(OperationStatus::Error, e.to_string())
            }
        };
        let mut report = ResolutionReport::new(Some(strategy), started_at);

        let files = match self.git.conflicted_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "failed to list conflicted files");
                return report.finish(
                    OperationStatus::Error,
                    format!("Resolution failed: {}", e),
                );
            }
        };
        if files.is_empty() {
            return report.finish(OperationStatus::Success, "No conflicts to resolve");
        }

        info!(%strategy, files = files.len(), "resolving conflicts");
        let resolver =
            ConflictResolver::new(self.oracle.clone()).with_max_retries(self.max_retries);
        let analyzer = ConflictAnalyzer::new(self.oracle.clone());
        report.total_files = files.len();

        for file in &files {
            match self.resolve_file(file, strategy, &resolver, &analyzer, &mut report).await {
                Ok(count) => {
                    report.resolved += count;
                    info!(file = %file, count, "resolved file");
                }
                Err(reason) => {
                    warn!(file = %file, %reason, "failed to resolve file");
                    report.failures.push(FileFailure::new(file.clone(), reason));
                }
            }
        }

        let status = if report.failures.is_empty() {
            OperationStatus::Success
        } else {
            OperationStatus::Partial
        };
        let message = format!(
            "{}{}",
            ConflictFormatter::format_summary(
                report.total_files,
                report.total_conflicts,
                report.resolved,
                report.failures.len(),
            ),
            ConflictFormatter::format_failures(&report.failures),
        );
        report.finish(status, message)
    }

    /// Resolve, write, and stage one file. Returns the number of conflicts resolved.
    async fn resolve_file(
        &self,
        file: &str,
        strategy: ResolutionStrategy,
        resolver: &ConflictResolver,
        analyzer: &ConflictAnalyzer,
        report: &mut ResolutionReport,
    ) -> Result<usize, String> {
        let path = self.git.work_dir().join(file);
        let conflicts = ConflictParser::parse_file(&path, file).map_err(|e| e.to_string())?;
        report.total_conflicts += conflicts.len();

        let mut analyses = Vec::with_capacity(conflicts.len());
        for conflict in &conflicts {
            if strategy.uses_oracle() {
                analyses.push(analyzer.analyze(conflict).await);
            } else {
                analyses.push(String::new());
            }
        }

        let mut resolutions = Vec::with_capacity(conflicts.len());
        for (idx, (conflict, analysis)) in conflicts.iter().zip(&analyses).enumerate() {
            let resolution = resolver
                .resolve(conflict, strategy, analysis)
                .await
                .map_err(|e| e.to_string())?;
            if !resolution.is_valid {
                warn!(file, conflict = idx + 1, "merged conflict may have syntax issues");
            }
            resolutions.push(resolution);
        }

        ConflictResolver::apply_resolution(&path, file, &conflicts, &resolutions)
            .map_err(|e| e.to_string())?;

        self.git
            .stage_file(file)
            .await
            .map_err(|e| format!("Failed to stage: {}", e))?;

        Ok(conflicts.len())
    }
}
