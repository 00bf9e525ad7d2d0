//! Repository queries and mutations via the `git` CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;

/// Porcelain status codes that mark an unmerged path.
const UNMERGED_CODES: [&str; 7] = ["UU", "AA", "DD", "AU", "UA", "DU", "UD"];

/// Label used when no merge head can be read.
pub const DEFAULT_INCOMING_LABEL: &str = "MERGE_HEAD";

/// The repository operations the conflict workflow depends on.
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Work tree root that conflicted paths are relative to.
    fn work_dir(&self) -> &Path;

    /// Paths with unmerged status, relative to the work tree root.
    async fn conflicted_files(&self) -> Result<Vec<String>, GitError>;

    /// Whether `git status` reports any unmerged entries.
    async fn has_conflicts(&self) -> Result<bool, GitError>;

    /// Whether the work dir is inside a git work tree.
    async fn is_inside_work_tree(&self) -> Result<bool, GitError>;

    /// Mark a path as resolved in the index.
    async fn stage_file(&self, path: &str) -> Result<(), GitError>;

    /// Abbreviated name of the checked-out branch.
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Short SHA of `MERGE_HEAD`, if a merge is in progress.
    async fn merge_head(&self) -> Result<Option<String>, GitError>;

    /// `(current, incoming)` labels for display.
    async fn branch_names(&self) -> Result<(String, String), GitError> {
        let current = self.current_branch().await?;
        let incoming = self
            .merge_head()
            .await?
            .unwrap_or_else(|| DEFAULT_INCOMING_LABEL.to_string());
        Ok((current, incoming))
    }
}

/// [`GitOperations`] backed by `git` subprocesses.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    /// Create a client rooted at `work_dir`. No git command is run yet.
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        let work_dir = work_dir.as_ref().to_path_buf();
        info!(path = %work_dir.display(), "created GitCli");
        Self { work_dir }
    }

    /// Create a client rooted at the top level of the work tree containing
    /// `work_dir`, failing unless `work_dir` is inside one.
    ///
    /// Paths reported by git are relative to the top level, so a
    /// subdirectory is never used as the root.
    pub async fn open<P: AsRef<Path>>(work_dir: P) -> Result<Self, GitError> {
        let client = Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        };
        if !client.is_inside_work_tree().await? {
            return Err(GitError::NotARepository(
                client.work_dir.display().to_string(),
            ));
        }
        let toplevel = client.run_git(&["rev-parse", "--show-toplevel"]).await?;
        Ok(Self::new(toplevel.trim()))
    }

    async fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.work_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("git {}", args.join(" ")), "running git command");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound("git".into())
            } else {
                GitError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                exit_code,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl GitOperations for GitCli {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[instrument(skip(self), fields(path = %self.work_dir.display()))]
    async fn conflicted_files(&self) -> Result<Vec<String>, GitError> {
        let output = self
            .run_git(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        let files = parse_name_list(&output);
        debug!(count = files.len(), "listed conflicted files");
        Ok(files)
    }

    async fn has_conflicts(&self) -> Result<bool, GitError> {
        let output = self.run_git(&["status", "--porcelain"]).await?;
        Ok(porcelain_has_unmerged(&output))
    }

    async fn is_inside_work_tree(&self) -> Result<bool, GitError> {
        match self.run_git(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(GitError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn stage_file(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["add", "--", path]).await?;
        info!(path, "staged resolved file");
        Ok(())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let output = self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(output.trim().to_string())
    }

    async fn merge_head(&self) -> Result<Option<String>, GitError> {
        match self
            .run_git(&["rev-parse", "--verify", "--quiet", "--short=8", "MERGE_HEAD"])
            .await
        {
            Ok(out) => {
                let sha = out.trim();
                Ok((!sha.is_empty()).then(|| sha.to_string()))
            }
            Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn porcelain_has_unmerged(output: &str) -> bool {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .any(|line| UNMERGED_CODES.iter().any(|code| line.starts_with(code)))
}
