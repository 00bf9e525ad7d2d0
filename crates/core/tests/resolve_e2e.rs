//! End-to-end tests for conflict resolution against real git repositories.
//!
//! Each test builds a throwaway repository in a temp dir, produces a real
//! merge conflict, and drives the `ResolutionEngine` through `GitCli`. The
//! oracle is scripted, so there is no network I/O.
//!
//! Tests skip gracefully if `git` is not installed.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::TempDir;

use mergewise_core::conflict::ConflictParser;
use mergewise_core::errors::GitError;
use mergewise_core::git::{GitCli, GitOperations};
use mergewise_core::oracle::{Reply, ScriptedOracle};
use mergewise_core::{OperationStatus, ResolutionEngine};

// ===========================================================================
// Helpers
// ===========================================================================

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure.
fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
}

/// A repository on `main` mid-merge of `feature`, with `calc.py` conflicted.
fn conflicted_repo(conflict_style: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();

    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "merge.conflictStyle", conflict_style]);

    commit_file(dir, "calc.py", "def f():\n    return 0\n", "base");
    git(dir, &["checkout", "-q", "-b", "feature"]);
    commit_file(dir, "calc.py", "def f():\n    return 2\n", "feature change");
    git(dir, &["checkout", "-q", "main"]);
    commit_file(dir, "calc.py", "def f():\n    return 1\n", "main change");

    let status = Command::new("git")
        .current_dir(dir)
        .args(["merge", "feature"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success(), "merge should stop on a conflict");

    tmp
}

/// Like [`conflicted_repo`], but the conflicted file lives in `sub/`.
fn conflicted_subdir_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::create_dir(dir.join("sub")).unwrap();

    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "merge.conflictStyle", "merge"]);

    commit_file(dir, "sub/c.txt", "first\nbase\nlast\n", "base");
    git(dir, &["checkout", "-q", "-b", "feature"]);
    commit_file(dir, "sub/c.txt", "first\ntheirs\nlast\n", "feature change");
    git(dir, &["checkout", "-q", "main"]);
    commit_file(dir, "sub/c.txt", "first\nours\nlast\n", "main change");

    let status = Command::new("git")
        .current_dir(dir)
        .args(["merge", "feature"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success(), "merge should stop on a conflict");

    tmp
}

fn engine(dir: &Path, oracle: ScriptedOracle) -> ResolutionEngine {
    ResolutionEngine::new(Arc::new(GitCli::new(dir)), Arc::new(oracle))
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_keep_incoming_writes_and_stages() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let repo = conflicted_repo("merge");
    let dir = repo.path();

    let report = engine(dir, ScriptedOracle::failing("unused"))
        .resolve_conflicts("incoming")
        .await;

    assert_eq!(report.status, OperationStatus::Success, "{}", report.message);
    assert_eq!(report.resolved, 1);
    assert_eq!(
        std::fs::read_to_string(dir.join("calc.py")).unwrap(),
        "def f():\n    return 2\n"
    );
    assert_eq!(git(dir, &["diff", "--name-only", "--diff-filter=U"]).trim(), "");
    assert_eq!(git(dir, &["diff", "--cached", "--name-only"]).trim(), "calc.py");
}

#[tokio::test]
async fn test_listing_reads_without_mutating() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let repo = conflicted_repo("merge");
    let dir = repo.path();
    let before = std::fs::read_to_string(dir.join("calc.py")).unwrap();

    let listing = engine(dir, ScriptedOracle::always("Current returns 1, incoming 2."))
        .get_conflicts()
        .await;

    assert_eq!(listing.status, OperationStatus::Success);
    assert_eq!(listing.conflicted_files, vec!["calc.py"]);
    assert_eq!(listing.total_conflicts, 1);
    assert_eq!(listing.current_branch.as_deref(), Some("main"));
    assert_eq!(listing.incoming_branch.as_ref().map(|s| s.len()), Some(8));
    assert_eq!(listing.conflicts[0].analysis, "Current returns 1, incoming 2.");
    assert_eq!(std::fs::read_to_string(dir.join("calc.py")).unwrap(), before);
    assert_eq!(
        git(dir, &["diff", "--name-only", "--diff-filter=U"]).trim(),
        "calc.py"
    );
}

#[tokio::test]
async fn test_ai_merge_both() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let repo = conflicted_repo("merge");
    let dir = repo.path();
    let oracle = ScriptedOracle::new(
        [
            Reply::text("Both sides return a constant."),
            Reply::text("```python\n    return 1 + 2\n```"),
        ],
        Reply::fail("no more replies"),
    );

    let report = engine(dir, oracle).resolve_conflicts("both").await;

    assert_eq!(report.status, OperationStatus::Success, "{}", report.message);
    assert_eq!(
        std::fs::read_to_string(dir.join("calc.py")).unwrap(),
        "def f():\n    return 1 + 2\n"
    );
}

#[tokio::test]
async fn test_diff3_conflict_has_base() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let repo = conflicted_repo("diff3");
    let dir = repo.path();

    let conflicts = ConflictParser::parse_file(&dir.join("calc.py"), "calc.py").unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].current_text(), "    return 1");
    assert_eq!(conflicts[0].incoming_text(), "    return 2");
    assert_eq!(conflicts[0].base_text(), "    return 0");

    let report = engine(dir, ScriptedOracle::failing("unused"))
        .resolve_conflicts("current")
        .await;
    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(
        std::fs::read_to_string(dir.join("calc.py")).unwrap(),
        "def f():\n    return 1\n"
    );
}

#[tokio::test]
async fn test_clean_repository_has_no_conflicts() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "-q"]);

    let client = GitCli::open(dir).await.unwrap();
    assert!(!client.has_conflicts().await.unwrap());
    assert!(client.conflicted_files().await.unwrap().is_empty());

    let report = engine(dir, ScriptedOracle::failing("unused"))
        .resolve_conflicts("both")
        .await;
    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(report.resolved, 0);
}

#[tokio::test]
async fn test_open_outside_repository() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let result = GitCli::open(tmp.path()).await;
    assert!(matches!(result, Err(GitError::NotARepository(_))));
}

#[tokio::test]
async fn test_open_from_subdirectory_uses_toplevel() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let repo = conflicted_subdir_repo();
    let dir = repo.path();

    let client = GitCli::open(dir.join("sub")).await.unwrap();
    assert_eq!(
        client.work_dir().canonicalize().unwrap(),
        dir.canonicalize().unwrap()
    );

    let report = ResolutionEngine::new(Arc::new(client), Arc::new(ScriptedOracle::failing("unused")))
        .resolve_conflicts("current")
        .await;

    assert_eq!(report.status, OperationStatus::Success, "{}", report.message);
    assert_eq!(report.resolved, 1);
    assert_eq!(
        std::fs::read_to_string(dir.join("sub/c.txt")).unwrap(),
        "first\nours\nlast\n"
    );
    assert_eq!(git(dir, &["diff", "--cached", "--name-only"]).trim(), "sub/c.txt");
}
