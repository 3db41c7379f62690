use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use crate::domain::entities::repository::RepositoryState;

/// A single state query against one repository failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot inspect '{}': {cause}", path.display())]
pub struct InspectionError {
    pub path: PathBuf,
    pub cause: String,
}

impl InspectionError {
    pub fn new(path: &Path, cause: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    }
}

/// Read-only questions about a working tree's live state.
///
/// Every query is independent: one failing does not poison the others, and
/// nothing is cached between calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryInspector: Send + Sync {
    /// Tracked files differ from HEAD (staged or not). Untracked files do not count.
    async fn is_dirty(&self, path: &Path) -> Result<bool, InspectionError>;

    async fn untracked_count(&self, path: &Path) -> Result<usize, InspectionError>;

    async fn has_untracked(&self, path: &Path) -> Result<bool, InspectionError> {
        Ok(self.untracked_count(path).await? > 0)
    }

    async fn stash_count(&self, path: &Path) -> Result<usize, InspectionError>;

    async fn remote_count(&self, path: &Path) -> Result<usize, InspectionError>;

    /// Local branch names.
    async fn branch_names(&self, path: &Path) -> Result<BTreeSet<String>, InspectionError>;

    /// Checked-out branch, `None` for a detached HEAD.
    async fn current_branch(&self, path: &Path) -> Result<Option<String>, InspectionError>;

    /// Gather every query into one snapshot.
    async fn state(&self, path: &Path) -> Result<RepositoryState, InspectionError> {
        let (is_dirty, untracked_count, stash_count, remote_count, branch_names, current_branch) = tokio::try_join!(
            self.is_dirty(path),
            self.untracked_count(path),
            self.stash_count(path),
            self.remote_count(path),
            self.branch_names(path),
            self.current_branch(path),
        )?;

        Ok(RepositoryState {
            is_dirty,
            has_untracked: untracked_count > 0,
            untracked_count,
            stash_count,
            remote_count,
            branch_names,
            current_branch,
        })
    }
}

/// [`RepositoryInspector`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitInspector {
    git_executable: String,
}

impl Default for GitInspector {
    fn default() -> Self {
        Self {
            git_executable: "git".to_string(),
        }
    }
}

impl GitInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git binary instead of the one on `PATH`.
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            git_executable: executable.into(),
        }
    }

    async fn execute_git_command(
        &self,
        args: &[&str],
        path: &Path,
    ) -> Result<std::process::Output, InspectionError> {
        tracing::trace!("git {} in {}", args.join(" "), path.display());

        Command::new(&self.git_executable)
            .args(args)
            .current_dir(path)
            // Status queries must not take the index lock away from real commands.
            .env("GIT_OPTIONAL_LOCKS", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                InspectionError::new(path, format!("failed to run {}: {}", self.git_executable, e))
            })
    }

    /// Run git and return stdout, failing on a nonzero exit.
    async fn execute_git_command_checked(
        &self,
        args: &[&str],
        path: &Path,
    ) -> Result<String, InspectionError> {
        let output = self.execute_git_command(args, path).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InspectionError::new(
                path,
                format!(
                    "git {} exited with {}: {}",
                    args.join(" "),
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            InspectionError::new(path, format!("git {} produced non-UTF-8 output", args.join(" ")))
        })
    }

    async fn porcelain_status(
        &self,
        path: &Path,
        untracked: &str,
    ) -> Result<Vec<String>, InspectionError> {
        let flag = format!("--untracked-files={untracked}");
        let stdout = self
            .execute_git_command_checked(&["status", "--porcelain", &flag], path)
            .await?;
        parse_porcelain(&stdout).map_err(|line| {
            InspectionError::new(path, format!("unexpected status line '{line}'"))
        })
    }
}

/// Split `git status --porcelain` output into entries, rejecting lines that
/// cannot be `XY <path>`.
fn parse_porcelain(stdout: &str) -> Result<Vec<String>, String> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.len() >= 4 && line.as_bytes()[2] == b' ' {
                Ok(line.to_string())
            } else {
                Err(line.to_string())
            }
        })
        .collect()
}

fn non_empty_lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|line| !line.is_empty())
}

#[async_trait]
impl RepositoryInspector for GitInspector {
    async fn is_dirty(&self, path: &Path) -> Result<bool, InspectionError> {
        Ok(!self.porcelain_status(path, "no").await?.is_empty())
    }

    async fn untracked_count(&self, path: &Path) -> Result<usize, InspectionError> {
        let entries = self.porcelain_status(path, "normal").await?;
        Ok(entries.iter().filter(|line| line.starts_with("??")).count())
    }

    async fn stash_count(&self, path: &Path) -> Result<usize, InspectionError> {
        let stdout = self.execute_git_command_checked(&["stash", "list"], path).await?;
        Ok(non_empty_lines(&stdout).count())
    }

    async fn remote_count(&self, path: &Path) -> Result<usize, InspectionError> {
        let stdout = self.execute_git_command_checked(&["remote"], path).await?;
        Ok(non_empty_lines(&stdout).count())
    }

    async fn branch_names(&self, path: &Path) -> Result<BTreeSet<String>, InspectionError> {
        let stdout = self
            .execute_git_command_checked(
                &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
                path,
            )
            .await?;
        Ok(non_empty_lines(&stdout).map(str::to_string).collect())
    }

    async fn current_branch(&self, path: &Path) -> Result<Option<String>, InspectionError> {
        let args = ["symbolic-ref", "--quiet", "--short", "HEAD"];
        let output = self.execute_git_command(&args, path).await?;

        match output.status.code() {
            Some(0) => {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(Some(name).filter(|n| !n.is_empty()))
            }
            // `--quiet` exits 1 without output when HEAD is detached
            Some(1) if output.stderr.is_empty() => Ok(None),
            code => Err(InspectionError::new(
                path,
                format!(
                    "git {} exited with {}: {}",
                    args.join(" "),
                    code.unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )),
        }
    }
}
