use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A registered repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Unique key in the registry
    pub identity: String,

    /// Absolute, canonical path of the working tree
    pub path: PathBuf,

    /// `push` skips this repository
    #[serde(default, rename = "no-push")]
    pub no_push: bool,
}

impl RepositoryRecord {
    pub fn new(identity: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            identity: identity.into(),
            path: path.into(),
            no_push: false,
        }
    }

    pub fn with_no_push(mut self, no_push: bool) -> Self {
        self.no_push = no_push;
        self
    }

    /// Identity derived from a path: its final component.
    pub fn derive_identity(path: &Path) -> Option<String> {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    /// Case-insensitive substring match on the identity.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.identity
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// Whether the path still holds a git working tree marker.
    ///
    /// `.git` is a directory for ordinary clones and a file for worktrees
    /// and submodules; both count.
    pub fn has_git_marker(path: &Path) -> bool {
        path.join(".git").exists()
    }
}

/// Snapshot of live repository state, gathered once per run and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryState {
    pub is_dirty: bool,
    pub has_untracked: bool,
    pub untracked_count: usize,
    pub stash_count: usize,
    pub remote_count: usize,
    pub branch_names: BTreeSet<String>,
    /// `None` when HEAD is detached
    pub current_branch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_identity() {
        assert_eq!(
            RepositoryRecord::derive_identity(Path::new("/home/me/src/api")),
            Some("api".to_string())
        );
        assert_eq!(RepositoryRecord::derive_identity(Path::new("/")), None);
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let record = RepositoryRecord::new("Backend-API", "/src/backend-api");
        assert!(record.name_contains("api"));
        assert!(record.name_contains("END-a"));
        assert!(!record.name_contains("web"));
    }

    #[test]
    fn test_git_marker_detection() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(!RepositoryRecord::has_git_marker(temp.path()));

        // worktrees carry a `.git` file rather than a directory
        std::fs::write(temp.path().join(".git"), "gitdir: /elsewhere\n").unwrap();
        assert!(RepositoryRecord::has_git_marker(temp.path()));
    }
}
