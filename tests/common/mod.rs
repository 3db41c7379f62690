//! Common test utilities and helpers
//!
//! Scratch git repositories in a temporary directory plus a preconfigured
//! `multigit` command pointed at a private configuration file.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use tempfile::TempDir;

/// テスト用のワークスペース（一時ディレクトリと設定ファイル）
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config").join("config.toml")
    }

    /// `git init` a repository with one commit on `main`.
    pub fn init_repo(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create repository dir");

        git(&path, &["init", "--quiet"]);
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        std::fs::write(path.join("README.md"), format!("# {name}\n")).expect("Failed to write README");
        git(&path, &["add", "README.md"]);
        git(&path, &["commit", "--quiet", "-m", "initial"]);
        path
    }

    /// Modify a tracked file so the working tree is dirty.
    pub fn make_dirty(&self, repo: &Path) {
        std::fs::write(repo.join("README.md"), "changed\n").expect("Failed to modify README");
    }

    pub fn add_remote(&self, repo: &Path, name: &str) {
        git(repo, &["remote", "add", name, "https://example.invalid/repo.git"]);
    }

    /// `multigit` with `--config` and `--no-color` already applied.
    pub fn multigit(&self) -> Command {
        let mut cmd = Command::cargo_bin("multigit").expect("binary not built");
        cmd.arg("--config")
            .arg(self.config_path())
            .arg("--no-color")
            .env_remove("RUST_LOG")
            .env_remove("MULTIGIT_CONFIG")
            .env_remove("GITUI")
            .env_remove("EDITOR");
        cmd
    }

    /// Same as [`multigit`](Self::multigit) as a plain process, for tests
    /// that need to signal it while it runs.
    pub fn multigit_process(&self) -> StdCommand {
        let mut cmd = StdCommand::new(assert_cmd::cargo::cargo_bin("multigit"));
        cmd.arg("--config")
            .arg(self.config_path())
            .arg("--no-color")
            .env_remove("RUST_LOG")
            .env_remove("MULTIGIT_CONFIG")
            .env_remove("GITUI")
            .env_remove("EDITOR");
        cmd
    }

    /// Register every repository, asserting success.
    pub fn register_all(&self, repos: &[&Path]) {
        for repo in repos {
            self.multigit().arg("register").arg(repo).assert().success();
        }
    }

    pub fn read_config(&self) -> String {
        std::fs::read_to_string(self.config_path()).unwrap_or_default()
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args([
            "-c",
            "user.name=multigit tests",
            "-c",
            "user.email=tests@example.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}
