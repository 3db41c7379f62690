use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::repository::RepositoryRecord;
use crate::domain::value_objects::filter::{FilterClause, FilterExpression};

/// Verbs that fan out over the selected repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandVerb {
    Status,
    Pull,
    Push,
    Add,
    Commit,
    Gc,
    Exec,
    Edit,
    Reveal,
    Ui,
}

impl CommandVerb {
    pub const ALL: [CommandVerb; 10] = [
        Self::Status,
        Self::Pull,
        Self::Push,
        Self::Add,
        Self::Commit,
        Self::Gc,
        Self::Exec,
        Self::Edit,
        Self::Reveal,
        Self::Ui,
    ];

    /// Key used for this verb under `[commands.<name>]`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Add => "add",
            Self::Commit => "commit",
            Self::Gc => "gc",
            Self::Exec => "exec",
            Self::Edit => "edit",
            Self::Reveal => "reveal",
            Self::Ui => "ui",
        }
    }

    /// Whether `[commands.<name>]` refers to something this tool understands.
    ///
    /// `list` and `info` accept a configured filter even though they spawn nothing.
    pub fn is_configurable(name: &str) -> bool {
        matches!(name, "list" | "info") || Self::ALL.iter().any(|v| v.name() == name)
    }
}

impl fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What gets launched for a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Git,
    /// `sh -c <script>`
    Shell,
    /// Configured `editor`, `$EDITOR`, then `nano`
    Editor,
    /// Configured `gitui`, then `$GITUI`
    GitUi,
    /// The platform file manager
    FileManager,
}

/// How children are attached to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run in parallel with stdout/stderr buffered per repository.
    Captured,
    /// Run one at a time with the terminal inherited.
    Interactive,
}

/// Built-in definition of a verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub verb: CommandVerb,
    pub program: ProgramKind,
    pub base_args: Vec<String>,
    pub default_filter: Option<FilterExpression>,
    pub mode: ExecutionMode,
}

impl CommandSpec {
    fn new(verb: CommandVerb, program: ProgramKind, base_args: &[&str]) -> Self {
        Self {
            verb,
            program,
            base_args: base_args.iter().map(|s| s.to_string()).collect(),
            default_filter: None,
            mode: ExecutionMode::Captured,
        }
    }

    fn with_default_filter(mut self, clause: FilterClause) -> Self {
        self.default_filter = Some(FilterExpression::new(vec![clause]));
        self
    }

    fn interactive(mut self) -> Self {
        self.mode = ExecutionMode::Interactive;
        self
    }

    pub fn builtin(verb: CommandVerb) -> Self {
        use CommandVerb::*;
        match verb {
            Status => Self::new(verb, ProgramKind::Git, &["status"]),
            Pull => Self::new(verb, ProgramKind::Git, &["pull"])
                .with_default_filter(FilterClause::HasRemotes),
            Push => Self::new(verb, ProgramKind::Git, &["push"])
                .with_default_filter(FilterClause::HasRemotes),
            Add => Self::new(verb, ProgramKind::Git, &["add", "--all"]),
            Commit => Self::new(verb, ProgramKind::Git, &["commit"])
                .with_default_filter(FilterClause::Dirty),
            Gc => Self::new(verb, ProgramKind::Git, &["gc"]),
            Exec => Self::new(verb, ProgramKind::Shell, &[]),
            Edit => Self::new(verb, ProgramKind::Editor, &[]).interactive(),
            Reveal => Self::new(verb, ProgramKind::FileManager, &[]).interactive(),
            Ui => Self::new(verb, ProgramKind::GitUi, &[]).interactive(),
        }
    }

    /// Launchers receive the repository path as their last argument.
    pub fn appends_repository_path(&self) -> bool {
        matches!(
            self.program,
            ProgramKind::Editor | ProgramKind::GitUi | ProgramKind::FileManager
        )
    }
}

/// `[commands.<name>]` from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOverride {
    /// Appended after the built-in arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Replaces the built-in default filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
}

/// One fully merged unit of work. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Position of the repository in the registry
    pub index: usize,
    pub repository: RepositoryRecord,
    pub program: String,
    pub argv: Vec<String>,
    pub mode: ExecutionMode,
}

impl ExecutionRequest {
    pub fn working_dir(&self) -> &PathBuf {
        &self.repository.path
    }

    /// Printable command line, used in logs.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.argv.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
