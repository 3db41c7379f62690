pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::common::error::{MultigitError, EXIT_FATAL};
use crate::domain::entities::command::CommandVerb;
use commands::CommandContext;

/// Output format options for commands that report per repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// multigit - Run one git command across many registered repositories
#[derive(Debug, Parser)]
#[command(name = "multigit")]
#[command(about = "Run one git command across many registered repositories")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/multigit/config.toml)
    #[arg(long, global = true, env = "MULTIGIT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that selects repositories
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Filter expression, e.g. "dirty,not-name:scratch"
    #[arg(short, long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Maximum number of repositories processed at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Output format (text, json, yaml)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// A git verb plus arguments passed through to git
#[derive(Debug, Clone, Args)]
pub struct GitArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Extra arguments appended to the git command line
    #[arg(last = true, value_name = "GIT_ARGS")]
    pub extra: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a git working tree
    Register {
        /// Path to the working tree
        path: PathBuf,

        /// Identity to use instead of the directory name
        #[arg(long)]
        name: Option<String>,

        /// Never push this repository
        #[arg(long)]
        no_push: bool,
    },

    /// Remove a repository from the registry
    Unregister {
        /// Identity or path of the repository
        repository: String,
    },

    /// List registered repositories
    List {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run `git status` in each repository
    Status(GitArgs),

    /// Run `git pull` in each repository (default filter: remotes)
    Pull(GitArgs),

    /// Run `git push` in each repository (default filter: remotes)
    Push(GitArgs),

    /// Run `git add --all` in each repository
    Add(GitArgs),

    /// Run `git commit` in each repository (default filter: dirty)
    Commit(GitArgs),

    /// Run `git gc` in each repository
    Gc(GitArgs),

    /// Show branches, remotes and working tree state per repository
    Info {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run a shell command in each repository
    Exec {
        #[command(flatten)]
        run: RunArgs,

        /// Shell command; a single word is passed to `sh -c` unchanged
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Open each repository in the configured editor
    Edit {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Show each repository in the file manager
    Reveal {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Open each repository in the configured git UI
    Ui {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Inspect or maintain the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration file
    Show,
    /// Open the configuration file in the editor
    Edit,
    /// Drop entries whose working tree is gone
    Clean,
    /// Print the configuration file location
    Path,
}

const NO_ARGS: &[String] = &[];

impl Commands {
    /// Verb and arguments for commands that dispatch a child per repository.
    fn dispatch_args(&self) -> Option<(CommandVerb, &RunArgs, &[String])> {
        let (verb, git) = match self {
            Self::Status(git) => (CommandVerb::Status, git),
            Self::Pull(git) => (CommandVerb::Pull, git),
            Self::Push(git) => (CommandVerb::Push, git),
            Self::Add(git) => (CommandVerb::Add, git),
            Self::Commit(git) => (CommandVerb::Commit, git),
            Self::Gc(git) => (CommandVerb::Gc, git),
            Self::Exec { run, command } => return Some((CommandVerb::Exec, run, command.as_slice())),
            Self::Edit { run } => return Some((CommandVerb::Edit, run, NO_ARGS)),
            Self::Reveal { run } => return Some((CommandVerb::Reveal, run, NO_ARGS)),
            Self::Ui { run } => return Some((CommandVerb::Ui, run, NO_ARGS)),
            _ => return None,
        };
        Some((verb, &git.run, git.extra.as_slice()))
    }
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the command and return the process exit code.
    pub async fn run(self) -> i32 {
        if self.cli.no_color || !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }

        match self.handle_command().await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit_code_for(&e)
            }
        }
    }

    async fn handle_command(&self) -> anyhow::Result<i32> {
        let ctx = CommandContext::new(self.cli.config.clone(), self.cli.verbose)?;

        if let Some((verb, run, words)) = self.cli.command.dispatch_args() {
            return commands::run::execute(&ctx, verb, run, words).await;
        }

        match &self.cli.command {
            Commands::Register {
                path,
                name,
                no_push,
            } => commands::register::register(&ctx, path, name.as_deref(), *no_push).await,
            Commands::Unregister { repository } => {
                commands::register::unregister(&ctx, repository).await
            }
            Commands::List { run } => commands::list::execute(&ctx, run).await,
            Commands::Info { run } => commands::info::execute(&ctx, run).await,
            Commands::Config { action } => commands::config::execute(&ctx, *action).await,
            other => Err(MultigitError::internal_error(format!("unhandled command {other:?}")).into()),
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit code for an error that ended the run.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<MultigitError>()
        .map(MultigitError::exit_code)
        .unwrap_or(EXIT_FATAL)
}
