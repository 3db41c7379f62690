use std::collections::BTreeMap;

use crate::common::error::MultigitError;
use crate::common::result::MultigitResult;
use crate::domain::entities::command::{
    CommandOverride, CommandSpec, CommandVerb, ExecutionMode, ExecutionRequest, ProgramKind,
};
use crate::domain::entities::config::Config;
use crate::domain::entities::repository::RepositoryRecord;
use crate::domain::value_objects::filter::FilterExpression;

const DEFAULT_EDITOR: &str = "nano";
const SHELL: &str = "sh";

/// ランチャー解決に使う環境変数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LauncherEnvironment {
    /// `$EDITOR`
    pub editor: Option<String>,
    /// `$GITUI`
    pub gitui: Option<String>,
}

impl LauncherEnvironment {
    /// プロセスの環境変数から読み込む
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            editor: read("EDITOR"),
            gitui: read("GITUI"),
        }
    }
}

/// 実行可能な形に解決されたコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub verb: CommandVerb,
    pub program: String,
    /// Built-in arguments, then configured ones, then the invocation's
    pub args: Vec<String>,
    pub filter: FilterExpression,
    pub mode: ExecutionMode,
    appends_repository_path: bool,
}

impl ResolvedCommand {
    /// リポジトリ単位の実行リクエストを作成
    pub fn request_for(&self, index: usize, repository: &RepositoryRecord) -> ExecutionRequest {
        let mut argv = self.args.clone();
        if self.appends_repository_path {
            argv.push(repository.path.to_string_lossy().into_owned());
        }

        ExecutionRequest {
            index,
            repository: repository.clone(),
            program: self.program.clone(),
            argv,
            mode: self.mode,
        }
    }
}

/// Effective filter: invocation, then configuration, then the built-in default.
///
/// The first one present wins outright; filters are never merged.
pub fn effective_filter(
    invocation: Option<FilterExpression>,
    configured: Option<&FilterExpression>,
    default: Option<&FilterExpression>,
) -> FilterExpression {
    invocation
        .or_else(|| configured.cloned())
        .or_else(|| default.cloned())
        .unwrap_or_else(FilterExpression::all)
}

/// 組み込み定義・設定・呼び出し引数からコマンドを解決するサービス
#[derive(Debug, Clone, Default)]
pub struct CommandResolver {
    editor: Option<String>,
    gitui: Option<String>,
    overrides: BTreeMap<String, CommandOverride>,
}

impl CommandResolver {
    /// 設定ファイルの値を環境変数より優先する
    pub fn new(config: &Config, environment: LauncherEnvironment) -> Self {
        Self {
            editor: config.editor.clone().or(environment.editor),
            gitui: config.gitui.clone().or(environment.gitui),
            overrides: config.commands.clone(),
        }
    }

    /// Filter for a command that spawns nothing (`list`, `info`).
    pub fn filter_for(&self, name: &str, invocation: Option<FilterExpression>) -> FilterExpression {
        let configured = self.overrides.get(name).and_then(|o| o.filter.as_ref());
        effective_filter(invocation, configured, None)
    }

    /// Editor command line used by `edit` and `config edit`.
    pub fn editor_command(&self) -> MultigitResult<(String, Vec<String>)> {
        split_launcher(self.editor.as_deref().unwrap_or(DEFAULT_EDITOR), "editor")
    }

    /// コマンドを解決する
    ///
    /// `invocation_args` are the words after `--`, or the command words for `exec`.
    pub fn resolve(
        &self,
        verb: CommandVerb,
        invocation_args: &[String],
        invocation_filter: Option<FilterExpression>,
    ) -> MultigitResult<ResolvedCommand> {
        let spec = CommandSpec::builtin(verb);
        let command_override = self.overrides.get(verb.name());
        let configured_args = command_override
            .and_then(|o| o.args.as_deref())
            .unwrap_or_default();

        let filter = effective_filter(
            invocation_filter,
            command_override.and_then(|o| o.filter.as_ref()),
            spec.default_filter.as_ref(),
        );

        let (program, mut args) = match spec.program {
            ProgramKind::Git => ("git".to_string(), Vec::new()),
            ProgramKind::Shell => {
                let script = shell_script(configured_args, invocation_args)?;
                (SHELL.to_string(), vec!["-c".to_string(), script])
            }
            ProgramKind::Editor => self.editor_command()?,
            ProgramKind::GitUi => {
                let gitui = self.gitui.as_deref().ok_or_else(|| {
                    MultigitError::config_error(
                        "No gitui configured. Set 'gitui' in config.toml or the GITUI environment variable.",
                        None,
                    )
                })?;
                split_launcher(gitui, "gitui")?
            }
            ProgramKind::FileManager => file_manager(),
        };

        // The shell folds everything into its script
        if spec.program != ProgramKind::Shell {
            args.extend(spec.base_args.iter().cloned());
            args.extend(configured_args.iter().cloned());
            args.extend(invocation_args.iter().cloned());
        }

        tracing::debug!("resolved {} to {} {:?} with filter '{}'", verb, program, args, filter);

        Ok(ResolvedCommand {
            verb,
            program,
            args,
            filter,
            mode: spec.mode,
            appends_repository_path: spec.appends_repository_path(),
        })
    }
}

/// Build the `sh -c` script for `exec`.
///
/// A single word is taken as a complete script; several words are quoted and
/// joined so each reaches the command as one argument. Configured arguments are
/// script fragments placed in front.
fn shell_script(configured: &[String], words: &[String]) -> MultigitResult<String> {
    let body = match words {
        [] => {
            return Err(MultigitError::command_error(
                "exec needs a command to run",
                "exec",
                None,
            ))
        }
        [script] => script.clone(),
        words => shell_words::join(words),
    };

    Ok(configured
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(body.as_str()))
        .collect::<Vec<_>>()
        .join(" "))
}

fn split_launcher(command_line: &str, setting: &str) -> MultigitResult<(String, Vec<String>)> {
    let mut words = shell_words::split(command_line).map_err(|e| {
        MultigitError::config_error(format!("cannot parse {setting} '{command_line}': {e}"), None)
    })?;

    if words.is_empty() {
        return Err(MultigitError::config_error(
            format!("{setting} is set but empty"),
            None,
        ));
    }

    let program = words.remove(0);
    Ok((program, words))
}

fn file_manager() -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open".to_string(), vec!["-R".to_string()])
    } else {
        ("xdg-open".to_string(), Vec::new())
    }
}
