pub mod config;
pub mod info;
pub mod list;
pub mod register;
pub mod run;

use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use super::{OutputFormat, RunArgs};
use crate::common::cancellation::{cancel_on_interrupt, CancellationToken};
use crate::common::result::MultigitResult;
use crate::domain::entities::config::Config;
use crate::domain::value_objects::filter::FilterExpression;
use crate::infrastructure::filesystem::ConfigStore;
use crate::infrastructure::git::{GitInspector, RepositoryInspector};
use crate::infrastructure::process::ParallelConfig;
use crate::presentation::ui::display::DisplayHelper;

/// State shared by every command handler
pub struct CommandContext {
    pub store: ConfigStore,
    pub verbose: bool,
    pub display: DisplayHelper,
}

impl CommandContext {
    /// `config_path` is `--config`; without it the default location is used.
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> MultigitResult<Self> {
        let store = match config_path {
            Some(path) => ConfigStore::new(path),
            None => ConfigStore::at_default_location()?,
        };
        tracing::debug!("using configuration {}", store.path().display());

        Ok(Self {
            store,
            verbose,
            display: DisplayHelper::new(verbose),
        })
    }

    pub async fn load_config(&self) -> MultigitResult<Config> {
        self.store.load().await
    }

    /// Pool size: `--jobs`, then `jobs` from the file, then the default.
    pub fn parallel_config(&self, config: &Config, jobs: Option<usize>) -> ParallelConfig {
        match jobs.or(config.jobs) {
            Some(jobs) => ParallelConfig::new().with_max_concurrency(jobs),
            None => ParallelConfig::new(),
        }
    }

    pub fn inspector(&self) -> Arc<dyn RepositoryInspector> {
        Arc::new(GitInspector::new())
    }

    /// Print `value` as JSON/YAML, or the text rendering for `--output text`.
    pub fn emit<T: Serialize>(
        &self,
        value: &T,
        format: OutputFormat,
        text: impl FnOnce(&DisplayHelper) -> String,
    ) -> MultigitResult<()> {
        let rendered = match self.display.structured(value, format)? {
            Some(structured) => structured,
            None => text(&self.display),
        };

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Compile `--filter`, failing before any repository is looked at.
pub fn compile_filter(run: &RunArgs) -> MultigitResult<Option<FilterExpression>> {
    run.filter
        .as_deref()
        .map(FilterExpression::compile)
        .transpose()
        .map_err(Into::into)
}

/// Cancels its token on Ctrl-C for as long as it is alive.
pub struct InterruptGuard {
    token: CancellationToken,
    listener: tokio::task::JoinHandle<()>,
}

impl InterruptGuard {
    pub fn install() -> MultigitResult<Self> {
        let token = CancellationToken::new();
        let listener = cancel_on_interrupt(&token)?;
        Ok(Self { token, listener })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::MultigitError;
    use crate::domain::value_objects::filter::FilterCompileError;

    fn run_args(filter: Option<&str>) -> RunArgs {
        RunArgs {
            filter: filter.map(str::to_string),
            jobs: None,
            output: OutputFormat::Text,
        }
    }

    #[test]
    fn test_compile_filter() {
        assert!(compile_filter(&run_args(None)).unwrap().is_none());
        assert_eq!(
            compile_filter(&run_args(Some("dirty")))
                .unwrap()
                .unwrap()
                .to_string(),
            "dirty"
        );

        let err = compile_filter(&run_args(Some("drity"))).unwrap_err();
        assert!(matches!(
            err,
            MultigitError::Filter(FilterCompileError::UnknownFilterClause { .. })
        ));
        assert_eq!(err.exit_code(), crate::common::error::EXIT_FATAL);
    }

    #[test]
    fn test_parallel_config_precedence() {
        let ctx = CommandContext::new(Some(PathBuf::from("/nonexistent/config.toml")), false).unwrap();
        let config = Config {
            jobs: Some(3),
            ..Config::default()
        };

        assert_eq!(ctx.parallel_config(&config, Some(5)).max_concurrency, 5);
        assert_eq!(ctx.parallel_config(&config, None).max_concurrency, 3);
        assert_eq!(
            ctx.parallel_config(&Config::default(), None).max_concurrency,
            ParallelConfig::default().max_concurrency
        );
    }
}
