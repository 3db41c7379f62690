use std::sync::Arc;

use super::select_repositories::{
    SelectRepositoriesConfig, SelectRepositoriesUseCase, SelectionResult,
};
use crate::application::services::command_resolver::ResolvedCommand;
use crate::common::cancellation::CancellationToken;
use crate::common::result::MultigitResult;
use crate::domain::entities::command::CommandVerb;
use crate::domain::entities::outcome::{skip_reason, ExecutionOutcome};
use crate::domain::entities::report::{Report, ReportCollector};
use crate::domain::entities::repository::RepositoryRecord;
use crate::infrastructure::git::RepositoryInspector;
use crate::infrastructure::process::{Dispatcher, ParallelConfig};

/// コマンドを選択されたリポジトリ群に対して実行するユースケース
///
/// Selection, then dispatch, then aggregation. Every registered repository
/// ends up in the report exactly once, in registry order.
pub struct RunCommandUseCase {
    inspector: Arc<dyn RepositoryInspector>,
    dispatcher: Dispatcher,
}

impl RunCommandUseCase {
    pub fn new(inspector: Arc<dyn RepositoryInspector>, config: ParallelConfig) -> Self {
        Self {
            inspector,
            dispatcher: Dispatcher::new(config),
        }
    }

    /// コマンドを実行してレポートを返す
    pub async fn execute(
        &self,
        command: &ResolvedCommand,
        repositories: &[RepositoryRecord],
        cancel: &CancellationToken,
    ) -> MultigitResult<Report> {
        let selection = self.select(command, repositories, cancel).await?;
        let collector = ReportCollector::new();

        let mut requests = Vec::new();
        for candidate in selection.candidates {
            if let Some(outcome) = candidate.verdict.skip_outcome() {
                collector.record(candidate.index, candidate.repository, outcome);
                continue;
            }

            if command.verb == CommandVerb::Push && candidate.repository.no_push {
                tracing::info!("{}: no-push, not pushing", candidate.repository.identity);
                collector.record(
                    candidate.index,
                    candidate.repository,
                    ExecutionOutcome::skipped(skip_reason::NO_PUSH),
                );
                continue;
            }

            requests.push(command.request_for(candidate.index, &candidate.repository));
        }

        tracing::info!(
            "running {} in {} of {} repositories",
            command.verb,
            requests.len(),
            repositories.len()
        );
        self.dispatcher.dispatch(requests, &collector, cancel).await;

        Ok(collector.finish())
    }

    async fn select(
        &self,
        command: &ResolvedCommand,
        repositories: &[RepositoryRecord],
        cancel: &CancellationToken,
    ) -> MultigitResult<SelectionResult> {
        let selector = SelectRepositoriesUseCase::new(
            self.inspector.clone(),
            SelectRepositoriesConfig {
                max_concurrency: self.dispatcher.config().max_concurrency,
            },
        );
        selector.execute(repositories, &command.filter, cancel).await
    }
}
