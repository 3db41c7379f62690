use super::{compile_filter, CommandContext, InterruptGuard};
use crate::application::services::command_resolver::{CommandResolver, LauncherEnvironment};
use crate::application::use_cases::select_repositories::{
    SelectRepositoriesConfig, SelectRepositoriesUseCase,
};
use crate::domain::entities::report::EXIT_SUCCESS;
use crate::domain::entities::repository::RepositoryRecord;
use crate::presentation::cli::RunArgs;

/// Handler for the list command
pub async fn execute(ctx: &CommandContext, run: &RunArgs) -> anyhow::Result<i32> {
    let invocation_filter = compile_filter(run)?;
    let config = ctx.load_config().await?;
    let filter = CommandResolver::new(&config, LauncherEnvironment::default())
        .filter_for("list", invocation_filter);

    let interrupt = InterruptGuard::install()?;
    let selection = SelectRepositoriesUseCase::new(
        ctx.inspector(),
        SelectRepositoriesConfig {
            max_concurrency: ctx.parallel_config(&config, run.jobs).max_concurrency,
        },
    )
    .execute(config.repositories.list(), &filter, interrupt.token())
    .await?;

    let records: Vec<RepositoryRecord> = selection
        .selected()
        .map(|candidate| candidate.repository.clone())
        .collect();

    ctx.emit(&records, run.output, |display| display.render_records(&records))?;
    Ok(EXIT_SUCCESS)
}
