use super::{compile_filter, CommandContext, InterruptGuard};
use crate::application::services::command_resolver::{CommandResolver, LauncherEnvironment};
use crate::application::use_cases::repository_info::RepositoryInfoUseCase;
use crate::domain::entities::report::EXIT_SUCCESS;
use crate::presentation::cli::RunArgs;

/// Handler for the info command
pub async fn execute(ctx: &CommandContext, run: &RunArgs) -> anyhow::Result<i32> {
    let invocation_filter = compile_filter(run)?;
    let config = ctx.load_config().await?;
    let filter = CommandResolver::new(&config, LauncherEnvironment::default())
        .filter_for("info", invocation_filter);

    let interrupt = InterruptGuard::install()?;
    let max_concurrency = ctx.parallel_config(&config, run.jobs).max_concurrency;
    let rows = RepositoryInfoUseCase::new(ctx.inspector(), max_concurrency)
        .execute(config.repositories.list(), &filter, interrupt.token())
        .await?;

    ctx.emit(&rows, run.output, |display| display.render_info(&rows))?;
    Ok(EXIT_SUCCESS)
}
