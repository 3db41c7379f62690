use super::{compile_filter, CommandContext, InterruptGuard};
use crate::application::services::command_resolver::{CommandResolver, LauncherEnvironment};
use crate::application::use_cases::run_command::RunCommandUseCase;
use crate::domain::entities::command::CommandVerb;
use crate::presentation::cli::RunArgs;

/// Handler for every verb that runs a child process per repository
pub async fn execute(
    ctx: &CommandContext,
    verb: CommandVerb,
    run: &RunArgs,
    words: &[String],
) -> anyhow::Result<i32> {
    let filter = compile_filter(run)?;
    let config = ctx.load_config().await?;

    // Launcher problems surface here, before any repository is touched
    let resolver = CommandResolver::new(&config, LauncherEnvironment::from_env());
    let command = resolver.resolve(verb, words, filter)?;

    let interrupt = InterruptGuard::install()?;
    let use_case = RunCommandUseCase::new(ctx.inspector(), ctx.parallel_config(&config, run.jobs));
    let report = use_case
        .execute(&command, config.repositories.list(), interrupt.token())
        .await?;

    ctx.emit(&report, run.output, |display| display.render_report(&report))?;
    Ok(report.exit_code())
}
