use colored::Colorize;
use tokio::process::Command;

use super::CommandContext;
use crate::application::services::command_resolver::{CommandResolver, LauncherEnvironment};
use crate::application::services::registry_service::RegistryService;
use crate::common::error::MultigitError;
use crate::common::result::{MultigitResult, ResultExt};
use crate::domain::entities::report::EXIT_SUCCESS;
use crate::presentation::cli::ConfigCommands;

/// Handler for `config show|edit|clean|path`
pub async fn execute(ctx: &CommandContext, action: ConfigCommands) -> anyhow::Result<i32> {
    match action {
        ConfigCommands::Show => show(ctx).await?,
        ConfigCommands::Edit => edit(ctx).await?,
        ConfigCommands::Clean => clean(ctx).await?,
        ConfigCommands::Path => println!("{}", ctx.store.path().display()),
    }
    Ok(EXIT_SUCCESS)
}

async fn show(ctx: &CommandContext) -> MultigitResult<()> {
    match ctx.store.read_raw().await? {
        Some(contents) => print!("{contents}"),
        None => eprintln!(
            "{} no configuration at {}",
            "⚠".yellow().bold(),
            ctx.store.path().display()
        ),
    }
    Ok(())
}

/// Open the file in the configured editor, then check that it still loads.
async fn edit(ctx: &CommandContext) -> MultigitResult<()> {
    let path = ctx.store.path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_filesystem_error("cannot create configuration directory", Some(parent.to_path_buf()))?;
    }

    // A broken file must still be editable, so only the editor settings matter here
    let config = ctx.load_config().await.unwrap_or_default();
    let (program, args) =
        CommandResolver::new(&config, LauncherEnvironment::from_env()).editor_command()?;

    tracing::debug!("editing {} with {program}", path.display());
    let status = Command::new(&program)
        .args(&args)
        .arg(path)
        .status()
        .await
        .map_err(|e| {
            MultigitError::command_error_with_source(
                format!("cannot launch '{program}'"),
                program.clone(),
                e,
            )
        })?;

    if !status.success() {
        return Err(MultigitError::command_error(
            "editor exited with an error",
            program,
            status.code(),
        ));
    }

    ctx.load_config().await?;
    println!("{} {} is valid", "✓".green().bold(), path.display());
    Ok(())
}

async fn clean(ctx: &CommandContext) -> MultigitResult<()> {
    let removed = RegistryService::new(ctx.store.clone()).clean().await?;

    if removed.is_empty() {
        println!("{} nothing to clean", "✓".green().bold());
        return Ok(());
    }

    for record in &removed {
        println!(
            "{} removed {} ({})",
            "-".yellow(),
            ctx.display.format_repo(record),
            record.path.display()
        );
    }
    println!("{} {} stale entries removed", "✓".green().bold(), removed.len());
    Ok(())
}
