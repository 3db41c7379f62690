use colored::Colorize;
use std::path::Path;

use super::CommandContext;
use crate::application::services::registry_service::RegistryService;
use crate::domain::entities::report::EXIT_SUCCESS;

/// Handler for the register command
pub async fn register(
    ctx: &CommandContext,
    path: &Path,
    name: Option<&str>,
    no_push: bool,
) -> anyhow::Result<i32> {
    let service = RegistryService::new(ctx.store.clone());
    let record = service.register(path, name, no_push).await?;

    println!(
        "{} Registered {} at {}",
        "✓".green().bold(),
        ctx.display.format_repo(&record),
        record.path.display()
    );
    Ok(EXIT_SUCCESS)
}

/// Handler for the unregister command
pub async fn unregister(ctx: &CommandContext, selector: &str) -> anyhow::Result<i32> {
    let service = RegistryService::new(ctx.store.clone());
    let record = service.unregister(selector).await?;

    println!(
        "{} Unregistered {}",
        "✓".green().bold(),
        ctx.display.format_repo(&record)
    );
    Ok(EXIT_SUCCESS)
}
