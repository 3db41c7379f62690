pub mod command_resolver;
pub mod registry_service;

pub use command_resolver::{CommandResolver, LauncherEnvironment, ResolvedCommand};
pub use registry_service::RegistryService;
