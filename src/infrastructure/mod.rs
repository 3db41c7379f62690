/// Infrastructure layer modules
///
/// Concrete implementations for external system interactions:
/// - Git state queries (`git status`, `git stash list`, ...)
/// - Configuration file storage
/// - Child process execution and the worker pool
pub mod filesystem;
pub mod git;
pub mod process;

pub use filesystem::ConfigStore;
pub use git::{GitInspector, RepositoryInspector};
pub use process::{Dispatcher, ParallelConfig};
