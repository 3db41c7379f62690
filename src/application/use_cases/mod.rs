pub mod repository_info;
pub mod run_command;
pub mod select_repositories;
