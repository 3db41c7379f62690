pub mod command;
pub mod config;
pub mod outcome;
pub mod registry;
pub mod report;
pub mod repository;
