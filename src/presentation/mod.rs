//! Command line parsing, command handlers and terminal rendering.

pub mod cli;
pub mod ui;
