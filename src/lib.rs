//! # multigit - run one git command across many repositories
//!
//! `multigit` keeps a registry of local git working trees and runs a command
//! (`git status`, `git pull`, an arbitrary shell command, an editor, ...) in
//! every registered repository that a filter expression admits, in parallel,
//! reporting the outcomes in registry order.
//!
//! ## Quick Start
//!
//! ```bash
//! multigit register ~/src/api
//! multigit register ~/src/website --no-push
//! multigit status -f dirty
//! multigit exec -f remotes,not-name:scratch 'git fetch --prune'
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: registry, filter language, command model, outcomes and reports
//! - [`application`]: selection, command resolution and the run workflow
//! - [`infrastructure`]: git inspection, config storage, child processes
//! - [`presentation`]: CLI parsing and terminal rendering
//! - [`common`]: error types and the cancellation token
//!
//! ## Filters
//!
//! A filter is a comma separated list of clauses that must all hold:
//! `name:<s>`, `not-name:<s>`, `dirty`, `no-dirty`, `untracked`, `no-untracked`,
//! `stashes`, `no-stashes`, `remotes`, `no-remotes`, `branch:<s>`,
//! `active-branch:<name>` and `not-active-branch:<name>`.
//!
//! ```rust
//! use multigit::domain::value_objects::filter::FilterExpression;
//!
//! let filter: FilterExpression = "dirty,not-name:scratch".parse().unwrap();
//! assert_eq!(filter.clauses().len(), 2);
//! ```
//!
//! ## Error Handling
//!
//! - [`common::error::MultigitError`]: crate error, mapped to a process exit code
//! - [`common::result::MultigitResult`]: alias for `Result<T, MultigitError>`

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::MultigitError;
pub use crate::common::result::MultigitResult as Result;
