//! Shared error types, result aliases and the run-wide cancellation token.

pub mod cancellation;
pub mod error;
pub mod result;
