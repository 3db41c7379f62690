//! Registry, filter language, command model and report types.
//!
//! Nothing in here spawns processes; the only filesystem access is the
//! canonicalization and `.git` marker check done when registering.

pub mod entities;
pub mod value_objects;
