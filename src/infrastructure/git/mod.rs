pub mod inspector;

// Re-export main types for convenience
pub use inspector::{GitInspector, InspectionError, RepositoryInspector};
