use std::path::PathBuf;
use thiserror::Error;

use crate::domain::entities::registry::RegistryError;
use crate::domain::value_objects::filter::FilterCompileError;

/// Exit code used when a fatal error stops the run before any repository is touched.
pub const EXIT_FATAL: i32 = 3;

#[derive(Error, Debug)]
pub enum MultigitError {
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Filter(#[from] FilterCompileError),

    #[error("File system operation failed: {message}")]
    FileSystemError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Command execution failed: {message}")]
    CommandError {
        message: String,
        command: String,
        exit_code: Option<i32>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl MultigitError {
    pub fn config_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            path,
            source: Some(Box::new(source)),
        }
    }

    pub fn filesystem_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn command_error(
        message: impl Into<String>,
        command: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandError {
            message: message.into(),
            command: command.into(),
            exit_code,
            source: None,
        }
    }

    pub fn command_error_with_source(
        message: impl Into<String>,
        command: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::CommandError {
            message: message.into(),
            command: command.into(),
            exit_code: None,
            source: Some(source),
        }
    }

    pub fn serialization_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }

    /// Process exit code reported when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => crate::domain::entities::report::EXIT_CANCELLED,
            _ => EXIT_FATAL,
        }
    }
}

impl From<std::io::Error> for MultigitError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_json::Error> for MultigitError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization_error_with_source("JSON serialization failed", error)
    }
}

impl From<serde_yaml::Error> for MultigitError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization_error_with_source("YAML serialization failed", error)
    }
}

impl From<toml::ser::Error> for MultigitError {
    fn from(error: toml::ser::Error) -> Self {
        Self::serialization_error_with_source("TOML serialization failed", error)
    }
}
