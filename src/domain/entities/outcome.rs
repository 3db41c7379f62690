use serde::Serialize;

/// Terminal status of running a command against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ExecutionOutcome {
    Succeeded {
        stdout: String,
        stderr: String,
    },
    Failed {
        stdout: String,
        stderr: String,
        /// `None` when the child was killed by a signal
        exit_code: Option<i32>,
    },
    Skipped {
        reason: String,
    },
    SpawnError {
        cause: String,
    },
    Cancelled,
}

/// Why a repository was not dispatched.
pub mod skip_reason {
    pub const FILTERED: &str = "filtered";
    pub const NO_PUSH: &str = "no-push";

    pub fn inspection_failed(cause: &str) -> String {
        format!("inspection failed: {cause}")
    }
}

impl ExecutionOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn filtered() -> Self {
        Self::skipped(skip_reason::FILTERED)
    }

    /// Build an outcome from a finished child's exit code and captured output.
    pub fn from_exit(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        match exit_code {
            Some(0) => Self::Succeeded { stdout, stderr },
            exit_code => Self::Failed {
                stdout,
                stderr,
                exit_code,
            },
        }
    }

    /// Whether this outcome keeps the process exit code at zero.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Skipped { .. })
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Skipped { reason } if reason == skip_reason::FILTERED)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
            Self::SpawnError { .. } => "spawn error",
            Self::Cancelled => "cancelled",
        }
    }
}
