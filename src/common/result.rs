use std::path::PathBuf;

use crate::common::error::MultigitError;

/// Result alias used across the crate.
///
/// # Examples
///
/// ```
/// use multigit::common::result::MultigitResult;
/// use multigit::common::error::MultigitError;
///
/// fn example_function() -> MultigitResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> MultigitResult<()> {
///     Err(MultigitError::internal_error("Something went wrong"))
/// }
/// ```
pub type MultigitResult<T> = Result<T, MultigitError>;

/// Conversions from foreign results into [`MultigitResult`] with context attached.
pub trait ResultExt<T, E> {
    /// Map the error into a `FileSystemError` naming the path involved.
    ///
    /// ```
    /// use multigit::common::result::{MultigitResult, ResultExt};
    ///
    /// let result: Result<String, std::io::Error> = Err(std::io::Error::new(
    ///     std::io::ErrorKind::NotFound, "file not found"
    /// ));
    /// let mapped: MultigitResult<String> = result.with_filesystem_error("read failed", None);
    /// assert!(mapped.is_err());
    /// ```
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> MultigitResult<T>
    where
        E: Into<std::io::Error>;

    /// Map the error into a `ConfigError` for the given configuration file.
    fn with_config_error(self, message: impl Into<String>, path: Option<PathBuf>) -> MultigitResult<T>
    where
        E: std::error::Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> MultigitResult<T>
    where
        E: Into<std::io::Error>,
    {
        self.map_err(|e| MultigitError::filesystem_error_with_source(message, path, e.into()))
    }

    fn with_config_error(self, message: impl Into<String>, path: Option<PathBuf>) -> MultigitResult<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.map_err(|e| MultigitError::config_error_with_source(message, path, e))
    }
}
