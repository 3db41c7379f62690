use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use crate::common::error::MultigitError;
use crate::common::result::{MultigitResult, ResultExt};
use crate::domain::entities::config::Config;

const APP_DIR: &str = "multigit";
const FILE_NAME: &str = "config.toml";

/// Loads and persists `config.toml`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$XDG_CONFIG_HOME/multigit/config.toml`, or under `~/.config`.
    pub fn at_default_location() -> MultigitResult<Self> {
        let path = Self::resolve_default_path(std::env::var_os("XDG_CONFIG_HOME"), dirs::home_dir())
            .ok_or_else(|| {
                MultigitError::config_error(
                    "cannot locate the configuration directory; set XDG_CONFIG_HOME or pass --config",
                    None,
                )
            })?;
        Ok(Self::new(path))
    }

    /// Default location given the environment, `None` when neither is usable.
    pub fn resolve_default_path(
        xdg_config_home: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Option<PathBuf> {
        let base = xdg_config_home
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| home.map(|home| home.join(".config")))?;
        Some(base.join(APP_DIR).join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration. A missing file is an empty configuration.
    pub async fn load(&self) -> MultigitResult<Config> {
        let Some(contents) = self.read_raw().await? else {
            tracing::debug!("no configuration at {}, starting empty", self.path.display());
            return Ok(Config::default());
        };

        let config: Config = toml::from_str(&contents)
            .with_config_error(format!("cannot parse {}", self.path.display()), Some(self.path.clone()))?;

        for name in config.unknown_command_names() {
            tracing::warn!("ignoring [commands.{}]: not a known command", name);
        }

        tracing::debug!(
            "loaded {} repositories from {}",
            config.repositories.len(),
            self.path.display()
        );
        Ok(config)
    }

    /// File contents, `None` if the file does not exist.
    pub async fn read_raw(&self) -> MultigitResult<Option<String>> {
        match async_fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MultigitError::config_error_with_source(
                format!("cannot read {}", self.path.display()),
                Some(self.path.clone()),
                e,
            )),
        }
    }

    /// Persist the configuration.
    ///
    /// Writes a sibling temp file and renames it over the original, so a crash
    /// leaves either the old or the new file, never a truncated one.
    pub async fn save(&self, config: &Config) -> MultigitResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent)
                .await
                .with_filesystem_error("cannot create configuration directory", Some(parent.to_path_buf()))?;
        }

        let contents = toml::to_string(config)?;
        let temp_path = self.temp_path();

        async_fs::write(&temp_path, contents)
            .await
            .with_filesystem_error("cannot write configuration", Some(temp_path.clone()))?;
        async_fs::rename(&temp_path, &self.path)
            .await
            .with_filesystem_error("cannot replace configuration", Some(self.path.clone()))?;

        tracing::debug!("saved configuration to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(FILE_NAME));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::repository::RepositoryRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_path_prefers_xdg() {
        let path = ConfigStore::resolve_default_path(
            Some(OsString::from("/xdg")),
            Some(PathBuf::from("/home/me")),
        );
        assert_eq!(path, Some(PathBuf::from("/xdg/multigit/config.toml")));
    }

    #[test]
    fn test_default_path_falls_back_to_home() {
        let path = ConfigStore::resolve_default_path(Some(OsString::new()), Some(PathBuf::from("/home/me")));
        assert_eq!(path, Some(PathBuf::from("/home/me/.config/multigit/config.toml")));
        assert_eq!(ConfigStore::resolve_default_path(None, None), None);
    }

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("nested").join("config.toml"));
        assert_eq!(store.load().await.unwrap(), Config::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("nested").join("config.toml"));

        let mut config = Config {
            editor: Some("vim".into()),
            ..Config::default()
        };
        config
            .repositories
            .insert(RepositoryRecord::new("api", "/src/api"))
            .unwrap();

        store.save(&config).await.unwrap();
        assert!(store.path().exists());
        assert!(!store.temp_path().exists());
        assert_eq!(store.load().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "repositories = [").unwrap();

        let err = ConfigStore::new(&path).load().await.unwrap_err();
        match err {
            MultigitError::ConfigError { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_top_level_key_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "edtor = \"vim\"\n").unwrap();

        let err = ConfigStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, MultigitError::ConfigError { .. }));
    }
}
