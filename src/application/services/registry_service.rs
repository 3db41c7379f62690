use std::path::Path;

use crate::common::result::MultigitResult;
use crate::domain::entities::config::Config;
use crate::domain::entities::repository::RepositoryRecord;
use crate::infrastructure::filesystem::ConfigStore;

/// リポジトリ登録を管理し、変更を即座に設定ファイルへ保存するサービス
#[derive(Debug, Clone)]
pub struct RegistryService {
    store: ConfigStore,
}

impl RegistryService {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// リポジトリを登録して保存
    pub async fn register(
        &self,
        path: &Path,
        name: Option<&str>,
        no_push: bool,
    ) -> MultigitResult<RepositoryRecord> {
        let mut config = self.store.load().await?;
        let mut record = config.repositories.register(path, name)?;

        if no_push {
            if let Some(stored) = config.repositories.get_mut(&record.identity) {
                stored.no_push = true;
            }
            record.no_push = true;
        }

        self.store.save(&config).await?;
        tracing::info!("registered {} at {}", record.identity, record.path.display());
        Ok(record)
    }

    /// 識別子またはパスで指定されたリポジトリの登録を解除して保存
    pub async fn unregister(&self, selector: &str) -> MultigitResult<RepositoryRecord> {
        let mut config = self.store.load().await?;
        let record = config.repositories.unregister(selector)?;

        self.store.save(&config).await?;
        tracing::info!("unregistered {}", record.identity);
        Ok(record)
    }

    /// 存在しない、またはGit管理外になったリポジトリを登録から外す
    ///
    /// Nothing is written when nothing was removed.
    pub async fn clean(&self) -> MultigitResult<Vec<RepositoryRecord>> {
        let mut config = self.store.load().await?;
        let removed = config.repositories.remove_stale();

        if !removed.is_empty() {
            self.store.save(&config).await?;
            for record in &removed {
                tracing::info!("removed stale entry {} ({})", record.identity, record.path.display());
            }
        }
        Ok(removed)
    }

    /// 現在の設定を読み込む
    pub async fn load(&self) -> MultigitResult<Config> {
        self.store.load().await
    }
}
