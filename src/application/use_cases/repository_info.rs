use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use super::select_repositories::{SelectRepositoriesConfig, SelectRepositoriesUseCase};
use crate::common::cancellation::CancellationToken;
use crate::common::error::MultigitError;
use crate::common::result::MultigitResult;
use crate::domain::entities::repository::{RepositoryRecord, RepositoryState};
use crate::domain::value_objects::filter::FilterExpression;
use crate::infrastructure::git::RepositoryInspector;

/// 情報取得の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "inspection", rename_all = "kebab-case")]
pub enum InfoStatus {
    Inspected(RepositoryState),
    Failed { cause: String },
}

/// `info` の1行分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoRow {
    pub repository: RepositoryRecord,
    #[serde(flatten)]
    pub status: InfoStatus,
}

impl InfoRow {
    /// Local branches with the checked-out one first.
    pub fn branches(&self) -> Vec<&str> {
        let InfoStatus::Inspected(state) = &self.status else {
            return Vec::new();
        };

        let current = state.current_branch.as_deref();
        current
            .into_iter()
            .chain(
                state
                    .branch_names
                    .iter()
                    .map(String::as_str)
                    .filter(|name| Some(*name) != current),
            )
            .collect()
    }
}

/// 選択されたリポジトリの状態一覧を作成するユースケース
pub struct RepositoryInfoUseCase {
    inspector: Arc<dyn RepositoryInspector>,
    max_concurrency: usize,
}

impl RepositoryInfoUseCase {
    pub fn new(inspector: Arc<dyn RepositoryInspector>, max_concurrency: usize) -> Self {
        Self {
            inspector,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// フィルタに一致したリポジトリの状態を取得する
    ///
    /// A repository whose state cannot be read gets a failed row; the table is
    /// still produced for the rest.
    pub async fn execute(
        &self,
        repositories: &[RepositoryRecord],
        filter: &FilterExpression,
        cancel: &CancellationToken,
    ) -> MultigitResult<Vec<InfoRow>> {
        let selection = SelectRepositoriesUseCase::new(
            self.inspector.clone(),
            SelectRepositoriesConfig {
                max_concurrency: self.max_concurrency,
            },
        )
        .execute(repositories, filter, cancel)
        .await?;

        let inspection = stream::iter(selection.selected().map(|c| c.repository.clone()))
            .map(|repository| async move {
                let status = match self.inspector.state(&repository.path).await {
                    Ok(state) => InfoStatus::Inspected(state),
                    Err(e) => {
                        tracing::warn!("cannot read state of {}: {}", repository.identity, e);
                        InfoStatus::Failed { cause: e.cause }
                    }
                };
                InfoRow { repository, status }
            })
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>();

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(MultigitError::Cancelled),
            rows = inspection => Ok(rows),
        }
    }
}
