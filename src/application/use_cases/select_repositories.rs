use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::common::cancellation::CancellationToken;
use crate::common::error::MultigitError;
use crate::common::result::MultigitResult;
use crate::domain::entities::outcome::{skip_reason, ExecutionOutcome};
use crate::domain::entities::repository::RepositoryRecord;
use crate::domain::value_objects::filter::{FilterClause, FilterExpression};
use crate::infrastructure::git::{InspectionError, RepositoryInspector};

/// リポジトリ選択の設定
#[derive(Debug, Clone)]
pub struct SelectRepositoriesConfig {
    /// 同時に評価するリポジトリの最大数
    pub max_concurrency: usize,
}

impl Default for SelectRepositoriesConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get() * 2,
        }
    }
}

/// フィルタ評価の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// すべての条件を満たした
    Selected,
    /// いずれかの条件を満たさなかった
    Filtered,
    /// 状態の問い合わせに失敗した
    InspectionFailed(String),
}

impl Verdict {
    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Selected)
    }

    /// Outcome recorded for a repository this verdict keeps out of dispatch.
    pub fn skip_outcome(&self) -> Option<ExecutionOutcome> {
        match self {
            Self::Selected => None,
            Self::Filtered => Some(ExecutionOutcome::filtered()),
            Self::InspectionFailed(cause) => Some(ExecutionOutcome::skipped(
                skip_reason::inspection_failed(cause),
            )),
        }
    }
}

/// 評価済みのリポジトリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// レジストリ内の位置
    pub index: usize,
    pub repository: RepositoryRecord,
    pub verdict: Verdict,
}

/// 選択結果（レジストリ順）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    pub candidates: Vec<Candidate>,
}

impl SelectionResult {
    pub fn selected(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.verdict.is_selected())
    }

    pub fn excluded(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| !c.verdict.is_selected())
    }

    pub fn selected_identities(&self) -> Vec<&str> {
        self.selected().map(|c| c.repository.identity.as_str()).collect()
    }
}

/// フィルタ式でリポジトリを選択するユースケース
pub struct SelectRepositoriesUseCase {
    inspector: Arc<dyn RepositoryInspector>,
    config: SelectRepositoriesConfig,
}

impl SelectRepositoriesUseCase {
    pub fn new(inspector: Arc<dyn RepositoryInspector>, config: SelectRepositoriesConfig) -> Self {
        Self { inspector, config }
    }

    /// 全リポジトリに対してフィルタを評価する
    ///
    /// Repositories are evaluated concurrently; the result keeps registry order.
    /// Returns [`MultigitError::Cancelled`] if `cancel` fires first.
    pub async fn execute(
        &self,
        repositories: &[RepositoryRecord],
        filter: &FilterExpression,
        cancel: &CancellationToken,
    ) -> MultigitResult<SelectionResult> {
        let evaluation = stream::iter(repositories.iter().enumerate())
            .map(|(index, repository)| async move {
                let verdict = self.evaluate(repository, filter).await;
                Candidate {
                    index,
                    repository: repository.clone(),
                    verdict,
                }
            })
            .buffered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>();

        let candidates = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(MultigitError::Cancelled),
            candidates = evaluation => candidates,
        };

        let result = SelectionResult { candidates };
        tracing::debug!(
            "filter '{}' selected {} of {} repositories",
            filter,
            result.selected().count(),
            repositories.len()
        );
        Ok(result)
    }

    /// 単一リポジトリを評価する
    ///
    /// Name clauses run first; if any fails git is never consulted.
    pub async fn evaluate(&self, repository: &RepositoryRecord, filter: &FilterExpression) -> Verdict {
        if !filter.name_clauses().all(|clause| name_clause_holds(clause, repository)) {
            return Verdict::Filtered;
        }

        let mut probe = Probe::new(self.inspector.as_ref(), &repository.path);
        for clause in filter.inspection_clauses() {
            match probe.holds(clause).await {
                Ok(true) => continue,
                Ok(false) => return Verdict::Filtered,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", repository.identity, e);
                    return Verdict::InspectionFailed(e.cause);
                }
            }
        }
        Verdict::Selected
    }
}

fn name_clause_holds(clause: &FilterClause, repository: &RepositoryRecord) -> bool {
    match clause {
        FilterClause::NameContains(needle) => repository.name_contains(needle),
        FilterClause::NameExcludes(needle) => !repository.name_contains(needle),
        _ => true,
    }
}

/// Answers for one repository, each asked at most once.
struct Probe<'a> {
    inspector: &'a dyn RepositoryInspector,
    path: &'a Path,
    dirty: Option<bool>,
    untracked: Option<bool>,
    stashes: Option<usize>,
    remotes: Option<usize>,
    branches: Option<BTreeSet<String>>,
    current_branch: Option<Option<String>>,
}

impl<'a> Probe<'a> {
    fn new(inspector: &'a dyn RepositoryInspector, path: &'a Path) -> Self {
        Self {
            inspector,
            path,
            dirty: None,
            untracked: None,
            stashes: None,
            remotes: None,
            branches: None,
            current_branch: None,
        }
    }

    async fn holds(&mut self, clause: &FilterClause) -> Result<bool, InspectionError> {
        Ok(match clause {
            FilterClause::Dirty => self.dirty().await?,
            FilterClause::NotDirty => !self.dirty().await?,
            FilterClause::Untracked => self.untracked().await?,
            FilterClause::NotUntracked => !self.untracked().await?,
            FilterClause::HasStashes => self.stashes().await? > 0,
            FilterClause::NoStashes => self.stashes().await? == 0,
            FilterClause::HasRemotes => self.remotes().await? > 0,
            FilterClause::NoRemotes => self.remotes().await? == 0,
            FilterClause::BranchContains(needle) => {
                self.branches().await?.iter().any(|b| b.contains(needle.as_str()))
            }
            FilterClause::ActiveBranch(name) => {
                self.current_branch().await?.as_deref() == Some(name.as_str())
            }
            FilterClause::NotActiveBranch(name) => {
                self.current_branch().await?.as_deref() != Some(name.as_str())
            }
            FilterClause::NameContains(_) | FilterClause::NameExcludes(_) => true,
        })
    }

    async fn dirty(&mut self) -> Result<bool, InspectionError> {
        if let Some(dirty) = self.dirty {
            return Ok(dirty);
        }
        let dirty = self.inspector.is_dirty(self.path).await?;
        self.dirty = Some(dirty);
        Ok(dirty)
    }

    async fn untracked(&mut self) -> Result<bool, InspectionError> {
        if let Some(untracked) = self.untracked {
            return Ok(untracked);
        }
        let untracked = self.inspector.has_untracked(self.path).await?;
        self.untracked = Some(untracked);
        Ok(untracked)
    }

    async fn stashes(&mut self) -> Result<usize, InspectionError> {
        if let Some(count) = self.stashes {
            return Ok(count);
        }
        let count = self.inspector.stash_count(self.path).await?;
        self.stashes = Some(count);
        Ok(count)
    }

    async fn remotes(&mut self) -> Result<usize, InspectionError> {
        if let Some(count) = self.remotes {
            return Ok(count);
        }
        let count = self.inspector.remote_count(self.path).await?;
        self.remotes = Some(count);
        Ok(count)
    }

    async fn branches(&mut self) -> Result<&BTreeSet<String>, InspectionError> {
        if self.branches.is_none() {
            self.branches = Some(self.inspector.branch_names(self.path).await?);
        }
        Ok(self.branches.get_or_insert_with(BTreeSet::new))
    }

    async fn current_branch(&mut self) -> Result<Option<String>, InspectionError> {
        if let Some(current) = &self.current_branch {
            return Ok(current.clone());
        }
        let current = self.inspector.current_branch(self.path).await?;
        self.current_branch = Some(current.clone());
        Ok(current)
    }
}
