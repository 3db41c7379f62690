use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::command_executor::{CommandExecutor, DEFAULT_GRACE_PERIOD};
use crate::common::cancellation::CancellationToken;
use crate::domain::entities::command::{ExecutionMode, ExecutionRequest};
use crate::domain::entities::outcome::ExecutionOutcome;
use crate::domain::entities::report::ReportCollector;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of children alive at once
    pub max_concurrency: usize,

    /// Time between SIGTERM and SIGKILL when cancelling
    pub grace_period: Duration,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get() * 2,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

/// Runs execution requests against a bounded pool and records each outcome.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: ParallelConfig,
}

impl Dispatcher {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Run every request and record exactly one outcome per request.
    ///
    /// Captured requests run up to `max_concurrency` at a time. Interactive
    /// requests run one after another in the order given, since they share the
    /// terminal. Once `cancel` fires no new child is started; running children
    /// are terminated and every request still queued is recorded as cancelled.
    /// When this returns no child is left running.
    pub async fn dispatch(
        &self,
        requests: Vec<ExecutionRequest>,
        collector: &ReportCollector,
        cancel: &CancellationToken,
    ) {
        if requests.is_empty() {
            return;
        }

        let start_time = Instant::now();
        let total = requests.len();
        let (interactive, captured): (Vec<_>, Vec<_>) = requests
            .into_iter()
            .partition(|r| r.mode == ExecutionMode::Interactive);

        self.dispatch_captured(captured, collector, cancel).await;
        self.dispatch_interactive(interactive, collector, cancel).await;

        tracing::info!(
            "dispatched {} commands in {}ms",
            total,
            start_time.elapsed().as_millis()
        );
    }

    async fn dispatch_captured(
        &self,
        requests: Vec<ExecutionRequest>,
        collector: &ReportCollector,
        cancel: &CancellationToken,
    ) {
        if requests.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let grace = self.config.grace_period;
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let collector = collector.clone();
            let index = request.index;
            let repository = request.repository.clone();

            let handle = tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    () = cancel.cancelled() => ExecutionOutcome::Cancelled,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(_permit) => CommandExecutor::run(&request, &cancel, grace).await,
                        Err(_) => ExecutionOutcome::Cancelled,
                    },
                };
                log_outcome(&request, &outcome);
                collector.record(request.index, request.repository, outcome);
            });
            handles.push((index, repository, handle));
        }

        for (index, repository, handle) in handles {
            if let Err(e) = handle.await {
                // The task died before recording; keep one outcome per repository.
                tracing::error!("worker for {} failed: {}", repository.identity, e);
                collector.record(
                    index,
                    repository,
                    ExecutionOutcome::SpawnError {
                        cause: format!("worker failed: {e}"),
                    },
                );
            }
        }
    }

    async fn dispatch_interactive(
        &self,
        requests: Vec<ExecutionRequest>,
        collector: &ReportCollector,
        cancel: &CancellationToken,
    ) {
        for request in requests {
            let outcome = CommandExecutor::run(&request, cancel, self.config.grace_period).await;
            log_outcome(&request, &outcome);
            collector.record(request.index, request.repository, outcome);
        }
    }
}

fn log_outcome(request: &ExecutionRequest, outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Succeeded { .. } | ExecutionOutcome::Skipped { .. } => {
            tracing::info!("{}: {}", request.repository.identity, outcome.label())
        }
        ExecutionOutcome::Failed { exit_code, .. } => tracing::warn!(
            "{}: '{}' failed with {:?}",
            request.repository.identity,
            request.display_command(),
            exit_code
        ),
        ExecutionOutcome::SpawnError { cause } => {
            tracing::warn!("{}: {}", request.repository.identity, cause)
        }
        ExecutionOutcome::Cancelled => {
            tracing::info!("{}: cancelled", request.repository.identity)
        }
    }
}
