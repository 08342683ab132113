//! Job registry and runner
//!
//! Spawns one tokio task per job. Jobs share the controller (read-only
//! configuration plus provider limits) and nothing else; the registry only
//! records status snapshots and cancellation tokens keyed by [`JobId`].

use crate::collaborators::Collaborators;
use crate::config::LinkbridgeConfig;
use crate::controller::{CancelToken, PipelineController};
use crate::limiter::ProviderLimits;
use crate::types::{AbortKind, JobId, JobRequest, JobResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Status snapshot of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "kind")]
pub enum JobStatus {
    /// Still in flight
    Running,
    /// Ended in `DELIVER`
    Delivered,
    /// Ended in `ABORT`
    Aborted(AbortKind),
}

impl JobStatus {
    fn of(result: &JobResult) -> Self {
        if result.delivered() {
            Self::Delivered
        } else {
            Self::Aborted(result.abort_kind().unwrap_or(AbortKind::Internal))
        }
    }

    /// No longer running
    #[inline]
    #[must_use]
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug)]
struct JobEntry {
    status: JobStatus,
    cancel: CancelToken,
}

type Registry = Arc<DashMap<JobId, JobEntry>>;

/// Handle to one spawned job
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    task: JoinHandle<JobResult>,
    jobs: Registry,
}

impl JobHandle {
    /// Job identifier
    #[inline]
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait for the job's result
    ///
    /// A task that panicked or was torn down still yields a result, aborted
    /// with [`AbortKind::Internal`].
    pub async fn result(self) -> JobResult {
        match self.task.await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(job_id = %self.job_id, error = %err, "job task failed");
                if let Some(mut entry) = self.jobs.get_mut(&self.job_id) {
                    entry.status = JobStatus::Aborted(AbortKind::Internal);
                }
                JobResult::internal_failure(self.job_id, format!("job task failed: {err}"))
            }
        }
    }
}

/// Runs many jobs concurrently over one controller
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    controller: Arc<PipelineController>,
    jobs: Registry,
}

impl PipelineRunner {
    /// Runner over an existing controller
    #[must_use]
    pub fn new(controller: PipelineController) -> Self {
        Self {
            controller: Arc::new(controller),
            jobs: Arc::new(DashMap::new()),
        }
    }

    /// Runner with provider limits taken from the configuration
    #[must_use]
    pub fn from_config(config: Arc<LinkbridgeConfig>, collaborators: Collaborators) -> Self {
        let limits = ProviderLimits::new(
            config.pipeline.search_concurrency,
            config.pipeline.generation_concurrency,
        );
        Self::new(PipelineController::new(config, collaborators, limits))
    }

    /// Controller shared by all jobs
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &PipelineController {
        &self.controller
    }

    /// Spawn a job; must be called from within a tokio runtime
    #[must_use]
    pub fn submit(&self, request: JobRequest) -> JobHandle {
        let job_id = request.id;
        let cancel = CancelToken::new();
        self.jobs.insert(
            job_id,
            JobEntry {
                status: JobStatus::Running,
                cancel: cancel.clone(),
            },
        );

        let controller = Arc::clone(&self.controller);
        let jobs = Arc::clone(&self.jobs);
        let task = tokio::spawn(async move {
            let result = controller.run(request, &cancel).await;
            if let Some(mut entry) = jobs.get_mut(&job_id) {
                entry.status = JobStatus::of(&result);
            }
            result
        });
        tracing::debug!(%job_id, active = self.active_jobs(), "job submitted");

        JobHandle {
            job_id,
            task,
            jobs: Arc::clone(&self.jobs),
        }
    }

    /// Ask a running job to stop at its next state boundary
    ///
    /// Returns `false` for unknown or finished jobs.
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.jobs.get(&job_id) {
            Some(entry) if !entry.status.is_finished() => {
                entry.cancel.cancel();
                tracing::info!(%job_id, "cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Current status of a job
    #[must_use]
    pub fn status(&self, job_id: JobId) -> Option<JobStatus> {
        self.jobs.get(&job_id).map(|entry| entry.status)
    }

    /// Jobs still running
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| !entry.status.is_finished())
            .count()
    }

    /// Drop finished jobs from the registry; returns how many were removed
    pub fn prune_finished(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| !entry.status.is_finished());
        before - self.jobs.len()
    }

    /// Run a batch concurrently; results come back in request order
    pub async fn run_all(&self, requests: Vec<JobRequest>) -> Vec<JobResult> {
        let handles: Vec<JobHandle> = requests
            .into_iter()
            .map(|request| self.submit(request))
            .collect();
        futures::future::join_all(handles.into_iter().map(JobHandle::result)).await
    }
}
