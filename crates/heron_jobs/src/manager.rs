use crate::config::TaskManagerConfig;
use crate::pipeline::{self, JobSpec, Outcome};

use heron_core::prelude::*;
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Slot {
    current: Option<JobRecord>,
    last_result: Option<JobResult>,
}

pub(crate) struct Shared<C, P> {
    pub(crate) connector: C,
    pub(crate) config_provider: P,
    pub(crate) settings: TaskManagerConfig,
    slot: Mutex<Slot>,
}

impl<C, P> Shared<C, P> {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the running job `job_id` forward. Ignored for any other job.
    pub(crate) fn advance(&self, job_id: &str, stage: Option<Stage>, progress_pct: Option<u8>) {
        let mut slot = self.slot();
        if let Some(job) = running(&mut slot, job_id) {
            job.advance(stage, progress_pct);
        }
    }

    fn finish(&self, job_id: &str, outcome: Outcome) {
        let mut slot = self.slot();
        let Some(job) = running(&mut slot, job_id) else {
            warn!(job_id, "finished job is no longer in the slot");
            return;
        };

        let Outcome {
            error,
            download_error,
            remote_log_path,
            local_artifacts_path,
        } = outcome;

        job.finish(if error.is_none() {
            JobState::Succeeded
        } else {
            JobState::Failed
        });

        let result = JobResult {
            job: job.snapshot(),
            message: error
                .as_ref()
                .map_or(SUCCESS_MESSAGE, |e| e.kind().message())
                .to_string(),
            failure: error.as_ref().map(JobError::kind),
            error: error.as_ref().map(ToString::to_string),
            trace: error.as_ref().map(JobError::trace),
            download_error,
            remote_log_path,
            local_artifacts_path,
        };
        match &result.failure {
            None => info!(job_id, "job succeeded"),
            Some(kind) => warn!(job_id, failure = ?kind, "job failed"),
        }
        slot.last_result = Some(result);
    }
}

fn running<'a>(slot: &'a mut Slot, job_id: &str) -> Option<&'a mut JobRecord> {
    slot.current
        .as_mut()
        .filter(|job| job.job_id == job_id && job.state == JobState::Running)
}

/// Runs at most one remote job at a time and remembers the last outcome.
///
/// Cheap to clone; clones share the same slot.
pub struct TaskManager<C, P> {
    shared: Arc<Shared<C, P>>,
}

impl<C, P> Clone for TaskManager<C, P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: Connector, P: ConfigProvider> TaskManager<C, P> {
    pub fn new(connector: C, config_provider: P, settings: TaskManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                config_provider,
                settings,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    pub fn settings(&self) -> &TaskManagerConfig {
        &self.shared.settings
    }

    /// Validates the inputs and, if the slot is free, starts the job in the background.
    ///
    /// Returns immediately. Concurrent calls are serialized: exactly one of them can
    /// take a free slot.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        script_path: impl AsRef<Path>,
        directory_path: impl AsRef<Path>,
    ) -> SubmitResponse {
        let script_path = script_path.as_ref();
        let directory_path = directory_path.as_ref();
        let job_id = new_job_id();

        let job_spec = match resolve_inputs(&job_id, script_path, directory_path) {
            Ok(job_spec) => job_spec,
            Err(message) => {
                warn!(script = %script_path.display(), dir = %directory_path.display(), "{message}");
                return SubmitResponse::rejected(RejectReason::InvalidInput, message);
            }
        };

        {
            let mut slot = self.shared.slot();
            if let Some(job) = slot.current.as_ref().filter(|j| j.state == JobState::Running) {
                return SubmitResponse::rejected(
                    RejectReason::Busy,
                    format!("Job {} is still running", job.job_id),
                );
            }
            slot.current = Some(JobRecord::new(
                &job_id,
                script_path.to_path_buf(),
                directory_path.to_path_buf(),
            ));
        }

        info!(job_id, script = %script_path.display(), "job accepted");
        tokio::spawn(supervise(self.shared.clone(), job_spec));
        SubmitResponse::accepted(job_id)
    }

    /// The current (or most recent) job, or an idle snapshot.
    pub fn get_status(&self) -> JobSnapshot {
        self.shared
            .slot()
            .current
            .as_ref()
            .map_or_else(JobSnapshot::idle, JobRecord::snapshot)
    }

    /// Outcome of the most recently finished job.
    pub fn get_last_result(&self) -> LastResult {
        self.shared
            .slot()
            .last_result
            .clone()
            .map_or_else(LastResult::unavailable, LastResult::available)
    }

    /// Waits until the slot is no longer running or `max_wait` elapses, then returns its status.
    ///
    /// A `max_wait` too large to be represented as a deadline waits without limit.
    pub async fn wait(&self, max_wait: Duration) -> JobSnapshot {
        let deadline = Instant::now().checked_add(max_wait);
        let poll = self.shared.settings.poll_interval;
        loop {
            let status = self.get_status();
            if status.state != JobState::Running {
                return status;
            }
            let pause = match deadline {
                None => poll,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return status;
                    }
                    poll.min(deadline - now)
                }
            };
            sleep(pause).await;
        }
    }
}

/// Runs the pipeline in its own task so a panic still produces a terminal result.
async fn supervise<C: Connector, P: ConfigProvider>(shared: Arc<Shared<C, P>>, job_spec: JobSpec) {
    let job_id = job_spec.job_id.clone();
    let worker = tokio::spawn(pipeline::run(shared.clone(), job_spec));
    let outcome = match worker.await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(job_id, "job worker terminated abnormally: {err}");
            Outcome::failed(JobError::Internal(err.to_string()))
        }
    };
    shared.finish(&job_id, outcome);
}

fn new_job_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

fn resolve_inputs(job_id: &str, script: &Path, directory: &Path) -> Result<JobSpec, String> {
    if !script.exists() {
        return Err(format!("Script not found: {}", script.display()));
    }
    if !script.is_file() {
        return Err(format!("Script is not a file: {}", script.display()));
    }
    if !directory.exists() {
        return Err(format!("Directory not found: {}", directory.display()));
    }
    if !directory.is_dir() {
        return Err(format!("Not a directory: {}", directory.display()));
    }

    let canonical = |p: &Path| {
        p.canonicalize()
            .map_err(|e| format!("Cannot resolve {}: {e}", p.display()))
    };
    let working_dir = canonical(directory)?;
    let script = canonical(script)?;
    let relative = script.strip_prefix(&working_dir).map_err(|_| {
        format!(
            "Script {} is not inside {}",
            script.display(),
            working_dir.display()
        )
    })?;

    Ok(JobSpec {
        job_id: job_id.to_string(),
        script_rel: to_posix(relative),
        working_dir,
    })
}

fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
