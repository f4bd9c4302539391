use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of the job slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Ordered phases of a running job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initializing,
    Uploading,
    Executing,
    Downloading,
    Finalizing,
}

/// Why a job ended in [`JobState::Failed`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConfigurationMissing,
    ConnectionFailed,
    UploadFailed,
    ScriptExitNonzero,
    ExecutionFailed,
    DownloadFailed,
    InternalUnexpected,
}

impl FailureKind {
    /// Human-readable outcome message.
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::ConfigurationMissing => "Connection configuration is missing or invalid",
            FailureKind::ConnectionFailed => "Could not connect to the remote environment",
            FailureKind::UploadFailed => "Uploading the working directory failed",
            FailureKind::ScriptExitNonzero => "The script exited with a non-zero status",
            FailureKind::ExecutionFailed => "The script could not be executed remotely",
            FailureKind::DownloadFailed => "Downloading the job artifacts failed",
            FailureKind::InternalUnexpected => "An unexpected internal error occurred",
        }
    }
}

pub const SUCCESS_MESSAGE: &str = "Job completed successfully";

/// The mutable record of the job occupying the slot.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub script_path: PathBuf,
    pub directory_path: PathBuf,
    pub state: JobState,
    pub stage: Stage,
    pub progress_pct: u8,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, script_path: PathBuf, directory_path: PathBuf) -> Self {
        Self {
            job_id: job_id.into(),
            script_path,
            directory_path,
            state: JobState::Running,
            stage: Stage::Initializing,
            progress_pct: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Moves the job forward. Stage and progress never go backwards.
    pub fn advance(&mut self, stage: Option<Stage>, progress_pct: Option<u8>) {
        if let Some(stage) = stage {
            self.stage = self.stage.max(stage);
        }
        if let Some(pct) = progress_pct {
            self.progress_pct = self.progress_pct.max(pct.min(100));
        }
    }

    pub fn finish(&mut self, state: JobState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.ended_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            state: self.state,
            job_id: Some(self.job_id.clone()),
            stage: Some(self.stage),
            progress_pct: Some(self.progress_pct),
            started_at: Some(self.started_at),
            ended_at: self.ended_at,
            script_path: Some(self.script_path.clone()),
            directory_path: Some(self.directory_path.clone()),
        }
    }
}

/// A point-in-time copy of the job slot, as returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSnapshot {
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// `null` while the job is running.
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<PathBuf>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            job_id: None,
            stage: None,
            progress_pct: None,
            started_at: None,
            ended_at: None,
            script_path: None,
            directory_path: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// The terminal snapshot of a finished job plus its outcome payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    #[serde(flatten)]
    pub job: JobSnapshot,
    pub message: String,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
    pub trace: Option<String>,
    /// Set when artifact recovery failed; never replaces `error`.
    pub download_error: Option<String>,
    pub remote_log_path: Option<String>,
    pub local_artifacts_path: Option<PathBuf>,
}

impl JobResult {
    pub fn succeeded(&self) -> bool {
        self.job.state == JobState::Succeeded
    }
}

/// Response of the last-result query: `{"available": false}` until a job finishes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastResult {
    pub available: bool,
    #[serde(flatten)]
    pub result: Option<JobResult>,
}

impl LastResult {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            result: None,
        }
    }

    pub fn available(result: JobResult) -> Self {
        Self {
            available: true,
            result: Some(result),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Busy,
    InvalidInput,
}

/// Outcome of a submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    pub message: String,
}

impl SubmitResponse {
    pub fn accepted(job_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            job_id: Some(job_id.into()),
            reason: None,
            message: "Job accepted".to_string(),
        }
    }

    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            job_id: None,
            reason: Some(reason),
            message: message.into(),
        }
    }
}
