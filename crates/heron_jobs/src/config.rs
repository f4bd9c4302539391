use heron_core::constants::layout;
use heron_remote::ignore::IgnoreSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a job's artifacts are downloaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRoot {
    /// `<working directory>/<subdir>/<job_id>`
    WorkingDirectory(String),
    /// `<path>/<job_id>`
    Fixed(PathBuf),
}

impl ArtifactRoot {
    pub fn resolve(&self, working_dir: &Path, job_id: &str) -> PathBuf {
        match self {
            ArtifactRoot::WorkingDirectory(subdir) => working_dir.join(subdir).join(job_id),
            ArtifactRoot::Fixed(root) => root.join(job_id),
        }
    }
}

impl Default for ArtifactRoot {
    fn default() -> Self {
        ArtifactRoot::WorkingDirectory(layout::LOCAL_RUNS_DIR.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Remote parent of per-job directories. May start with `~`.
    pub remote_jobs_root: String,
    pub log_file_name: String,
    pub artifacts: ArtifactRoot,
    pub ignore: IgnoreSet,
    /// Poll cadence of [`TaskManager::wait`](crate::TaskManager::wait).
    pub poll_interval: Duration,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            remote_jobs_root: layout::REMOTE_JOBS_ROOT.to_string(),
            log_file_name: layout::LOG_FILE_NAME.to_string(),
            artifacts: ArtifactRoot::default(),
            ignore: IgnoreSet::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl TaskManagerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactRoot) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_remote_jobs_root(mut self, root: impl Into<String>) -> Self {
        self.remote_jobs_root = root.into();
        self
    }

    pub(crate) fn remote_job_dir(&self, job_id: &str) -> String {
        format!("{}/{job_id}", self.remote_jobs_root.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_locations() {
        let work = Path::new("/w");
        assert_eq!(
            ArtifactRoot::default().resolve(work, "abc"),
            PathBuf::from("/w/heron_runs/abc")
        );
        assert_eq!(
            ArtifactRoot::Fixed("/runs".into()).resolve(work, "abc"),
            PathBuf::from("/runs/abc")
        );
    }

    #[test]
    fn remote_job_dir_joins_cleanly() {
        let config = TaskManagerConfig::default().with_remote_jobs_root("~/jobs/");
        assert_eq!(config.remote_job_dir("abc"), "~/jobs/abc");
        assert_eq!(TaskManagerConfig::default().remote_job_dir("x"), "~/heron-jobs/x");
    }
}
