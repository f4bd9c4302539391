use crate::manager::Shared;

use heron_core::prelude::*;
use heron_remote::path;
use heron_remote::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A validated submission, resolved against the local filesystem.
#[derive(Debug, Clone)]
pub(crate) struct JobSpec {
    pub job_id: String,
    pub working_dir: PathBuf,
    /// Script path relative to `working_dir`, `/`-separated.
    pub script_rel: String,
}

/// What the pipeline reports back for the terminal [`JobResult`].
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub error: Option<JobError>,
    pub download_error: Option<String>,
    pub remote_log_path: Option<String>,
    pub local_artifacts_path: Option<PathBuf>,
}

impl Outcome {
    pub fn failed(error: JobError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

#[instrument(skip_all, fields(job_id = %job.job_id))]
pub(crate) async fn run<C: Connector, P: ConfigProvider>(
    shared: Arc<Shared<C, P>>,
    job: JobSpec,
) -> Outcome {
    let config = match shared.config_provider.load() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration unavailable: {err}");
            return Outcome::failed(JobError::Config(err));
        }
    };

    info!(domain = %config.domain, "connecting");
    let mut session = match shared.connector.connect(&config).await {
        Ok(session) => session,
        Err(err) => {
            error!("connection failed: {err}");
            return Outcome::failed(JobError::Connection(err));
        }
    };

    let mut outcome = Outcome::default();
    transfer_and_execute(&shared, &job, &config, &session, &mut outcome).await;

    shared.advance(&job.job_id, Some(Stage::Finalizing), Some(95));
    if let Err(err) = session.close().await {
        warn!("session teardown failed: {err}");
    }
    shared.advance(&job.job_id, None, Some(100));
    outcome
}

/// Upload, execute, then recover artifacts. Download runs after any upload that
/// succeeded, including when the script failed.
async fn transfer_and_execute<C, P, S: RemoteSession>(
    shared: &Shared<C, P>,
    job: &JobSpec,
    config: &ConnectionConfig,
    session: &S,
    outcome: &mut Outcome,
) {
    let settings = &shared.settings;
    let id = job.job_id.as_str();
    let remote_dir = settings.remote_job_dir(id);
    let transfer = ArchiveTransfer::new(settings.ignore.clone());

    shared.advance(id, Some(Stage::Uploading), Some(10));
    info!(remote_dir, "uploading working directory");
    if let Err(err) = transfer.upload(session, &job.working_dir, &remote_dir).await {
        error!("upload failed: {err}");
        outcome.error = Some(JobError::Upload(err));
        return;
    }
    shared.advance(id, None, Some(40));

    shared.advance(id, Some(Stage::Executing), Some(50));
    let script = path::join(&remote_dir, &job.script_rel);
    let log = path::join(&remote_dir, &settings.log_file_name);
    outcome.remote_log_path = Some(log.clone());

    let runner = ScriptRunner::new(RunOptions {
        interpreter: config.interpreter.clone(),
        python_version: config.python_version.clone(),
        working_dir: Some(remote_dir.clone()),
        python_path: Some(".".to_string()),
    });
    let execution_error = match runner
        .execute_python_script(session, &script, Some(&log))
        .await
    {
        Ok(out) if out.success() => None,
        Ok(out) => {
            warn!(exit_code = out.exit_code, "script exited non-zero");
            Some(JobError::ScriptExit {
                code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            })
        }
        Err(err) => {
            error!("execution failed: {err}");
            Some(JobError::Execution(err))
        }
    };
    shared.advance(id, None, Some(70));

    shared.advance(id, Some(Stage::Downloading), Some(80));
    let local = settings.artifacts.resolve(&job.working_dir, id);
    info!(local = %local.display(), "downloading artifacts");
    let download = transfer.download(session, &remote_dir, &local, true).await;

    outcome.error = execution_error;
    match download {
        Ok(()) => {
            outcome.local_artifacts_path = Some(local);
            shared.advance(id, None, Some(90));
        }
        Err(err) => {
            warn!("artifact download failed: {err}");
            outcome.download_error = Some(err.to_string());
            if outcome.error.is_none() {
                outcome.error = Some(JobError::Download(err));
            }
        }
    }
}
