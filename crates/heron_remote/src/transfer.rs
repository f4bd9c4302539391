use crate::archive;
use crate::ignore::IgnoreSet;
use crate::path::{self, sh_quote};

use heron_core::constants::layout;
use heron_core::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Moves whole directory trees over a [`RemoteSession`] as single `.tar.gz` archives.
///
/// Staging archives live under `$HOME/<remote_tmp_dir>` on the remote side and in
/// the system temp directory locally. Both are removed whether or not the transfer
/// succeeds.
#[derive(Debug, Clone)]
pub struct ArchiveTransfer {
    ignore: IgnoreSet,
    remote_tmp_dir: String,
}

impl Default for ArchiveTransfer {
    fn default() -> Self {
        Self::new(IgnoreSet::default())
    }
}

impl ArchiveTransfer {
    pub fn new(ignore: IgnoreSet) -> Self {
        Self {
            ignore,
            remote_tmp_dir: layout::REMOTE_TMP_DIR.to_string(),
        }
    }

    /// Staging directory relative to the remote home (or absolute).
    pub fn with_remote_tmp_dir(mut self, dir: impl Into<String>) -> Self {
        self.remote_tmp_dir = dir.into();
        self
    }

    /// Uploads the contents of `local_dir` into `remote_dir`, creating it if needed.
    ///
    /// Existing remote files with the same relative path are overwritten.
    #[instrument(skip(self, session), fields(local = %local_dir.display()))]
    pub async fn upload<S: RemoteSession>(
        &self,
        session: &S,
        local_dir: &Path,
        remote_dir: &str,
    ) -> Result<(), TransferError> {
        if !local_dir.is_dir() {
            return Err(TransferError::NotADirectory(local_dir.to_path_buf()));
        }

        let local_archive = temp_archive("heron-upload-")?;
        let files = {
            let source = local_dir.to_path_buf();
            let target = local_archive.path().to_path_buf();
            let ignore = self.ignore.clone();
            tokio::task::spawn_blocking(move || archive::create_archive(&source, &target, &ignore))
                .await
                .map_err(|err| TransferError::Archive(format!("archive task failed: {err}")))??
        };
        debug!(files, "local archive ready");

        let home = session.home_dir().await?;
        let remote_archive = self.stage_remote(session, &home, "upload").await?;

        let result = async {
            session
                .upload_file(local_archive.path(), &remote_archive)
                .await?;

            let target = path::expand_home(&path::normalize(remote_dir), &home);
            run_step(session, "mkdir", &format!("mkdir -p {}", sh_quote(&target))).await?;
            run_step(
                session,
                "tar",
                &format!("tar -xzf {} -C {}", sh_quote(&remote_archive), sh_quote(&target)),
            )
            .await?;
            Ok::<(), TransferError>(())
        }
        .await;

        remove_remote(session, &remote_archive).await;
        close_local(local_archive);

        if result.is_ok() {
            info!(remote_dir, files, "upload complete");
        }
        result
    }

    /// Downloads the contents of `remote_dir` into `local_dir`.
    ///
    /// Fails if the remote path is not a directory, or if `local_dir` already has
    /// content and `allow_overwrite` is false. With `allow_overwrite`, `local_dir`
    /// is emptied once the archive has arrived, so a failed transfer leaves it untouched.
    #[instrument(skip(self, session), fields(local = %local_dir.display()))]
    pub async fn download<S: RemoteSession>(
        &self,
        session: &S,
        remote_dir: &str,
        local_dir: &Path,
        allow_overwrite: bool,
    ) -> Result<(), TransferError> {
        let home = session.home_dir().await?;
        let source = path::expand_home(&path::normalize(remote_dir), &home);

        let probe = session
            .execute_command(&format!("test -d {}", sh_quote(&source)))
            .await?;
        if !probe.success() {
            return Err(TransferError::RemoteNotFound(remote_dir.to_string()));
        }

        if !allow_overwrite && !archive::is_empty_or_missing(local_dir)? {
            return Err(TransferError::DestinationNotEmpty(local_dir.to_path_buf()));
        }

        let remote_archive = self.stage_remote(session, &home, "download").await?;
        let local_archive = temp_archive("heron-download-")?;

        let result = async {
            let mut cmd = format!("tar -czf {}", sh_quote(&remote_archive));
            for exclude in self.ignore.tar_excludes() {
                cmd.push(' ');
                cmd.push_str(&exclude);
            }
            cmd.push_str(&format!(" -C {} .", sh_quote(&source)));
            run_step(session, "tar", &cmd).await?;

            session
                .download_file(&remote_archive, local_archive.path())
                .await?;

            let archive_path = local_archive.path().to_path_buf();
            let dest: PathBuf = local_dir.to_path_buf();
            tokio::task::spawn_blocking(move || {
                if allow_overwrite {
                    archive::clear_dir(&dest)?;
                }
                archive::unpack_archive(&archive_path, &dest)
            })
            .await
            .map_err(|err| TransferError::Archive(format!("unpack task failed: {err}")))?
        }
        .await;

        remove_remote(session, &remote_archive).await;
        close_local(local_archive);

        if result.is_ok() {
            info!(remote_dir, "download complete");
        }
        result
    }

    /// Ensures the remote staging directory exists and returns a fresh archive path in it.
    async fn stage_remote<S: RemoteSession>(
        &self,
        session: &S,
        home: &str,
        prefix: &str,
    ) -> Result<String, TransferError> {
        let tmp_dir = if self.remote_tmp_dir.starts_with('/') {
            self.remote_tmp_dir.clone()
        } else {
            path::join(home, &path::expand_home(&self.remote_tmp_dir, home))
        };
        run_step(session, "mkdir", &format!("mkdir -p {}", sh_quote(&tmp_dir))).await?;
        Ok(format!("{tmp_dir}/{prefix}_{}.tar.gz", Uuid::new_v4().simple()))
    }
}

fn temp_archive(prefix: &str) -> Result<NamedTempFile, TransferError> {
    Ok(tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tar.gz")
        .tempfile()?)
}

async fn run_step<S: RemoteSession>(
    session: &S,
    step: &'static str,
    cmd: &str,
) -> Result<CommandOutput, TransferError> {
    let out = session.execute_command(cmd).await?;
    if !out.success() {
        return Err(TransferError::Remote {
            step,
            code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out)
}

async fn remove_remote<S: RemoteSession>(session: &S, remote_archive: &str) {
    match session
        .execute_command(&format!("rm -f {}", sh_quote(remote_archive)))
        .await
    {
        Ok(out) if out.success() => {}
        Ok(out) => warn!(remote_archive, code = out.exit_code, "failed to remove remote archive"),
        Err(err) => warn!(remote_archive, "failed to remove remote archive: {err}"),
    }
}

fn close_local(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(err) = file.close() {
        warn!(path = %path.display(), "failed to remove local archive: {err}");
    }
}
