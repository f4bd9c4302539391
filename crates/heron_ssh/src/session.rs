use heron_core::prelude::*;
use russh::client::{self, AuthResult, Config, Handle, Handler};
use russh::keys::PrivateKeyWithHashAlg;
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

pub struct ClientHandler;

impl Handler for ClientHandler {
    type Error = russh::Error;

    // TODO: pin the server host key once the endpoint publishes a fingerprint.
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// An authenticated SSH connection with exec and SFTP support.
pub struct SshSession {
    handle: Mutex<Option<Handle<ClientHandler>>>,
}

fn client_config() -> Config {
    Config {
        // Scripts may run for hours without output; rely on keepalives instead.
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(30)),
        keepalive_max: 3,
        window_size: 1024 * 1024,
        ..Default::default()
    }
}

impl SshSession {
    /// Connects to `host:port` and authenticates `user` with the private key at `identity_file`.
    #[instrument(skip(identity_file))]
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        identity_file: &Path,
    ) -> Result<Self, SessionError> {
        let key = russh::keys::load_secret_key(identity_file, None).map_err(|e| {
            SessionError::Auth(format!(
                "failed to load secret key at {}: {e}",
                identity_file.display()
            ))
        })?;

        let mut handle = client::connect(Arc::new(client_config()), (host, port), ClientHandler)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        let hash = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?
            .flatten();
        let result = handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash))
            .await
            .map_err(|e| SessionError::Auth(e.to_string()))?;

        if !matches!(result, AuthResult::Success) {
            return Err(SessionError::Auth(format!(
                "public key rejected for user {user}"
            )));
        }

        info!("ssh session established");
        Ok(Self {
            handle: Mutex::new(Some(handle)),
        })
    }

    async fn sftp(&self) -> Result<SftpSession, SessionError> {
        let guard = self.handle.lock().await;
        let handle = guard.as_ref().ok_or(SessionError::NotConnected)?;
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::Transfer(format!("open sftp channel: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| SessionError::Transfer(format!("request sftp subsystem: {e}")))?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SessionError::Transfer(format!("start sftp session: {e}")))
    }
}

fn capture(msg: &ChannelMsg, out: &mut Vec<u8>, err: &mut Vec<u8>, code: &mut Option<i32>) -> bool {
    match msg {
        ChannelMsg::Data { data } => {
            out.extend_from_slice(data);
            false
        }
        ChannelMsg::ExtendedData { data, ext: 1 } => {
            err.extend_from_slice(data);
            false
        }
        ChannelMsg::ExitStatus { exit_status } => {
            *code = Some(*exit_status as i32);
            false
        }
        ChannelMsg::Close => true,
        _ => false,
    }
}

fn transfer_error(context: &str, path: &str, err: impl std::fmt::Display) -> SessionError {
    SessionError::Transfer(format!("{context} {path}: {err}"))
}

impl RemoteSession for SshSession {
    async fn execute_command(&self, cmd: &str) -> Result<CommandOutput, SessionError> {
        let mut channel = {
            let guard = self.handle.lock().await;
            let handle = guard.as_ref().ok_or(SessionError::NotConnected)?;
            handle
                .channel_open_session()
                .await
                .map_err(|e| SessionError::Command(format!("open channel: {e}")))?
        };
        debug!(cmd, "exec");
        channel
            .exec(true, cmd)
            .await
            .map_err(|e| SessionError::Command(format!("exec request: {e}")))?;

        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut code = None;
        while let Some(msg) = channel.wait().await {
            if capture(&msg, &mut out, &mut err, &mut code) {
                break;
            }
        }
        let _ = channel.close().await;

        let exit_code = code.ok_or_else(|| {
            SessionError::Command("channel closed without an exit status".to_string())
        })?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
            exit_code,
        })
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        let sftp = self.sftp().await?;
        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(|e| transfer_error("open", &local.display().to_string(), e))?;
        let mut target = sftp
            .create(remote)
            .await
            .map_err(|e| transfer_error("create remote", remote, e))?;

        let bytes = tokio::io::copy(&mut source, &mut target)
            .await
            .map_err(|e| transfer_error("write remote", remote, e))?;
        target
            .shutdown()
            .await
            .map_err(|e| transfer_error("flush remote", remote, e))?;
        let _ = sftp.close().await;

        debug!(remote, bytes, "uploaded");
        Ok(())
    }

    async fn download_file(&self, remote: &str, local: &Path) -> Result<(), SessionError> {
        let sftp = self.sftp().await?;
        let mut source = sftp
            .open(remote)
            .await
            .map_err(|e| transfer_error("open remote", remote, e))?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut target = tokio::fs::File::create(local)
            .await
            .map_err(|e| transfer_error("create", &local.display().to_string(), e))?;

        let bytes = tokio::io::copy(&mut source, &mut target)
            .await
            .map_err(|e| transfer_error("read remote", remote, e))?;
        target.flush().await?;
        let _ = sftp.close().await;

        debug!(remote, bytes, "downloaded");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(handle) = self.handle.lock().await.take() else {
            return Ok(());
        };
        handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::Connect(format!("disconnect: {e}")))?;
        info!("ssh session closed");
        Ok(())
    }
}
