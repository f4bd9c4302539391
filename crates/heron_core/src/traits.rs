use crate::config::ConnectionConfig;
use crate::error::*;

use std::path::Path;

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An authenticated remote-command/file-transfer session.
pub trait RemoteSession: Send + Sync + 'static {
    /// Runs `cmd` through the remote shell and captures its output.
    ///
    /// A non-zero exit is reported in [`CommandOutput::exit_code`], not as an error.
    fn execute_command(
        &self,
        cmd: &str,
    ) -> impl Future<Output = Result<CommandOutput, SessionError>> + Send;

    /// Copies one local file to an absolute remote path.
    fn upload_file(
        &self,
        local: &Path,
        remote: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Copies one remote file (absolute path) to a local path.
    fn download_file(
        &self,
        remote: &str,
        local: &Path,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Tears the session down, including any transport it owns.
    fn close(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Absolute home directory of the remote user.
    fn home_dir(&self) -> impl Future<Output = Result<String, SessionError>> + Send {
        async {
            let out = self.execute_command("printf %s \"$HOME\"").await?;
            let home = out.stdout.trim().to_string();
            if !out.success() || home.is_empty() {
                return Err(SessionError::Command(
                    "could not resolve remote $HOME".to_string(),
                ));
            }
            Ok(home)
        }
    }
}

/// A local process that makes the remote endpoint reachable on a local TCP port.
pub trait Bridge: Send + Sync {
    /// Starts the bridge on `local_port` and waits until the port accepts connections.
    fn start(&mut self, local_port: u16) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Stops the bridge. Idempotent, and a no-op if it never started.
    fn stop(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn is_ready(&self) -> impl Future<Output = bool> + Send;
}

/// Acquires a fresh [`RemoteSession`] for one job.
pub trait Connector: Send + Sync + 'static {
    type Session: RemoteSession;

    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}

/// Resolves the connection configuration at the start of every job.
pub trait ConfigProvider: Send + Sync + 'static {
    fn load(&self) -> Result<ConnectionConfig, ConfigError>;
}
