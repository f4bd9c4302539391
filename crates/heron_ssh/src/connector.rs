use crate::bridge::WebsocatBridge;
use crate::session::SshSession;

use heron_core::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::{instrument, warn};

/// Starts a [`WebsocatBridge`] and opens an [`SshSession`] through it.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    startup_timeout: Option<Duration>,
}

impl SshConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = Some(startup_timeout);
        self
    }
}

impl Connector for SshConnector {
    type Session = BridgedSession;

    #[instrument(skip_all, fields(domain = %config.domain, port = config.local_port))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<BridgedSession, SessionError> {
        let mut bridge = WebsocatBridge::from_config(config);
        if let Some(startup_timeout) = self.startup_timeout {
            bridge = bridge.with_startup_timeout(startup_timeout);
        }
        bridge.start(config.local_port).await?;

        match SshSession::connect(
            "127.0.0.1",
            config.local_port,
            &config.ssh_user,
            &config.identity_file,
        )
        .await
        {
            Ok(ssh) => Ok(BridgedSession { ssh, bridge }),
            Err(err) => {
                if let Err(stop_err) = bridge.stop().await {
                    warn!("failed to stop bridge after connect error: {stop_err}");
                }
                Err(err)
            }
        }
    }
}

/// An SSH session that owns the bridge it runs over. Closing it stops both.
pub struct BridgedSession {
    ssh: SshSession,
    bridge: WebsocatBridge,
}

impl RemoteSession for BridgedSession {
    async fn execute_command(&self, cmd: &str) -> Result<CommandOutput, SessionError> {
        self.ssh.execute_command(cmd).await
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        self.ssh.upload_file(local, remote).await
    }

    async fn download_file(&self, remote: &str, local: &Path) -> Result<(), SessionError> {
        self.ssh.download_file(remote, local).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let ssh = self.ssh.close().await;
        let bridge = self.bridge.stop().await;
        ssh?;
        bridge?;
        Ok(())
    }
}
