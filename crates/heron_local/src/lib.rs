//! # Heron Local
//!
//! A [`Connector`] whose sessions run on this machine, with a sandbox directory
//! standing in for the remote home.
//!
//! Commands go through `sh -c` with `HOME` pointed at the sandbox, and file
//! transfers are plain copies. Useful for development and for exercising the job
//! pipeline end to end without a bridge or an SSH server.
//!
//! [`Faults`] can make individual steps fail, and every session records what it
//! did in a shared [`Journal`].
//!
//! ## Usage
//!
//! ```no_run
//! use heron_local::LocalConnector;
//!
//! let connector = LocalConnector::new("/tmp/heron-sandbox");
//! ```

use heron_core::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

/// Steps a [`LocalConnector`] should fail on purpose.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub refuse_connect: bool,
    pub fail_upload: bool,
    pub fail_download: bool,
    /// Extra delay before every file transfer and before closing.
    pub latency: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Command(String),
    Upload { local: PathBuf, remote: String },
    Download { remote: String, local: PathBuf },
    Closed,
}

/// Shared, append-only record of session activity.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<SessionEvent>>>);

impl Journal {
    fn push(&self, event: SessionEvent) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn uploads(&self) -> usize {
        self.count(|e| matches!(e, SessionEvent::Upload { .. }))
    }

    pub fn downloads(&self) -> usize {
        self.count(|e| matches!(e, SessionEvent::Download { .. }))
    }

    pub fn closes(&self) -> usize {
        self.count(|e| matches!(e, SessionEvent::Closed))
    }

    fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

#[derive(Debug, Clone)]
pub struct LocalConnector {
    home: PathBuf,
    faults: Faults,
    journal: Journal,
}

impl LocalConnector {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            faults: Faults::default(),
            journal: Journal::default(),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

impl Connector for LocalConnector {
    type Session = LocalSession;

    async fn connect(&self, _config: &ConnectionConfig) -> Result<LocalSession, SessionError> {
        if self.faults.refuse_connect {
            return Err(SessionError::Connect(
                "connection refused by local fault".to_string(),
            ));
        }
        fs::create_dir_all(&self.home).await?;
        self.journal.push(SessionEvent::Connected);
        Ok(LocalSession {
            home: self.home.clone(),
            faults: self.faults,
            journal: self.journal.clone(),
            open: true,
        })
    }
}

pub struct LocalSession {
    home: PathBuf,
    faults: Faults,
    journal: Journal,
    open: bool,
}

impl LocalSession {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            faults: Faults::default(),
            journal: Journal::default(),
            open: true,
        }
    }

    async fn lag(&self) {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }
}

async fn copy(from: &Path, to: &Path) -> Result<(), SessionError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(from, to)
        .await
        .map_err(|e| SessionError::Transfer(format!("{} -> {}: {e}", from.display(), to.display())))?;
    Ok(())
}

impl RemoteSession for LocalSession {
    async fn execute_command(&self, cmd: &str) -> Result<CommandOutput, SessionError> {
        self.ensure_open()?;
        self.journal.push(SessionEvent::Command(cmd.to_string()));
        debug!(cmd, "local exec");

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("HOME", &self.home)
            .current_dir(&self.home)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.journal.push(SessionEvent::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        self.lag().await;
        if self.faults.fail_upload {
            return Err(SessionError::Transfer("upload failed by local fault".to_string()));
        }
        copy(local, Path::new(remote)).await
    }

    async fn download_file(&self, remote: &str, local: &Path) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.journal.push(SessionEvent::Download {
            remote: remote.to_string(),
            local: local.to_path_buf(),
        });
        self.lag().await;
        if self.faults.fail_download {
            return Err(SessionError::Transfer(
                "download failed by local fault".to_string(),
            ));
        }
        copy(Path::new(remote), local).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.open {
            self.lag().await;
            self.open = false;
            self.journal.push(SessionEvent::Closed);
        }
        Ok(())
    }
}
