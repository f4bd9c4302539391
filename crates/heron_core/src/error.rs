use crate::job::FailureKind;

use std::path::PathBuf;
use thiserror::Error;

/// Bytes of captured script output kept in a failure trace.
const OUTPUT_TAIL_BYTES: usize = 4096;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required settings are absent (or empty).
    #[error("Missing required settings: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A setting is present but cannot be parsed.
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The bridge binary could not be launched at all.
    #[error("Bridge failed to start: could not spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Something else already listens on the requested port.
    #[error("Bridge failed to start: port {port} is already in use: {source}")]
    PortInUse {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The bridge process died while we were waiting for its port.
    #[error("Bridge failed to start: process exited early ({0})")]
    Exited(String),

    /// The local port never accepted a connection.
    #[error("Bridge failed to start: port {port} not ready after {timeout_ms} ms")]
    Timeout { port: u16, timeout_ms: u64 },

    #[error("Failed to stop bridge process: {0}")]
    Stop(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// TCP or SSH handshake failure.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The server rejected our credentials, or the key could not be loaded.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Session is not connected")]
    NotConnected,

    /// The command channel failed (not a non-zero exit).
    #[error("Remote command failed: {0}")]
    Command(String),

    /// Single-file transfer failure.
    #[error("File transfer failed: {0}")]
    Transfer(String),

    #[error("Remote interpreter not found")]
    InterpreterNotFound,

    #[error("Remote script not found: {0}")]
    ScriptNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Local path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Remote path does not exist or is not a directory: {0}")]
    RemoteNotFound(String),

    /// Download target already holds files and overwriting was not allowed.
    #[error("Destination exists and is non-empty: {0}")]
    DestinationNotEmpty(PathBuf),

    /// Building or unpacking the local archive failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A remote archive step (`tar`, `mkdir`) exited non-zero.
    #[error("Remote {step} failed (exit code {code}): {stderr}")]
    Remote {
        step: &'static str,
        code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pipeline failure, one variant per entry of the job error taxonomy.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration missing or invalid: {0}")]
    Config(#[source] ConfigError),

    #[error("Connection failed: {0}")]
    Connection(#[source] SessionError),

    #[error("Upload failed: {0}")]
    Upload(#[source] TransferError),

    #[error("Script exited with code {code}")]
    ScriptExit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Remote execution failed: {0}")]
    Execution(#[source] SessionError),

    #[error("Download failed: {0}")]
    Download(#[source] TransferError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::Config(_) => FailureKind::ConfigurationMissing,
            JobError::Connection(_) => FailureKind::ConnectionFailed,
            JobError::Upload(_) => FailureKind::UploadFailed,
            JobError::ScriptExit { .. } => FailureKind::ScriptExitNonzero,
            JobError::Execution(_) => FailureKind::ExecutionFailed,
            JobError::Download(_) => FailureKind::DownloadFailed,
            JobError::Internal(_) => FailureKind::InternalUnexpected,
        }
    }

    /// Renders the error with its full source chain, each cause once.
    ///
    /// Causes already spelled out in the message are skipped. For a non-zero
    /// exit the tails of the captured streams are appended instead.
    pub fn trace(&self) -> String {
        let mut out = self.to_string();

        if let JobError::ScriptExit { stdout, stderr, .. } = self {
            out.push_str("\n\nstdout:\n");
            out.push_str(tail(stdout, OUTPUT_TAIL_BYTES));
            out.push_str("\n\nstderr:\n");
            out.push_str(tail(stderr, OUTPUT_TAIL_BYTES));
            return out;
        }

        let mut causes: Vec<String> = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let text = err.to_string();
            let shown = out.contains(&text) || causes.iter().any(|c| c.contains(&text));
            if !shown {
                causes.push(text);
            }
            source = err.source();
        }
        if !causes.is_empty() {
            out.push_str("\n\nCaused by:");
            for cause in causes {
                out.push_str("\n    ");
                out.push_str(&cause);
            }
        }
        out
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_lists_every_variable() {
        let err = ConfigError::Missing(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "Missing required settings: A, B");
    }

    #[test]
    fn trace_walks_the_source_chain() {
        let io = std::io::Error::other("disk on fire");
        let err = JobError::Upload(TransferError::Session(SessionError::Io(io)));
        let trace = err.trace();

        assert!(trace.starts_with("Upload failed"));
        assert_eq!(trace.matches("disk on fire").count(), 1);
        assert!(!trace.contains("Caused by:"));
        assert_eq!(err.kind(), FailureKind::UploadFailed);
    }

    #[derive(Error, Debug)]
    #[error("ssh handshake rejected")]
    struct Opaque(#[source] std::io::Error);

    #[test]
    fn trace_lists_causes_missing_from_the_message() {
        let inner = std::io::Error::other("connection reset by peer");
        let err = JobError::Execution(SessionError::Io(std::io::Error::other(Opaque(inner))));
        let trace = err.trace();

        assert!(trace.contains("Caused by:"));
        assert_eq!(trace.matches("ssh handshake rejected").count(), 1);
        assert_eq!(trace.matches("connection reset by peer").count(), 1);
    }

    #[test]
    fn script_exit_trace_carries_output_tails() {
        let err = JobError::ScriptExit {
            code: 3,
            stdout: "x".repeat(OUTPUT_TAIL_BYTES * 2) + "last line",
            stderr: "Traceback: boom".into(),
        };
        let trace = err.trace();

        assert!(trace.starts_with("Script exited with code 3"));
        assert!(trace.contains("last line"));
        assert!(trace.contains("Traceback: boom"));
        assert!(trace.len() < OUTPUT_TAIL_BYTES * 2);
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "ééééé";
        let t = tail(s, 3);
        assert!(s.ends_with(t));
        assert!(t.len() <= 3);
    }
}
