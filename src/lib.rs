//! # Heron
//!
//! Run a script in a remote compute environment and track it to completion.
//!
//! A job uploads a local working directory, runs one script there, and pulls the
//! remote directory back, including partial output when the script fails. The
//! remote host is reached through a `websocat` WebSocket bridge, with SSH running
//! over the bridged local port.
//!
//! This crate is an entry point that re-exports the core types, with the transport,
//! orchestrator and HTTP server behind feature flags.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **`jobs`** | The single-slot job orchestrator (`heron_jobs`). |
//! | **`server`** | The Axum HTTP API over the orchestrator (`heron_server`). |
//! | **`ssh`** | The websocat bridge + SSH/SFTP transport (`heron_ssh`). |
//! | **`local`** | A sandbox-directory transport for development and tests (`heron_local`). |
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! heron = { version = "0.1", features = ["server", "ssh"] }
//! ```
//!
//! ```rust,ignore
//! use heron::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = TaskManager::new(SshConnector::new(), EnvConfigProvider, TaskManagerConfig::default());
//!     let app = HeronServer::default().build(manager);
//!     heron::server::serve("127.0.0.1:3000", app).await
//! }
//! ```

pub use heron_core::*;

pub mod remote {
    pub use heron_remote::*;
}

#[cfg(feature = "jobs")]
pub mod jobs {
    pub use heron_jobs::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use heron_server::*;
}

#[cfg(feature = "ssh")]
pub mod ssh {
    pub use heron_ssh::*;
}

#[cfg(feature = "local")]
pub mod local {
    pub use heron_local::*;
}

pub mod prelude {
    pub use heron_core::prelude::*;
    pub use heron_remote::prelude::*;

    #[cfg(feature = "jobs")]
    pub use heron_jobs::{ArtifactRoot, TaskManager, TaskManagerConfig};

    #[cfg(feature = "server")]
    pub use heron_server::prelude::*;

    #[cfg(feature = "ssh")]
    pub use heron_ssh::{BridgedSession, SshConnector, SshSession, WebsocatBridge};

    #[cfg(feature = "local")]
    pub use heron_local::{Faults, LocalConnector, LocalSession};
}
