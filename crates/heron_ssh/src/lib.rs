//! # Heron SSH
//!
//! The production transport. A [`WebsocatBridge`](bridge::WebsocatBridge) exposes the
//! remote SSH-over-WebSocket endpoint on a local port, and an
//! [`SshSession`](session::SshSession) runs commands and SFTP transfers through it.
//!
//! ## Usage
//!
//! ```no_run
//! use heron_core::prelude::*;
//! use heron_ssh::SshConnector;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::from_env()?;
//! let mut session = SshConnector::new().connect(&config).await?;
//! let out = session.execute_command("uname -a").await?;
//! println!("{}", out.stdout);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod connector;
pub mod session;

pub use bridge::WebsocatBridge;
pub use connector::{BridgedSession, SshConnector};
pub use session::SshSession;
