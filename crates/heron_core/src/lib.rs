//! # Heron Core
//!
//! Types and traits shared by every heron crate.
//!
//! - **[`JobRecord`](job::JobRecord)** / **[`JobResult`](job::JobResult)**: the single job slot and its terminal outcome.
//! - **[`RemoteSession`](traits::RemoteSession)**: run a command or move one file on the remote host.
//! - **[`Bridge`](traits::Bridge)**: a local process forwarding a TCP port to the remote endpoint.
//! - **[`Connector`](traits::Connector)**: acquires a session (and whatever transport it needs) per job.
//! - **[`ConnectionConfig`](config::ConnectionConfig)**: connection settings, usually read from the environment.

pub mod config;
pub mod constants;
pub mod error;
pub mod job;
pub mod traits;

pub mod prelude {
    pub use super::config::*;
    pub use super::constants::*;
    pub use super::error::*;
    pub use super::job::*;
    pub use super::traits::*;
}
