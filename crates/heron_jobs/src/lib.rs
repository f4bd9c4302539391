//! # Heron Jobs
//!
//! The [`TaskManager`] owns a single job slot. A submitted job runs in the
//! background through five stages:
//!
//! 1. **initializing**: load the connection config and connect.
//! 2. **uploading**: ship the working directory to `~/heron-jobs/<job_id>`.
//! 3. **executing**: run the script there, teeing output to `execution.log`.
//! 4. **downloading**: pull the remote job directory back, even if the script failed.
//! 5. **finalizing**: tear the connection down.
//!
//! Status can be polled at any time, and the terminal outcome of the last job is kept
//! until the next one finishes.

pub mod config;
mod manager;
mod pipeline;

pub use config::{ArtifactRoot, TaskManagerConfig};
pub use manager::TaskManager;
