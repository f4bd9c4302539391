//! # Heron Remote
//!
//! Transport-agnostic operations on top of a [`RemoteSession`](heron_core::traits::RemoteSession):
//!
//! - **[`ArchiveTransfer`](transfer::ArchiveTransfer)**: whole-directory upload and download as one `.tar.gz`.
//! - **[`ScriptRunner`](runner::ScriptRunner)**: interpreter discovery and logged script execution.

pub mod archive;
pub mod ignore;
pub mod path;
pub mod runner;
pub mod transfer;

pub mod prelude {
    pub use super::ignore::IgnoreSet;
    pub use super::runner::{Interpreter, RunOptions, ScriptRunner};
    pub use super::transfer::ArchiveTransfer;
}
